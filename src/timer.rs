use embassy_futures::select::{select, Either};
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};

use crate::{DefaultRawMutex, WwdError, WwdResult};

/// A one-shot countdown timer provided by the host RTOS.
///
/// The lifecycle is `alloc -> init -> start -> [stop] -> deinit -> free`. When the timer
/// expires, the platform calls
/// [DeepSleep::on_settling_timer_fired](crate::DeepSleep::on_settling_timer_fired) with the
/// argument passed to [HostTimer::init]. Errors returned from here are mapped to the matching
/// [WwdError] variant by the caller.
///
/// None of these may block. The expiry may already be reported from within
/// [HostTimer::start].
pub trait HostTimer {
    type Handle;

    /// Allocate a new timer.
    fn alloc(&mut self) -> WwdResult<Self::Handle>;
    /// Set the duration of the timer and the argument handed back on expiry.
    fn init(&mut self, handle: &mut Self::Handle, duration: Duration, arg: u32) -> WwdResult<()>;
    /// Start counting down.
    fn start(&mut self, handle: &mut Self::Handle) -> WwdResult<()>;
    /// Stop the timer, if it's running.
    fn stop(&mut self, handle: &mut Self::Handle);
    /// Undo [HostTimer::init].
    fn deinit(&mut self, handle: &mut Self::Handle);
    /// Release the timer.
    fn free(&mut self, handle: Self::Handle);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerCommand {
    Start { duration: Duration, arg: u32 },
    Stop { arg: u32 },
}

/// A [HostTimer] for embassy based platforms.
///
/// Starting and stopping only queue a command for the runner, which has to be polled through
/// [SignalTimer::run], usually from a dedicated task. Only one timer runs at a time. Starting
/// another one replaces it, and stopping a timer, that isn't running, does nothing.
pub struct SignalTimer {
    commands: Channel<DefaultRawMutex, TimerCommand, 4>,
}
/// A timer handed out by [SignalTimer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalTimerHandle {
    duration: Duration,
    arg: u32,
}
impl SignalTimer {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
        }
    }
    /// Run the timer.
    ///
    /// `on_expired` is called with the argument of the timer every time, a started timer runs
    /// out without being stopped or replaced.
    pub async fn run(&self, mut on_expired: impl FnMut(u32)) -> ! {
        let mut running: Option<(Instant, u32)> = None;
        loop {
            let Some((deadline, arg)) = running else {
                if let TimerCommand::Start { duration, arg } = self.commands.receive().await {
                    trace!("Settling timer {} running for {} ms.", arg, duration.as_millis());
                    running = Some((Instant::now() + duration, arg));
                }
                continue;
            };
            match select(Timer::at(deadline), self.commands.receive()).await {
                Either::First(()) => {
                    trace!("Settling timer {} expired.", arg);
                    running = None;
                    on_expired(arg);
                }
                Either::Second(TimerCommand::Start { duration, arg }) => {
                    trace!("Settling timer replaced by {}.", arg);
                    running = Some((Instant::now() + duration, arg));
                }
                Either::Second(TimerCommand::Stop { arg: stopped }) if stopped == arg => {
                    trace!("Settling timer {} stopped.", arg);
                    running = None;
                }
                Either::Second(TimerCommand::Stop { .. }) => {}
            }
        }
    }
}
impl Default for SignalTimer {
    fn default() -> Self {
        Self::new()
    }
}
impl HostTimer for &SignalTimer {
    type Handle = SignalTimerHandle;

    fn alloc(&mut self) -> WwdResult<Self::Handle> {
        Ok(SignalTimerHandle {
            duration: Duration::from_ticks(0),
            arg: 0,
        })
    }
    fn init(&mut self, handle: &mut Self::Handle, duration: Duration, arg: u32) -> WwdResult<()> {
        handle.duration = duration;
        handle.arg = arg;
        Ok(())
    }
    fn start(&mut self, handle: &mut Self::Handle) -> WwdResult<()> {
        self.commands
            .try_send(TimerCommand::Start {
                duration: handle.duration,
                arg: handle.arg,
            })
            .map_err(|_| WwdError::TimerStart)
    }
    fn stop(&mut self, handle: &mut Self::Handle) {
        if self
            .commands
            .try_send(TimerCommand::Stop { arg: handle.arg })
            .is_err()
        {
            warn!("Timer command queue full, dropping stop of {}.", handle.arg);
        }
    }
    fn deinit(&mut self, handle: &mut Self::Handle) {
        handle.duration = Duration::from_ticks(0);
    }
    fn free(&mut self, _handle: Self::Handle) {}
}
