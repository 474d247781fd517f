use core::{
    cell::{Cell, RefCell},
    future::Future,
};

use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Duration;

use crate::{
    iovar, sync::StateSignal, timer::HostTimer, BusTransport, DefaultRawMutex, EventHeader,
    Firmware, FirmwareEvent, Interface, UlpEvent, WwdError, WwdResult,
};

/// The events we subscribe to, when entering DS1.
const ULP_EVENTS: &[FirmwareEvent] = &[FirmwareEvent::Ulp];

/// The DS1 state of the chip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeepSleepState {
    /// The radio is fully active.
    #[default]
    Disabled,
    /// DS1 was requested and the firmware is settling.
    Enabling,
    /// The chip is in DS1.
    Enabled,
}

/// Gets notified, whenever the chip reaches [DeepSleepState::Enabled] or
/// [DeepSleepState::Disabled].
pub trait StateObserver: Sync {
    fn on_state_change(&self, state: DeepSleepState);
}

/// The settling timer of the latest DS1 request.
struct SettlingTimer<H> {
    /// Bumped with every request and passed to the host timer as its argument.
    generation: u32,
    /// The timer of this generation already expired.
    expired: bool,
    handle: Option<H>,
}
impl<H> SettlingTimer<H> {
    const fn new() -> Self {
        Self {
            generation: 0,
            expired: false,
            handle: None,
        }
    }
}

/// Subscribe to the ULP event and request DS1 from the firmware.
fn request_ulp(
    firmware: &mut impl Firmware,
    interface: Interface,
    ulp_wait_ms: u32,
) -> WwdResult<()> {
    trace!("Setting ULP event handler.");
    // Listen for ULP ready first, so we can't miss it.
    firmware
        .set_event_handler(ULP_EVENTS, Interface::Sta)
        .inspect_err(|err| error!("ULP event subscription failed {:?}", err))?;
    trace!("ULP wait {} ms.", ulp_wait_ms);
    firmware
        .set_iovar_value(iovar::ULP_WAIT, ulp_wait_ms, interface)
        .inspect_err(|err| error!("Setting ULP wait failed {:?}", err))?;
    firmware
        .set_iovar_value(iovar::ULP, 1, interface)
        .inspect_err(|err| error!("Enabling ULP failed {:?}", err))?;
    trace!("ULP set to enable.");
    Ok(())
}

/// Driver for the DS1 ("ultra low power") mode of the chip.
///
/// A sleep cycle always runs through `Disabled -> Enabling -> Enabled -> Disabled`. Entering is
/// requested through [DeepSleep::enter_deep_sleep]. The chip is considered asleep, once the
/// firmware confirms DS1 entry, or the settling delay has run out, whichever comes first. Both
/// of these notify the [StateObserver]. When the bus reports a wake interrupt
/// ([DeepSleep::needs_wake]), the wake up is completed with [DeepSleep::finish_wake].
///
/// The firmware and the bus aren't owned by the driver, but passed into the calls that need
/// them. No lock of the driver is held while talking to the chip. Only the host timer is kept
/// here, since its expiry handler has to release the timer.
///
/// NOTE:
/// The firmware event and the timer expiry aren't serialized against each other. If both
/// happen, which is the normal case when the firmware confirms early, the observer is notified
/// twice with [DeepSleepState::Enabled]. A timer expiring after the wake up was already
/// completed, doesn't change the state anymore.
pub struct DeepSleep<'a, T: HostTimer> {
    state: StateSignal,
    observer: Mutex<DefaultRawMutex, Cell<Option<&'a dyn StateObserver>>>,
    host_timer: Mutex<DefaultRawMutex, RefCell<T>>,
    settling_timer: Mutex<DefaultRawMutex, RefCell<SettlingTimer<T::Handle>>>,
}
impl<'a, T: HostTimer> DeepSleep<'a, T> {
    pub const fn new(host_timer: T) -> Self {
        Self {
            state: StateSignal::new(),
            observer: Mutex::new(Cell::new(None)),
            host_timer: Mutex::new(RefCell::new(host_timer)),
            settling_timer: Mutex::new(RefCell::new(SettlingTimer::new())),
        }
    }
    /// Access the host timer service.
    pub fn with_host_timer<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.host_timer
            .lock(|host_timer| f(&mut host_timer.borrow_mut()))
    }
    fn notify(&self, state: DeepSleepState) {
        if let Some(observer) = self.observer.lock(Cell::get) {
            observer.on_state_change(state);
        }
    }
    /// Set the state and notify the observer.
    fn state_set(&self, state: DeepSleepState) {
        trace!("DS1 state is now {:?}.", state);
        self.state.store(state);
        self.notify(state);
    }
    /// Returns the current state.
    pub fn state(&self) -> DeepSleepState {
        self.state.load()
    }
    /// Register the observer, replacing the previous one.
    pub fn set_observer(&self, observer: Option<&'a dyn StateObserver>) {
        self.observer.lock(|slot| slot.set(observer));
    }
    /// Asynchronously wait until the chip reaches `state`.
    pub fn wait_for_state(&self, state: DeepSleepState) -> impl Future<Output = ()> + '_ {
        self.state.wait_for(state)
    }
    /// Stop and release a settling timer.
    fn teardown_timer(&self, mut handle: T::Handle, started: bool) {
        self.with_host_timer(|host_timer| {
            if started {
                trace!("Stopping settling timer.");
                host_timer.stop(&mut handle);
            }
            host_timer.deinit(&mut handle);
            host_timer.free(handle);
        });
        trace!("Settling timer freed.");
    }
    /// Have the chip enter DS1 after `ulp_wait`.
    ///
    /// The firmware needs `ulp_wait` to settle, so the state is [DeepSleepState::Enabling] until
    /// either the firmware confirms entry or that time has elapsed.
    ///
    /// If anything fails, the settling timer is released again. Firmware writes, that were
    /// already issued, are not undone.
    pub fn enter_deep_sleep(
        &self,
        firmware: &mut impl Firmware,
        interface: Interface,
        ulp_wait: Duration,
    ) -> WwdResult<()> {
        let ulp_wait_ms = u32::try_from(ulp_wait.as_millis()).unwrap_or(u32::MAX);
        debug!("Entering DS1 with a wait of {} ms.", ulp_wait_ms);

        let (generation, stale) = self.settling_timer.lock(|settling_timer| {
            let mut settling_timer = settling_timer.borrow_mut();
            settling_timer.generation = settling_timer.generation.wrapping_add(1);
            settling_timer.expired = false;
            (settling_timer.generation, settling_timer.handle.take())
        });
        if let Some(stale) = stale {
            warn!("Releasing settling timer of a previous DS1 request.");
            self.teardown_timer(stale, true);
        }

        trace!("Allocating settling timer {}.", generation);
        let mut handle = self
            .with_host_timer(|host_timer| host_timer.alloc())
            .map_err(|_| {
                error!("Timer failure on alloc.");
                WwdError::TimerAlloc
            })?;
        trace!("Initializing settling timer.");
        if self
            .with_host_timer(|host_timer| host_timer.init(&mut handle, ulp_wait, generation))
            .is_err()
        {
            error!("Timer failure on init.");
            self.with_host_timer(|host_timer| host_timer.free(handle));
            return Err(WwdError::TimerInit);
        }

        if let Err(err) = request_ulp(firmware, interface, ulp_wait_ms) {
            self.teardown_timer(handle, false);
            return Err(err);
        }

        // Enabling isn't announced to the observer.
        self.state.store(DeepSleepState::Enabling);

        trace!("Starting settling timer.");
        if self
            .with_host_timer(|host_timer| host_timer.start(&mut handle))
            .is_err()
        {
            error!("Timer failure on start.");
            self.teardown_timer(handle, false);
            return Err(WwdError::TimerStart);
        }
        // The expiry may already have been reported from within start.
        let expired = self.settling_timer.lock(|settling_timer| {
            let mut settling_timer = settling_timer.borrow_mut();
            if settling_timer.generation == generation && !settling_timer.expired {
                settling_timer.handle = Some(handle);
                None
            } else {
                Some(handle)
            }
        });
        if let Some(handle) = expired {
            self.teardown_timer(handle, true);
        }
        Ok(())
    }
    /// Handle an asynchronous firmware event.
    ///
    /// The platform has to route the events subscribed to in [DeepSleep::enter_deep_sleep] here.
    pub fn handle_firmware_event(&self, header: &EventHeader, payload: &[u8]) {
        if header.event != FirmwareEvent::Ulp {
            trace!("Ignoring firmware event {:?}.", header.event);
            return;
        }
        match UlpEvent::parse(payload) {
            Some(event) => debug!("ULP event handler triggered [{:?}]", event.dongle_action),
            None => warn!("ULP event with truncated payload. len: {}", payload.len()),
        }
        self.state_set(DeepSleepState::Enabled);
    }
    /// Must be called by the platform, once the settling timer expires.
    ///
    /// `arg` is the argument, the timer was initialized with. Expiries of timers from earlier
    /// requests are ignored.
    pub fn on_settling_timer_fired(&self, arg: u32) {
        let current = self.settling_timer.lock(|settling_timer| {
            let mut settling_timer = settling_timer.borrow_mut();
            if settling_timer.generation != arg {
                return None;
            }
            settling_timer.expired = true;
            Some(settling_timer.handle.take())
        });
        let Some(handle) = current else {
            debug!("Ignoring expiry of stale settling timer {}.", arg);
            return;
        };
        // Now it's safe to say, that DS1 is enabled, unless the chip already woke up again.
        if self
            .state
            .store_unless(DeepSleepState::Enabled, DeepSleepState::Disabled)
        {
            trace!("DS1 state is now {:?}.", DeepSleepState::Enabled);
            self.notify(DeepSleepState::Enabled);
        } else {
            debug!("Settling timer expired after the wake up.");
        }
        if let Some(handle) = handle {
            self.teardown_timer(handle, true);
        }
    }
    /// Check if the chip is in DS1 and wants to wake up.
    pub fn needs_wake(&self, bus: &mut impl BusTransport) -> bool {
        if self.state() != DeepSleepState::Enabled {
            return false;
        }
        let wake = bus.wake_interrupt_present();
        if wake {
            debug!("Wake need detected.");
        }
        wake
    }
    /// Bring the host back in sync with the chip after it left DS1.
    ///
    /// This does nothing, unless the state is [DeepSleepState::Enabled]. If completing the wake
    /// up on the bus fails, the state stays [DeepSleepState::Enabled], so this can be retried. A
    /// failed bus reinit is only logged.
    pub fn finish_wake(&self, bus: &mut impl BusTransport) -> WwdResult<()> {
        if self.state() != DeepSleepState::Enabled {
            debug!("DS1 not yet enabled.");
            return Ok(());
        }
        // The counters have to be reset first, so any following traffic is in sync.
        bus.init_bus_vars();
        bus.complete_ds_wake()
            .inspect_err(|err| error!("Could not complete bus DS wake {:?}", err))?;
        if let Err(err) = bus.reinit() {
            warn!("Bus reinit failed {:?}", err);
        }
        self.state_set(DeepSleepState::Disabled);
        Ok(())
    }
}
