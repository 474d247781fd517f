use core::{
    future::{poll_fn, Future},
    task::Poll,
};

use atomic_waker::AtomicWaker;
use portable_atomic::{AtomicU8, Ordering};

use crate::DeepSleepState;

/// The DS1 state, which can be read from any context and awaited.
///
/// Only one task can wait on this at a time. A second waiter replaces the waker of the first.
pub(crate) struct StateSignal {
    state: AtomicU8,
    waker: AtomicWaker,
}
impl StateSignal {
    const DISABLED: u8 = 0;
    const ENABLING: u8 = 1;
    const ENABLED: u8 = 2;

    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::DISABLED),
            waker: AtomicWaker::new(),
        }
    }
    const fn encode(state: DeepSleepState) -> u8 {
        match state {
            DeepSleepState::Disabled => Self::DISABLED,
            DeepSleepState::Enabling => Self::ENABLING,
            DeepSleepState::Enabled => Self::ENABLED,
        }
    }
    fn decode(raw: u8) -> DeepSleepState {
        match raw {
            Self::DISABLED => DeepSleepState::Disabled,
            Self::ENABLING => DeepSleepState::Enabling,
            Self::ENABLED => DeepSleepState::Enabled,
            _ => unreachable!(),
        }
    }
    pub fn load(&self) -> DeepSleepState {
        Self::decode(self.state.load(Ordering::Acquire))
    }
    /// Store the new state and wake the waiting task, if any.
    pub fn store(&self, state: DeepSleepState) {
        self.state.store(Self::encode(state), Ordering::Release);
        self.waker.wake();
    }
    /// Store the new state, unless the current one is `unless`.
    ///
    /// Returns `true`, if the state was stored.
    pub fn store_unless(&self, state: DeepSleepState, unless: DeepSleepState) -> bool {
        let stored = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (raw != Self::encode(unless)).then_some(Self::encode(state))
            })
            .is_ok();
        if stored {
            self.waker.wake();
        }
        stored
    }
    /// Asynchronously wait for the state to become `state`.
    pub fn wait_for(&self, state: DeepSleepState) -> impl Future<Output = ()> + use<'_> {
        poll_fn(move |cx| {
            if self.load() == state {
                return Poll::Ready(());
            }
            self.waker.register(cx.waker());
            // The state may have changed, before the waker was registered.
            if self.load() == state {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
    }
}
