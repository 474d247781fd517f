//! Recording stand-ins for the platform collaborators.

use std::{sync::Mutex, vec::Vec};

use embassy_time::Duration;

use crate::{
    BusTransport, DeepSleepState, Firmware, FirmwareEvent, HostTimer, Interface, SdpcmBusVars,
    StateObserver, WwdError, WwdResult,
};

#[derive(Debug, PartialEq, Eq)]
pub enum FirmwareCall {
    Value(&'static str, u32, Interface),
    Buffer(&'static str, Vec<u8>, Interface),
    Void(&'static str, Interface),
    Subscribe(Vec<FirmwareEvent>, Interface),
}
#[derive(Default)]
pub struct MockFirmware {
    pub calls: Vec<FirmwareCall>,
    pub fail_subscription: bool,
    pub failing_iovar: Option<&'static str>,
}
impl MockFirmware {
    fn check(&self, name: &'static str) -> WwdResult<()> {
        if self.failing_iovar == Some(name) {
            Err(WwdError::Command {
                iovar: name,
                code: -23,
            })
        } else {
            Ok(())
        }
    }
}
impl Firmware for MockFirmware {
    fn set_iovar_value(
        &mut self,
        name: &'static str,
        value: u32,
        interface: Interface,
    ) -> WwdResult<()> {
        self.calls.push(FirmwareCall::Value(name, value, interface));
        self.check(name)
    }
    fn set_iovar_buffer(
        &mut self,
        name: &'static str,
        buffer: &[u8],
        interface: Interface,
    ) -> WwdResult<()> {
        self.calls
            .push(FirmwareCall::Buffer(name, buffer.to_vec(), interface));
        self.check(name)
    }
    fn set_iovar_void(&mut self, name: &'static str, interface: Interface) -> WwdResult<()> {
        self.calls.push(FirmwareCall::Void(name, interface));
        self.check(name)
    }
    fn set_event_handler(
        &mut self,
        events: &[FirmwareEvent],
        interface: Interface,
    ) -> WwdResult<()> {
        self.calls
            .push(FirmwareCall::Subscribe(events.to_vec(), interface));
        if self.fail_subscription {
            Err(WwdError::EventRegistration)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct MockBus {
    pub vars: SdpcmBusVars,
    pub wake_pending: bool,
    pub wake_queries: usize,
    pub vars_resets: usize,
    pub completions: usize,
    pub reinits: usize,
    pub completion_error: Option<WwdError>,
    pub reinit_error: Option<WwdError>,
}
impl BusTransport for MockBus {
    fn wake_interrupt_present(&mut self) -> bool {
        self.wake_queries += 1;
        self.wake_pending
    }
    fn init_bus_vars(&mut self) {
        self.vars.reset();
        self.vars_resets += 1;
    }
    fn complete_ds_wake(&mut self) -> WwdResult<()> {
        self.completions += 1;
        self.completion_error.map_or(Ok(()), Err)
    }
    fn reinit(&mut self) -> WwdResult<()> {
        self.reinits += 1;
        self.reinit_error.map_or(Ok(()), Err)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TimerCall {
    Alloc(u32),
    Init(u32, Duration, u32),
    Start(u32),
    Stop(u32),
    Deinit(u32),
    Free(u32),
}
/// Hands out timers numbered from zero.
#[derive(Default)]
pub struct MockTimer<'a> {
    next_id: u32,
    pub calls: Vec<TimerCall>,
    pub fail_alloc: bool,
    pub fail_init: bool,
    pub fail_start: bool,
    /// Run from within [HostTimer::start], like a timer that expires immediately.
    pub on_start: Option<&'a dyn Fn()>,
}
impl MockTimer<'_> {
    pub fn frees(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, TimerCall::Free(_)))
            .count()
    }
    pub fn live(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, TimerCall::Alloc(_)))
            .count()
            - self.frees()
    }
}
impl HostTimer for MockTimer<'_> {
    type Handle = u32;

    fn alloc(&mut self) -> WwdResult<u32> {
        if self.fail_alloc {
            return Err(WwdError::TimerAlloc);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.calls.push(TimerCall::Alloc(id));
        Ok(id)
    }
    fn init(&mut self, handle: &mut u32, duration: Duration, arg: u32) -> WwdResult<()> {
        self.calls.push(TimerCall::Init(*handle, duration, arg));
        if self.fail_init {
            Err(WwdError::TimerInit)
        } else {
            Ok(())
        }
    }
    fn start(&mut self, handle: &mut u32) -> WwdResult<()> {
        self.calls.push(TimerCall::Start(*handle));
        if self.fail_start {
            return Err(WwdError::TimerStart);
        }
        if let Some(on_start) = self.on_start {
            on_start();
        }
        Ok(())
    }
    fn stop(&mut self, handle: &mut u32) {
        self.calls.push(TimerCall::Stop(*handle));
    }
    fn deinit(&mut self, handle: &mut u32) {
        self.calls.push(TimerCall::Deinit(*handle));
    }
    fn free(&mut self, handle: u32) {
        self.calls.push(TimerCall::Free(handle));
    }
}

#[derive(Default)]
pub struct Recorder(Mutex<Vec<DeepSleepState>>);
impl Recorder {
    pub fn seen(&self) -> Vec<DeepSleepState> {
        self.0.lock().unwrap().clone()
    }
}
impl StateObserver for Recorder {
    fn on_state_change(&self, state: DeepSleepState) {
        self.0.lock().unwrap().push(state);
    }
}
