//! # `wwd-sleep-hal`
//! This is a driver for the DS1 deep sleep mode of WWD based Wi-Fi chips.
//! It doesn't talk to the chip itself, but orchestrates the firmware, the host bus and a host
//! timer, which are provided by the platform through the traits in this crate.
//! ## Overview
//! This chapter will give a short overview of how a sleep cycle works.
//!
//! ### Entering DS1
//! DS1 is entered by writing two iovars to the firmware. The first one (`ulp_wait`) tells the
//! firmware how long to wait, before actually going to sleep, the second one (`ulp`) enables
//! the mode. Before that, we subscribe to the ULP event, through which the firmware confirms that
//! it entered DS1. We don't rely on that event alone though. A host timer is armed with the same
//! wait period, and once it expires we consider the chip asleep as well. Until either of these
//! happens, the state is [DeepSleepState::Enabling].
//!
//! The timer is allocated fresh for every sleep cycle and released from its own expiry handler.
//! If the firmware confirms early, the timer still runs to completion. This means, that the
//! [StateObserver] usually sees [DeepSleepState::Enabled] twice.
//!
//! ### Leaving DS1
//! While the chip sleeps, the host side SDPCM sequence numbers ([SdpcmBusVars]) are meaningless,
//! since the firmware forgets them. When the bus signals a wake interrupt
//! ([DeepSleep::needs_wake]), [DeepSleep::finish_wake] resets them first, so that any traffic
//! following the wake up is accounted correctly. Then the bus is asked to complete the wake up
//! handshake and is reinitialized. The handshake is mandatory, if it fails, the chip stays in
//! [DeepSleepState::Enabled] and the call can be retried. Reinitializing the bus is best effort,
//! a failure is only logged.
//!
//! ### Wake-on-WLAN
//! What wakes the chip while it's in DS1 is configured through [wowl::enable]. See the
//! [wowl] module for details.
//!
//! ### Platform integration
//! The platform has to forward two things into the driver: firmware events, through
//! [DeepSleep::handle_firmware_event], and the expiry of the settling timer, through
//! [DeepSleep::on_settling_timer_fired]. Every settling timer is initialized with an argument,
//! which has to be handed back on expiry, so that a late expiry of an old timer can't affect a
//! newer request. On embassy based platforms, [SignalTimer] can be used as the host timer.
//!
//! The firmware and the bus stay with the platform and are passed into the calls that need
//! them, so the platform decides how access to them is serialized. The driver only ever holds
//! its own locks for moving values in and out.

#![cfg_attr(not(test), no_std)]
pub(crate) mod fmt;

mod error;
mod event;
mod interface;
#[cfg(test)]
mod mock;
mod sdpcm;
mod sleep;
mod sync;
mod timer;
pub mod wowl;

pub use error::{WwdError, WwdResult};
pub use event::{EventHeader, UlpDongleAction, UlpEvent, UlpEventPayload};
pub use interface::{iovar, BusTransport, Firmware, FirmwareEvent, Interface};
pub use sdpcm::SdpcmBusVars;
pub use sleep::{DeepSleep, DeepSleepState, StateObserver};
pub use timer::{HostTimer, SignalTimer, SignalTimerHandle};
pub use wowl::{KeepAlivePacket, WowlCaps, WowlConfig};

#[cfg(not(feature = "critical_section"))]
type DefaultRawMutex = embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(feature = "critical_section")]
type DefaultRawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
