//! The seams between the sleep driver and the rest of the WLAN stack.
//!
//! None of these are implemented here. The firmware transport, the bus driver and the event
//! dispatcher live in the platform, which implements these traits and forwards firmware events
//! and timer expiries into [DeepSleep](crate::DeepSleep).

use crate::WwdResult;

/// Names of the iovars written by this crate.
pub mod iovar {
    /// Time the firmware waits, before actually entering DS1.
    pub const ULP_WAIT: &str = "ulp_wait";
    /// Enables ultra low power mode.
    pub const ULP: &str = "ulp";
    pub const WOWL: &str = "wowl";
    pub const WOWL_OS: &str = "wowl_os";
    pub const WOWL_KEEP_ALIVE: &str = "wowl_keepalive";
    pub const WOWL_PATTERN: &str = "wowl_pattern";
    pub const WOWL_ARP_HOST_IP: &str = "wowl_arp_hostip";
    pub const WOWL_PATTERN_CLR: &str = "wowl_pattern_clr";
}

/// A network interface of the chip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interface {
    /// Station.
    #[default]
    Sta,
    /// Soft AP.
    Ap,
    /// Wi-Fi Direct.
    P2p,
}

/// Asynchronous firmware events, that the sleep driver cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FirmwareEvent {
    /// The firmware performed an ultra low power action, like entering DS1.
    Ulp,
    /// Any other event, identified by its raw number.
    Other(u32),
}

/// The firmware's configuration interface.
pub trait Firmware {
    /// Write a numeric iovar.
    fn set_iovar_value(&mut self, name: &'static str, value: u32, interface: Interface)
        -> WwdResult<()>;
    /// Write a buffer iovar.
    fn set_iovar_buffer(
        &mut self,
        name: &'static str,
        buffer: &[u8],
        interface: Interface,
    ) -> WwdResult<()>;
    /// Write an iovar without payload.
    fn set_iovar_void(&mut self, name: &'static str, interface: Interface) -> WwdResult<()>;
    /// Subscribe to the specified events.
    ///
    /// Once subscribed, the platform is expected to hand those events to
    /// [DeepSleep::handle_firmware_event](crate::DeepSleep::handle_firmware_event).
    fn set_event_handler(&mut self, events: &[FirmwareEvent], interface: Interface)
        -> WwdResult<()>;
}

/// The bus between host and chip.
pub trait BusTransport {
    /// Check if the chip raised the wake interrupt.
    fn wake_interrupt_present(&mut self) -> bool;
    /// Reset the host side TX/RX sequence bookkeeping.
    ///
    /// See [SdpcmBusVars](crate::SdpcmBusVars).
    fn init_bus_vars(&mut self);
    /// Complete the handshake, that brings the chip out of DS1.
    fn complete_ds_wake(&mut self) -> WwdResult<()>;
    /// Reinitialize the bus after DS1.
    fn reinit(&mut self) -> WwdResult<()>;
}
