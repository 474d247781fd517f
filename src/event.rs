use bitfield_struct::bitfield;

use crate::{FirmwareEvent, Interface};

/// The header of an asynchronous firmware event, as handed over by the event dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventHeader {
    pub event: FirmwareEvent,
    pub status: u32,
    pub reason: u32,
    pub interface: Interface,
}

#[bitfield(u32, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
/// Payload of the ULP event, as it's laid out by the firmware.
///
/// On the wire this is little endian.
pub struct UlpEventPayload {
    pub version: u16,
    pub dongle_action: u16,
}

/// What the firmware did, when it sent the ULP event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UlpDongleAction {
    /// The chip entered DS1.
    Entry,
    /// Any other action. We don't distinguish these.
    Other(u16),
}
impl UlpDongleAction {
    const ENTRY: u16 = 1;

    pub const fn from_bits(bits: u16) -> Self {
        match bits {
            Self::ENTRY => Self::Entry,
            other => Self::Other(other),
        }
    }
    pub const fn into_bits(self) -> u16 {
        match self {
            Self::Entry => Self::ENTRY,
            Self::Other(other) => other,
        }
    }
}

/// A decoded ULP event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UlpEvent {
    pub version: u16,
    pub dongle_action: UlpDongleAction,
}
impl UlpEvent {
    pub const LENGTH: usize = 4;

    /// Decode the event from the payload.
    ///
    /// Returns [None] if the payload is too short.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = payload.get(..Self::LENGTH)?.try_into().ok()?;
        let payload = UlpEventPayload::from_bits(u32::from_le_bytes(raw));
        Some(Self {
            version: payload.version(),
            dongle_action: UlpDongleAction::from_bits(payload.dongle_action()),
        })
    }
}
