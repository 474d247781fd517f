//! Wake-on-WLAN.
//!
//! While the chip sits in DS1, the firmware can keep the link alive on its own and wake the host,
//! when something interesting arrives. What counts as interesting is configured through the
//! [WowlCaps] and, for pattern matching, a blob of pattern data in the firmware's format.

use core::net::Ipv4Addr;

use bitfield_struct::bitfield;
use embassy_time::Duration;

use crate::{iovar, Firmware, Interface, WwdError, WwdResult};

#[bitfield(u32, defmt = cfg(feature = "defmt"))]
#[derive(PartialEq, Eq)]
/// Reasons for which the firmware wakes the host.
pub struct WowlCaps {
    /// Magic packet.
    pub magic: bool,
    /// Pattern match on the net pattern list.
    pub net_pattern: bool,
    /// Disassociation or deauthentication.
    pub disassoc: bool,
    /// Retrograde TSF.
    pub retrograde_tsf: bool,
    /// Beacon loss.
    pub beacon_loss: bool,
    pub tst: bool,
    /// Reception of the first message of the 4-way handshake.
    pub m1: bool,
    /// EAP identity request.
    pub eap_id: bool,
    pub pme_gpio: bool,
    pub need_tkip1: bool,
    pub gtk_failure: bool,
    pub extended_magic_pattern: bool,
    pub arp_offload: bool,
    pub wpa2: bool,
    pub key_rotation: bool,
    /// Broadcast frames.
    pub broadcast: bool,
    #[bits(16)]
    pub __: u16,
}

/// A frame, that the firmware periodically transmits to keep the link alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAlivePacket<'a> {
    pub period: Duration,
    pub id: u8,
    pub data: &'a [u8],
}
impl KeepAlivePacket<'_> {
    const VERSION: u16 = 1;
    /// Length of the header in front of the data.
    pub const FIXED_LENGTH: usize = 11;
    pub const MAX_DATA_LENGTH: usize = 128;
    pub const MAX_LENGTH: usize = Self::FIXED_LENGTH + Self::MAX_DATA_LENGTH;

    /// Serialize the packet into `buffer`.
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> WwdResult<usize> {
        let length = Self::FIXED_LENGTH + self.data.len();
        if self.data.len() > Self::MAX_DATA_LENGTH || buffer.len() < length {
            return Err(WwdError::BufferTooSmall);
        }
        let period_ms = u32::try_from(self.period.as_millis()).unwrap_or(u32::MAX);
        buffer[0..2].copy_from_slice(&Self::VERSION.to_le_bytes());
        buffer[2..4].copy_from_slice(&(Self::FIXED_LENGTH as u16).to_le_bytes());
        buffer[4..8].copy_from_slice(&period_ms.to_le_bytes());
        buffer[8..10].copy_from_slice(&(self.data.len() as u16).to_le_bytes());
        buffer[10] = self.id;
        buffer[Self::FIXED_LENGTH..length].copy_from_slice(self.data);
        Ok(length)
    }
}

/// Everything needed to arm Wake-on-WLAN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WowlConfig<'a> {
    pub caps: WowlCaps,
    /// Operating system specific flags. Only written if non-zero.
    pub os: u32,
    pub keep_alive: Option<KeepAlivePacket<'a>>,
    /// Patterns in the firmware's format.
    pub patterns: Option<&'a [u8]>,
    /// Address, for which the firmware answers ARP requests.
    pub arp_host_ip: Option<Ipv4Addr>,
}

/// Arm Wake-on-WLAN.
///
/// The caps are always written, everything else only if it's configured. The first failing
/// write aborts, without undoing the previous ones.
pub fn enable(
    firmware: &mut impl Firmware,
    interface: Interface,
    config: &WowlConfig<'_>,
) -> WwdResult<()> {
    debug!("Enabling WOWL.");
    firmware
        .set_iovar_value(iovar::WOWL, config.caps.into_bits(), interface)
        .inspect_err(|err| error!("Error on WOWL set {:?}", err))?;
    if config.os != 0 {
        trace!("Setting WOWL OS flags.");
        firmware.set_iovar_value(iovar::WOWL_OS, config.os, interface)?;
    }
    if let Some(keep_alive) = config.keep_alive {
        let mut buffer = [0u8; KeepAlivePacket::MAX_LENGTH];
        let length = keep_alive.encode(&mut buffer)?;
        firmware.set_iovar_buffer(iovar::WOWL_KEEP_ALIVE, &buffer[..length], interface)?;
    }
    if let Some(patterns) = config.patterns {
        trace!("Adding {} bytes of WOWL patterns.", patterns.len());
        firmware.set_iovar_buffer(iovar::WOWL_PATTERN, patterns, interface)?;
    }
    if let Some(arp_host_ip) = config.arp_host_ip {
        trace!("Adding ARP host IP.");
        firmware.set_iovar_buffer(iovar::WOWL_ARP_HOST_IP, &arp_host_ip.octets(), interface)?;
    }
    debug!("WOWL enabled.");
    Ok(())
}

/// Disable Wake-on-WLAN and clear all patterns.
pub fn disable(firmware: &mut impl Firmware, interface: Interface) -> WwdResult<()> {
    debug!("Disabling WOWL.");
    firmware.set_iovar_buffer(iovar::WOWL, &0u32.to_le_bytes(), interface)?;
    firmware.set_iovar_void(iovar::WOWL_PATTERN_CLR, interface)
}

#[cfg(test)]
mod tests {
    use core::net::Ipv4Addr;

    use embassy_time::Duration;

    use super::{KeepAlivePacket, WowlCaps, WowlConfig};
    use crate::{
        iovar,
        mock::{FirmwareCall, MockFirmware},
        Interface, WwdError,
    };

    #[test]
    fn caps_layout() {
        let caps = WowlCaps::new()
            .with_magic(true)
            .with_disassoc(true)
            .with_broadcast(true);
        assert_eq!(caps.into_bits(), 0x8005);
    }
    #[test]
    fn keep_alive_encoding() {
        let packet = KeepAlivePacket {
            period: Duration::from_secs(30),
            id: 3,
            data: &[0xaa, 0xbb],
        };
        let mut buffer = [0u8; KeepAlivePacket::MAX_LENGTH];
        let length = packet.encode(&mut buffer).unwrap();
        assert_eq!(length, 13);
        assert_eq!(
            &buffer[..length],
            &[0x01, 0x00, 0x0b, 0x00, 0x30, 0x75, 0x00, 0x00, 0x02, 0x00, 0x03, 0xaa, 0xbb]
        );
    }
    #[test]
    fn keep_alive_too_long() {
        let data = [0u8; KeepAlivePacket::MAX_DATA_LENGTH + 1];
        let packet = KeepAlivePacket {
            period: Duration::from_secs(1),
            id: 0,
            data: &data,
        };
        let mut buffer = [0u8; 512];
        assert_eq!(packet.encode(&mut buffer), Err(WwdError::BufferTooSmall));
        let mut short = [0u8; 4];
        let packet = KeepAlivePacket { data: &[1], ..packet };
        assert_eq!(packet.encode(&mut short), Err(WwdError::BufferTooSmall));
    }
    #[test]
    fn enable_writes_configured_parts() {
        let mut firmware = MockFirmware::default();
        let config = WowlConfig {
            caps: WowlCaps::new().with_magic(true).with_net_pattern(true),
            os: 0,
            keep_alive: Some(KeepAlivePacket {
                period: Duration::from_millis(1000),
                id: 1,
                data: &[0x42],
            }),
            patterns: Some(&[1, 2, 3]),
            arp_host_ip: Some(Ipv4Addr::new(192, 168, 1, 10)),
        };
        super::enable(&mut firmware, Interface::Sta, &config).unwrap();
        assert_eq!(
            firmware.calls,
            vec![
                FirmwareCall::Value(iovar::WOWL, 0b11, Interface::Sta),
                FirmwareCall::Buffer(
                    iovar::WOWL_KEEP_ALIVE,
                    vec![0x01, 0x00, 0x0b, 0x00, 0xe8, 0x03, 0x00, 0x00, 0x01, 0x00, 0x01, 0x42],
                    Interface::Sta
                ),
                FirmwareCall::Buffer(iovar::WOWL_PATTERN, vec![1, 2, 3], Interface::Sta),
                FirmwareCall::Buffer(iovar::WOWL_ARP_HOST_IP, vec![192, 168, 1, 10], Interface::Sta),
            ]
        );
    }
    #[test]
    fn os_flags_and_failures() {
        let mut firmware = MockFirmware {
            failing_iovar: Some(iovar::WOWL_OS),
            ..Default::default()
        };
        let config = WowlConfig {
            os: 4,
            patterns: Some(&[9]),
            ..Default::default()
        };
        assert_eq!(
            super::enable(&mut firmware, Interface::Sta, &config),
            Err(WwdError::Command {
                iovar: iovar::WOWL_OS,
                code: -23
            })
        );
        assert_eq!(
            firmware.calls,
            vec![
                FirmwareCall::Value(iovar::WOWL, 0, Interface::Sta),
                FirmwareCall::Value(iovar::WOWL_OS, 4, Interface::Sta),
            ]
        );
    }
    #[test]
    fn disable_clears_patterns() {
        let mut firmware = MockFirmware::default();
        super::disable(&mut firmware, Interface::P2p).unwrap();
        assert_eq!(
            firmware.calls,
            vec![
                FirmwareCall::Buffer(iovar::WOWL, vec![0; 4], Interface::P2p),
                FirmwareCall::Void(iovar::WOWL_PATTERN_CLR, Interface::P2p),
            ]
        );
    }
}
