use crate::errors::LanWakeError;

/// Broadcast address resolution for the local IPv4 network
pub mod broadcast {
    use std::net::{IpAddr, Ipv4Addr};

    use network_interface::{NetworkInterface, NetworkInterfaceConfig};
    use tracing::{debug, warn};

    use super::LanWakeError;

    /// Broadcast used when the adapter topology cannot be trusted.
    /// Virtualized and emulated adapters routinely misreport their real
    /// network, so the limited broadcast is the only safe destination.
    pub const FALLBACK_BROADCAST: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 255);

    /// Emulated adapters (QEMU user-mode NAT and friends) hand out addresses
    /// in 10.0.x.x; seeing one means the reported topology cannot be trusted.
    const EMULATOR_PREFIX: &str = "10.0.";

    /// Local IPv4 address and prefix length of the first usable interface
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LocalNetwork {
        pub ip: Ipv4Addr,
        pub prefix_len: u8,
    }

    impl LocalNetwork {
        /// Dotted prefix of the local subnet, e.g. "192.168.1." for a /24.
        /// Used to decide which device interfaces are reachable at all.
        pub fn subnet_prefix(&self) -> String {
            let octets = self.ip.octets();
            match self.prefix_len {
                len if len >= 24 => format!("{}.{}.{}.", octets[0], octets[1], octets[2]),
                len if len >= 16 => format!("{}.{}.", octets[0], octets[1]),
                _ => format!("{}.", octets[0]),
            }
        }
    }

    /// Find the first up, non-loopback IPv4 interface and report its address
    /// and prefix length. Virtual bridge interfaces are skipped the same way
    /// they are skipped for scanning.
    pub fn local_network() -> Result<Option<LocalNetwork>, LanWakeError> {
        let interfaces = NetworkInterface::show()?;
        for interface in interfaces {
            if interface.name.starts_with("lo")
                || interface.name.starts_with("docker")
                || interface.name.starts_with("veth")
            {
                continue;
            }
            for addr in &interface.addr {
                if let IpAddr::V4(ipv4) = addr.ip() {
                    if ipv4.is_loopback() || ipv4.is_unspecified() {
                        continue;
                    }
                    let prefix_len = match addr.netmask() {
                        Some(IpAddr::V4(mask)) => u32::from(mask).count_ones() as u8,
                        _ => 24,
                    };
                    debug!(
                        interface = %interface.name,
                        ip = %ipv4,
                        prefix_len,
                        "selected local network interface"
                    );
                    return Ok(Some(LocalNetwork { ip: ipv4, prefix_len }));
                }
            }
        }
        Ok(None)
    }

    /// Convert a prefix length into a dotted subnet mask
    pub fn prefix_to_mask(prefix_len: u8) -> [u8; 4] {
        let mut mask = [0u8; 4];
        let mut remaining = prefix_len.min(32);
        for byte in &mut mask {
            if remaining >= 8 {
                *byte = 255;
                remaining -= 8;
            } else if remaining > 0 {
                *byte = (256u16 - (1u16 << (8 - remaining))) as u8;
                remaining = 0;
            }
        }
        mask
    }

    /// Directed broadcast for an address and prefix: `ip OR NOT(mask)`
    pub fn broadcast_for(ip: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
        let mask = prefix_to_mask(prefix_len);
        let octets = ip.octets();
        Ipv4Addr::new(
            octets[0] | !mask[0],
            octets[1] | !mask[1],
            octets[2] | !mask[2],
            octets[3] | !mask[3],
        )
    }

    /// Whether the local address betrays an emulated network adapter
    pub fn is_emulated_network(ip: Ipv4Addr) -> bool {
        ip.to_string().starts_with(EMULATOR_PREFIX)
    }

    /// Resolve the broadcast address Wake-on-LAN packets should be sent to.
    /// Falls back to the limited broadcast when no usable interface exists or
    /// the environment looks emulated.
    pub fn resolve_broadcast_address() -> Result<Ipv4Addr, LanWakeError> {
        match local_network()? {
            Some(local) if !is_emulated_network(local.ip) => {
                Ok(broadcast_for(local.ip, local.prefix_len))
            }
            Some(local) => {
                warn!(ip = %local.ip, "emulated network detected, using fallback broadcast");
                Ok(FALLBACK_BROADCAST)
            }
            None => {
                warn!("no usable network interface, using fallback broadcast");
                Ok(FALLBACK_BROADCAST)
            }
        }
    }
}

/// Wake-on-LAN magic packet construction and delivery
pub mod wol {
    use std::net::Ipv4Addr;

    use tokio::net::UdpSocket;
    use tracing::debug;

    use super::LanWakeError;
    use crate::config::WOL_PORT;

    /// Length of a magic packet: 6 sync bytes plus the MAC repeated 16 times
    pub const MAGIC_PACKET_LEN: usize = 102;

    /// Parse a MAC address string ("AA:BB:CC:DD:EE:FF", '-' separated, or raw
    /// hex) into its 6 bytes.
    pub fn parse_mac(mac: &str) -> Option<[u8; 6]> {
        let clean: String = mac.chars().filter(|c| *c != ':' && *c != '-').collect();
        if clean.len() != 12 || !clean.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&clean[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(bytes)
    }

    /// Build the 102-byte magic packet: 6 bytes of 0xFF followed by the MAC
    /// repeated 16 times.
    pub fn build_magic_packet(mac: [u8; 6]) -> [u8; MAGIC_PACKET_LEN] {
        let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
        for repeat in 0..16 {
            packet[6 + repeat * 6..6 + (repeat + 1) * 6].copy_from_slice(&mac);
        }
        packet
    }

    /// Send a magic packet for `mac` as a UDP broadcast to port 9
    pub async fn send_magic_packet(
        mac: [u8; 6],
        broadcast: Ipv4Addr,
    ) -> Result<(), LanWakeError> {
        let packet = build_magic_packet(mac);
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.set_broadcast(true)?;
        socket.send_to(&packet, (broadcast, WOL_PORT)).await?;
        debug!(%broadcast, "magic packet sent");
        Ok(())
    }
}
