use std::net::Ipv4Addr;

use lanwake::net::broadcast::{
    broadcast_for, is_emulated_network, prefix_to_mask, FALLBACK_BROADCAST,
};
use lanwake::net::wol::{build_magic_packet, parse_mac, MAGIC_PACKET_LEN};

#[test]
fn magic_packet_shape() {
    let mac = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB];
    let packet = build_magic_packet(mac);

    assert_eq!(packet.len(), MAGIC_PACKET_LEN);
    assert_eq!(packet.len(), 102);
    assert!(packet[..6].iter().all(|&b| b == 0xFF));
    for repeat in 0..16 {
        assert_eq!(&packet[6 + repeat * 6..6 + (repeat + 1) * 6], &mac);
    }
}

#[test]
fn magic_packet_for_all_zero_mac() {
    let packet = build_magic_packet([0; 6]);
    assert_eq!(packet.len(), 102);
    assert!(packet[6..].iter().all(|&b| b == 0));
}

#[test]
fn mac_parsing_accepts_common_formats() {
    let expected = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
    assert_eq!(parse_mac("AA:BB:CC:DD:EE:FF"), Some(expected));
    assert_eq!(parse_mac("aa-bb-cc-dd-ee-ff"), Some(expected));
    assert_eq!(parse_mac("aabbccddeeff"), Some(expected));

    assert_eq!(parse_mac(""), None);
    assert_eq!(parse_mac("AA:BB:CC:DD:EE"), None);
    assert_eq!(parse_mac("GG:BB:CC:DD:EE:FF"), None);
}

#[test]
fn prefix_to_mask_handles_partial_bytes() {
    assert_eq!(prefix_to_mask(24), [255, 255, 255, 0]);
    assert_eq!(prefix_to_mask(16), [255, 255, 0, 0]);
    assert_eq!(prefix_to_mask(25), [255, 255, 255, 128]);
    assert_eq!(prefix_to_mask(22), [255, 255, 252, 0]);
    assert_eq!(prefix_to_mask(0), [0, 0, 0, 0]);
    assert_eq!(prefix_to_mask(32), [255, 255, 255, 255]);
}

#[test]
fn broadcast_from_ip_and_prefix() {
    assert_eq!(
        broadcast_for(Ipv4Addr::new(192, 168, 1, 10), 24),
        Ipv4Addr::new(192, 168, 1, 255)
    );
    assert_eq!(
        broadcast_for(Ipv4Addr::new(10, 1, 2, 3), 8),
        Ipv4Addr::new(10, 255, 255, 255)
    );
    assert_eq!(
        broadcast_for(Ipv4Addr::new(172, 16, 5, 1), 22),
        Ipv4Addr::new(172, 16, 7, 255)
    );
}

#[test]
fn emulator_addresses_are_detected() {
    assert!(is_emulated_network(Ipv4Addr::new(10, 0, 2, 15)));
    assert!(is_emulated_network(Ipv4Addr::new(10, 0, 7, 1)));
    assert!(!is_emulated_network(Ipv4Addr::new(192, 168, 1, 15)));
    assert!(!is_emulated_network(Ipv4Addr::new(10, 1, 2, 15)));
    assert_eq!(FALLBACK_BROADCAST, Ipv4Addr::new(255, 255, 255, 255));
}
