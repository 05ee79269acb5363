use lanwake::reconcile::matcher::{
    find_match, longest_common_substring, normalize_hostname, score_match, SCORE_ID_MATCH,
};
use test_utils::{make_device, make_iface, with_info};


#[test]
fn identical_id_scores_absolute_and_wins() {
    let incoming = make_device("id-1", "totally-different", Some("10.1.1.1"), None);
    let stored = vec![
        make_device("id-2", "totally-different", Some("10.1.1.1"), Some("AA:BB:CC:DD:EE:01")),
        make_device("id-1", "old-name", Some("192.168.0.9"), None),
    ];

    assert_eq!(score_match(&incoming, &stored[1]), SCORE_ID_MATCH);
    let matched = find_match(&incoming, &stored).expect("id match must win");
    assert_eq!(matched.id, "id-1");
}

#[test]
fn disjoint_devices_never_match() {
    let incoming = make_device("new", "alpha", Some("192.168.1.10"), Some("AA:BB:CC:00:00:01"));
    let stored = vec![make_device(
        "other",
        "zzz",
        Some("192.168.1.20"),
        Some("AA:BB:CC:00:00:02"),
    )];

    assert!(find_match(&incoming, &stored).is_none());
}

#[test]
fn shared_mac_dominates_the_score() {
    let incoming = make_device("new", "renamed-box", Some("192.168.1.99"), Some("aa:bb:cc:dd:ee:ff"));
    let stored = vec![make_device(
        "stored",
        "oldname",
        Some("192.168.1.10"),
        Some("AA:BB:CC:DD:EE:FF"),
    )];

    // MAC comparison is case-insensitive; 60 alone beats the upgrade
    // threshold but not the default one.
    let score = score_match(&incoming, &stored[0]);
    assert!(score >= 60, "score was {score}");
}

#[test]
fn mac_conflict_with_shared_ip_is_penalized() {
    let incoming = make_device("new", "abox", Some("192.168.1.10"), Some("AA:AA:AA:AA:AA:01"));
    let stored = make_device("stored", "bbox", Some("192.168.1.10"), Some("BB:BB:BB:BB:BB:02"));

    // shared IP +10, disjoint MACs with shared IP -40, interface count +5
    assert_eq!(score_match(&incoming, &stored), -25);
}

#[test]
fn hostname_and_metadata_signals_accumulate() {
    let incoming = with_info(
        make_device("new", "Media_Center.local", Some("192.168.1.4"), None),
        Some("Windows 11"),
        Some("22631"),
        None,
    );
    let stored = with_info(
        make_device("stored", "mediacenterlocal", Some("192.168.1.4"), None),
        Some("Windows"),
        Some("22631"),
        None,
    );

    // hostname exact after normalization +30, IP +10, OS prefix +10,
    // OS version +5, interface count +5
    assert_eq!(score_match(&incoming, &stored), 60);
    assert!(find_match(&incoming, std::slice::from_ref(&stored)).is_some());
}

#[test]
fn identity_upgrade_lowers_the_threshold() {
    // Incoming supplies a MAC the stored record lacks: threshold drops to 30.
    let incoming = make_device("new", "workbench", Some("192.168.1.7"), Some("AA:BB:CC:11:22:33"));
    let stored = vec![make_device("stored", "workbench", None, None)];

    // hostname exact +30, interface count +5
    assert_eq!(score_match(&incoming, &stored[0]), 35);
    assert!(find_match(&incoming, &stored).is_some());

    // Same score without the upgrade falls short of 55.
    let stored_with_mac = vec![make_device(
        "stored",
        "workbench",
        None,
        Some("DD:EE:FF:00:11:22"),
    )];
    assert!(find_match(&incoming, &stored_with_mac).is_none());
}

#[test]
fn fuzzy_hostname_bands() {
    assert_eq!(longest_common_substring("workstation", "workstation2"), 11);
    assert_eq!(longest_common_substring("abcde", "xabcdex"), 5);
    assert_eq!(longest_common_substring("", "anything"), 0);

    let incoming = make_device("new", "workstation-01", None, None);
    let mut stored = make_device("stored", "workstation-02", None, None);
    stored.interfaces = vec![make_iface(Some("10.0.0.1"), None, None), make_iface(None, None, None)];

    // fuzzy >= 8 gives +20 and nothing else fires
    assert_eq!(score_match(&incoming, &stored), 20);
}

#[test]
fn hostname_normalization_strips_separators() {
    assert_eq!(normalize_hostname("My_PC.local"), "mypclocal");
    assert_eq!(normalize_hostname("PLAIN"), "plain");
}
