use typm_core::probe::{CodepointRange, ProbeSet, DEFAULT_PROBE_RANGES};

#[test]
fn rebuilding_yields_identical_identifiers() {
    let first = ProbeSet::build(DEFAULT_PROBE_RANGES);
    let second = ProbeSet::build(DEFAULT_PROBE_RANGES);

    assert!(!first.is_empty());
    let first_ids: Vec<&str> = first.probes().iter().map(|p| p.id.as_str()).collect();
    let second_ids: Vec<&str> = second.probes().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn visibility_filter_over_ascii_block() {
    let set = ProbeSet::build(&[CodepointRange::new(0x0000, 0x007E)]);
    let ids: Vec<&str> = set.probes().iter().map(|p| p.id.as_str()).collect();

    assert!(ids.contains(&"U+0041"), "'A' must be probed");
    assert!(ids.contains(&"U+0020"), "plain space must be probed");
    assert!(!ids.contains(&"U+0000"), "NUL must be excluded");
    assert!(!ids.contains(&"U+0009"), "tab must be excluded");
    assert!(!ids.contains(&"U+000A"), "newline must be excluded");
}

#[test]
fn format_and_private_use_are_excluded() {
    let set = ProbeSet::build(&[
        CodepointRange::new(0x00AD, 0x00AD),
        CodepointRange::new(0xE000, 0xE002),
        CodepointRange::new(0x200B, 0x200F),
    ]);
    assert!(set.is_empty());
}

#[test]
fn surrogate_range_yields_nothing() {
    let set = ProbeSet::build(&[CodepointRange::new(0xD800, 0xDFFF)]);
    assert!(set.is_empty());
}

#[test]
fn empty_ranges_are_a_valid_degenerate_result() {
    let set = ProbeSet::build(&[]);
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
}

#[test]
fn probe_order_follows_range_order() {
    let set = ProbeSet::build(&[
        CodepointRange::new(0x0042, 0x0042),
        CodepointRange::new(0x0041, 0x0041),
    ]);
    let ids: Vec<&str> = set.probes().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["U+0042", "U+0041"]);
}
