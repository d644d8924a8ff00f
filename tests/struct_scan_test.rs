//! Keyed-struct scan behavior

use memscan::{
    api::FieldValue, DataType, ScanOp, ScanTarget, ScanValue, Scanner, ScannerConfig,
    StructSearch, SyntheticProbe,
};

/// Key 0x7F at offset 4 from base; Int 100 at base; bytes AA BB at base+8
fn sample_search() -> StructSearch {
    let mut search = StructSearch::new(0x7F, 4);
    search
        .add_field(0, DataType::Int, FieldValue::Scalar(ScanValue::from_int(100)))
        .unwrap();
    search
        .add_field(8, DataType::ByteArray, FieldValue::Bytes(&[0xAA, 0xBB]))
        .unwrap();
    search
}

fn sample_bytes() -> [u8; 10] {
    [100, 0, 0, 0, 0x7F, 0, 0, 0, 0xAA, 0xBB]
}

fn struct_scanner(probe: SyntheticProbe) -> Scanner<SyntheticProbe> {
    Scanner::with_probe(probe, DataType::Struct, ScannerConfig::default())
}

#[test]
fn test_struct_match_reports_base_address() {
    let mut data = vec![0u8; 64];
    data[20..30].copy_from_slice(&sample_bytes());
    let mut probe = SyntheticProbe::new();
    let base = probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));

    assert_eq!(summary.result_count, 1);
    assert_eq!(scanner.results()[0].address, base.add(20));
}

#[test]
fn test_partial_field_match_rejected() {
    // Key byte and sequence field present, scalar field wrong
    let mut bytes = sample_bytes();
    bytes[0] = 99;
    let mut data = vec![0u8; 32];
    data[8..18].copy_from_slice(&bytes);
    let mut probe = SyntheticProbe::new();
    probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(summary.result_count, 0);
}

#[test]
fn test_struct_needs_room_before_key() {
    // The key byte sits at region offset 2; the Int field would start
    // before the region
    let mut data = vec![0u8; 32];
    data[2] = 0x7F;
    let mut probe = SyntheticProbe::new();
    probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(summary.result_count, 0);
}

#[test]
fn test_struct_rescan_follows_mutation() {
    let mut data = vec![0u8; 64];
    data[16..26].copy_from_slice(&sample_bytes());
    let mut probe = SyntheticProbe::new();
    let base = probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(scanner.result_count(), 1);

    // Still matching
    let rescan = scanner.rescan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(rescan.result_count, 1);

    // Break the sequence field; the candidate falls out
    scanner.probe_mut().data_mut(base)[24] = 0x00;
    let rescan = scanner.rescan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(rescan.result_count, 0);
}

#[test]
fn test_struct_rescan_batches_nearby_candidates() {
    // Two instances close together so the rescan shares one chunk read
    let mut data = vec![0u8; 128];
    data[8..18].copy_from_slice(&sample_bytes());
    data[48..58].copy_from_slice(&sample_bytes());
    let mut probe = SyntheticProbe::new();
    let base = probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(scanner.result_count(), 2);

    let rescan = scanner.rescan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(rescan.result_count, 2);
    assert_eq!(scanner.invalid_address_count(), 0);

    let addrs: Vec<u64> = scanner.results().iter().map(|r| r.address.as_u64()).collect();
    assert_eq!(addrs, vec![base.as_u64() + 8, base.as_u64() + 48]);
}

#[test]
fn test_struct_first_scan_rejects_not() {
    let mut probe = SyntheticProbe::new();
    probe.add_region(vec![0u8; 16]);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Not, ScanTarget::Struct(&search));
    assert_eq!(summary.result_count, 0);
    assert!(!scanner.first_scan_done());
    assert!(scanner
        .errors()
        .iter()
        .any(|e| e.contains("only supports exact")));
}

#[test]
fn test_struct_rejects_ordering_ops() {
    let mut data = vec![0u8; 32];
    data[4..14].copy_from_slice(&sample_bytes());
    let mut probe = SyntheticProbe::new();
    probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(scanner.result_count(), 1);

    let rescan = scanner.rescan(ScanOp::Changed, ScanTarget::Struct(&search));
    // No-op with prior results preserved
    assert_eq!(rescan.result_count, 1);
    assert!(scanner
        .errors()
        .iter()
        .any(|e| e.contains("Only exact and not")));
}

#[test]
fn test_struct_result_inside_single_region() {
    // Candidate struct straddling two regions must not appear: each
    // region is scanned in isolation
    let mut left = vec![0u8; 8];
    left[4..8].copy_from_slice(&100i32.to_le_bytes());
    let mut right = vec![0u8; 8];
    right[0] = 0x7F;
    right[4..6].copy_from_slice(&[0xAA, 0xBB]);
    let mut probe = SyntheticProbe::new();
    probe.add_region(left);
    probe.add_region(right);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(summary.result_count, 0);
}

#[test]
fn test_multiple_key_bytes_single_match() {
    // Decoy key bytes around one real instance
    let mut data = vec![0u8; 96];
    data[0] = 0x7F;
    data[90] = 0x7F;
    data[40..50].copy_from_slice(&sample_bytes());
    let mut probe = SyntheticProbe::new();
    let base = probe.add_region(data);

    let search = sample_search();
    let mut scanner = struct_scanner(probe);
    let summary = scanner.first_scan(ScanOp::Exact, ScanTarget::Struct(&search));
    assert_eq!(summary.result_count, 1);
    assert_eq!(scanner.results()[0].address, base.add(40));
}
