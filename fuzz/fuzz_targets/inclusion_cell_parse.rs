#![no_main]

use libfuzzer_sys::fuzz_target;
use recon_plan::{is_blank_cell, normalize_column_name, parse_cell_values};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    let values = parse_cell_values(&raw);
    for value in &values {
        assert!(!value.is_empty());
        assert_eq!(value.trim(), value.as_str());
        assert!(!value.contains(','));
        assert!(!value.contains('\n'));
    }
    if is_blank_cell(&raw) {
        assert!(values.is_empty());
    }

    let normalized = normalize_column_name(&raw);
    assert_eq!(normalize_column_name(&normalized), normalized);
    assert!(!normalized.contains(char::is_whitespace));
});
