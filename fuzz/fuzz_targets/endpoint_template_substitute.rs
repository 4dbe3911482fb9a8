#![no_main]

use std::collections::{BTreeMap, BTreeSet};

use libfuzzer_sys::fuzz_target;
use recon_plan::{extract_placeholders, has_unresolved_placeholder, substitute_placeholders};

fuzz_target!(|data: &[u8]| {
    let template = String::from_utf8_lossy(data);
    let names = extract_placeholders(&template);

    let mut seen = BTreeSet::new();
    for name in &names {
        assert!(!name.is_empty());
        assert_eq!(name.trim(), name.as_str());
        assert!(seen.insert(name.clone()), "duplicate placeholder {name}");
    }

    let values: BTreeMap<String, String> = names
        .iter()
        .map(|name| (name.clone(), "v".to_string()))
        .collect();
    let resolved = substitute_placeholders(&template, &values);
    if names.is_empty() {
        assert_eq!(resolved, template);
    }
    if !template.contains('{') {
        assert!(!has_unresolved_placeholder(&resolved));
    }
});
