#![no_main]

use bindery_core::{ArrayChange, compute_change};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the split point; values are reduced to a small
    // alphabet so shared prefixes and suffixes actually occur.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = usize::from(split) % (rest.len() + 1);
    let old: Vec<u8> = rest[..split].iter().map(|b| b % 6).collect();
    let new: Vec<u8> = rest[split..].iter().map(|b| b % 6).collect();

    let change = compute_change(&old, &new);
    assert_eq!(change.is_none(), old == new, "None only for equal inputs");

    let mut applied = old.clone();
    if let Some(change) = &change {
        match change {
            ArrayChange::Insert { index, .. } => assert!(*index <= old.len()),
            ArrayChange::Remove { range, .. } | ArrayChange::Replace { range, .. } => {
                assert!(range.end <= old.len(), "range past old end");
            }
            ArrayChange::Set { .. } => {}
        }
        change.apply(&mut applied);
    }
    assert_eq!(applied, new, "round trip failed");
});
