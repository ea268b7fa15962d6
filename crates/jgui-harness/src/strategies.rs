#![forbid(unsafe_code)]

//! `proptest` strategies for user input.

use proptest::prelude::*;

/// Text typed into the unit-count field: plain counts, signed and padded
/// numbers, and junk.
pub fn unit_count_input() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..50).prop_map(|n| n.to_string()),
        (1u32..50).prop_map(|n| format!("-{n}")),
        (0u32..50).prop_map(|n| format!(" {n} ")),
        "[a-z]{1,4}",
        "[0-9]{1,2}\\.[0-9]",
    ]
}

/// Strings that parse as integers.
pub fn int_text() -> impl Strategy<Value = String> {
    any::<i32>().prop_map(|n| n.to_string())
}

/// Decimal strings with a fractional part.
pub fn float_text() -> impl Strategy<Value = String> {
    (any::<i16>(), 0u16..1000).prop_map(|(whole, frac)| format!("{whole}.{frac}"))
}

/// Strings containing at least one letter, never numeric.
pub fn non_numeric_text() -> impl Strategy<Value = String> {
    "[0-9]{0,2}[a-zA-Z][a-zA-Z0-9]{0,3}"
}

/// Unit agent states, including error variants.
pub fn agent_state() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("started".to_string()),
        Just("pending".to_string()),
        Just("installed".to_string()),
        "[a-z]{1,6}-error",
        "[a-z]{1,8}",
    ]
}
