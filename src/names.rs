//! Synthesized names.
//!
//! Every name introduced by the pass starts with [`SYNTHETIC_PREFIX`], which
//! the front end rejects in user-written identifiers. Names are pure
//! functions of their inputs so repeated builds agree on them.

/// Marker carried by every synthesized name
pub const SYNTHETIC_PREFIX: &str = "__";

/// Prefix of the variable holding an aggregate's `(provenance, result)` pair
pub const INPUTS_PREFIX: &str = "__inputs_";

/// Prefix of provenance-preserving aggregate wrappers
pub const WRAPPER_PREFIX: &str = "__debug_";

/// Binding for the fact matched by term `index` of relation `relation`:
/// `R` at index 0 becomes `__r0`.
///
/// The index is appended without a separator, so a relation whose name ends
/// in a digit can collide with a later term: `S1` at 0 and `S` at 10 both
/// give `__s10`. The format is kept as is; see
/// `test_fact_binding_digit_suffix_collision`.
pub fn fact_binding(relation: &str, index: usize) -> String {
    let legal: String = relation
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{SYNTHETIC_PREFIX}{}{index}", legal.to_lowercase())
}

/// Renamed result of a rewritten aggregate
pub fn inputs_binding(result: &str) -> String {
    format!("{INPUTS_PREFIX}{result}")
}

/// Wrapper synthesized for aggregate function `function`
pub fn wrapper_name(function: &str) -> String {
    format!("{WRAPPER_PREFIX}{function}")
}

/// True for names produced by [`wrapper_name`]
pub fn is_wrapper(function: &str) -> bool {
    function.starts_with(WRAPPER_PREFIX)
}
