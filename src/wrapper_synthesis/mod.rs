//! # Aggregate Wrapper Synthesis
//!
//! Generates the provenance-preserving wrapper referenced by rewritten
//! aggregates (see [`crate::provenance`]).
//!
//! ## Example
//!
//! For `extern function group_max(g: Group<'K, 'V>): 'V` the synthesized
//! wrapper is:
//!
//! ```text
//! function __debug_group_max(g: Group<'K, ('__I, 'V)>): (Vec<'__I>, 'V) =
//!     {(var inputs, var original_group) = debug_split_group(g);
//!      (inputs, group_max(original_group))}
//! ```
//!
//! Wrapper names depend only on the original name, so one wrapper serves
//! every rule that aggregates with the same function. Insertion checks the
//! table first: the table is keyed by name and a second insert would
//! silently replace the first.

use crate::ast::{Expr, Function, FunctionTable, Param, Type};
use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, InstrumentResult};
use crate::names::wrapper_name;
use tracing::debug;

/// Name of the grouped-collection type passed to aggregate functions
pub const GROUP_TYPE: &str = "Group";

/// Name of the collection type holding provenance
pub const VEC_TYPE: &str = "Vec";

/// Type variable standing for one row of provenance
pub const PROVENANCE_TYPE_VAR: &str = "__I";

const GROUP_PARAM: &str = "g";
const INPUTS_LOCAL: &str = "inputs";
const ORIGINAL_GROUP_LOCAL: &str = "original_group";

/// Where an aggregate function is used, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSite {
    pub rule: usize,
    pub term: usize,
}

/// Build the wrapper for `original`.
///
/// `original` must take a `Group<K, V>` as its first parameter.
pub fn synthesize_wrapper(
    original: &Function,
    config: &InstrumentConfig,
    site: AggregateSite,
) -> InstrumentResult<Function> {
    let (key, value) = group_arguments(original).ok_or_else(|| {
        InstrumentError::invariant(
            site.rule,
            site.term,
            format!("aggregate function `{}` does not take a group", original.name),
        )
    })?;

    let provenance = Type::var(PROVENANCE_TYPE_VAR);
    let param = Param {
        name: GROUP_PARAM.to_string(),
        ty: Type::named(
            GROUP_TYPE,
            vec![key.clone(), Type::Tuple(vec![provenance.clone(), value.clone()])],
        ),
    };
    let ret = Type::Tuple(vec![
        Type::named(VEC_TYPE, vec![provenance]),
        original.ret.clone(),
    ]);

    let split = Expr::assign(
        Expr::tuple(vec![
            Expr::var_decl(INPUTS_LOCAL),
            Expr::var_decl(ORIGINAL_GROUP_LOCAL),
        ]),
        Expr::apply(
            config.split_group_function.clone(),
            vec![Expr::var(GROUP_PARAM)],
        ),
    );
    let result = Expr::tuple(vec![
        Expr::var(INPUTS_LOCAL),
        Expr::apply(original.name.clone(), vec![Expr::var(ORIGINAL_GROUP_LOCAL)]),
    ]);

    Ok(Function {
        name: wrapper_name(&original.name),
        params: vec![param],
        ret,
        body: Some(Expr::Seq(vec![split, result])),
    })
}

/// Key and value types of the group taken by an aggregate function
fn group_arguments(function: &Function) -> Option<(&Type, &Type)> {
    match &function.params.first()?.ty {
        Type::Named { name, args } if name == GROUP_TYPE && args.len() == 2 => {
            Some((&args[0], &args[1]))
        }
        _ => None,
    }
}

/// Add the wrapper for `function` to `functions` unless it is already there.
///
/// Returns whether a wrapper was inserted.
pub fn ensure_wrapper(
    functions: &mut FunctionTable,
    function: &str,
    config: &InstrumentConfig,
    site: AggregateSite,
) -> InstrumentResult<bool> {
    let name = wrapper_name(function);
    if functions.contains_key(&name) {
        debug!(wrapper = %name, "wrapper_already_present");
        return Ok(false);
    }

    let original = functions.get(function).ok_or_else(|| {
        InstrumentError::invariant(
            site.rule,
            site.term,
            format!("unknown aggregate function `{function}`"),
        )
    })?;
    let wrapper = synthesize_wrapper(original, config, site)?;

    debug!(wrapper = %name, original = %function, "wrapper_synthesized");
    functions.insert(name, wrapper);
    Ok(true)
}
