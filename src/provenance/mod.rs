//! # Aggregate Provenance
//!
//! Rewrites aggregation terms so the rows that fed an aggregate stay
//! observable next to its result.
//!
//! ## Example
//!
//! Original:
//! ```datalog
//! M(k, c) :- __s0 in S(k, a, b), var c = Aggregate((k), group_max((a, b))).
//! ```
//!
//! After rewriting:
//! ```datalog
//! M(k, c) :- __s0 in S(k, a, b),
//!            var __inputs_c = Aggregate((k), __debug_group_max(((k, a, b), (a, b)))),
//!            var c = __inputs_c.1.
//! ```
//!
//! The wrapper (see [`crate::wrapper_synthesis`]) returns
//! `(provenance, result)`; the trailing assignment restores `c` so every
//! later term and head sees the value it saw before.
//!
//! The rewrite is not idempotent. It is applied exactly once per term by the
//! orchestrator, which refuses input that already references a wrapper.

use crate::ast::{Expr, Program, Rule, Term};
use crate::error::{InstrumentError, InstrumentResult};
use crate::names::{inputs_binding, wrapper_name};
use crate::scope::RecordScope;

/// Rewrite the term at `index` of `rule`.
///
/// Non-aggregate terms come back as a single unchanged term. An aggregate
/// becomes the provenance-carrying aggregate followed by the assignment that
/// restores its original result.
pub fn rewrite_aggregate<S>(
    program: &Program,
    scope: &S,
    rule: &Rule,
    rule_index: usize,
    index: usize,
) -> InstrumentResult<Vec<Term>>
where
    S: RecordScope + ?Sized,
{
    let term = rule.body.get(index).ok_or_else(|| {
        InstrumentError::invariant(rule_index, index, "term index out of range")
    })?;

    let (result, group_by, function, input) = match term {
        Term::Aggregate {
            result,
            group_by,
            function,
            input,
        } => (result, group_by, function, input),
        Term::Match { .. } | Term::Condition(_) | Term::FlatMap { .. } | Term::Inspect(_) => {
            return Ok(vec![term.clone()]);
        }
    };

    if index == 0 {
        return Err(InstrumentError::invariant(
            rule_index,
            index,
            "aggregate is the first term of its rule",
        ));
    }

    let previous = scope
        .record_after_prefix(program, rule, index - 1)
        .into_iter()
        .next()
        .ok_or_else(|| {
            InstrumentError::invariant(rule_index, index, "no record visible before aggregate")
        })?;

    let renamed = inputs_binding(result);
    let aggregate = Term::Aggregate {
        result: renamed.clone(),
        group_by: group_by.clone(),
        function: wrapper_name(function),
        input: Expr::tuple(vec![previous, input.clone()]),
    };
    let restore = Term::Condition(Expr::assign(
        Expr::var_decl(result.clone()),
        Expr::proj(Expr::var(renamed), 1),
    ));

    Ok(vec![aggregate, restore])
}
