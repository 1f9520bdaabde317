//! # Inspection Hook Placement
//!
//! Decides, term by term, where trace-emitting `Inspect` terms go and what
//! they report.
//!
//! ## Decision Table
//!
//! Evaluated in order for the term at `index`:
//!
//! | # | Situation                                        | Hook                  |
//! |---|--------------------------------------------------|-----------------------|
//! | 1 | first term of a multi-term rule                  | none                  |
//! | 2 | condition followed by another condition          | none (run continues)  |
//! | 3 | first term of a single-term rule                 | [`HookKind::Source`]  |
//! | 4 | positive match (join)                            | [`HookKind::Join`]    |
//! | 5 | rewritten aggregate                              | [`HookKind::Aggregate`] |
//! | 6 | anything else (antijoin, filter, flat-map, ...)  | [`HookKind::Step`]    |
//!
//! A hook emits one `Inspect` per output component reported by the
//! [`RecordScope`] at `index`. Joins call the two-input runtime entry point,
//! every other hook calls the single-input one:
//!
//! ```text
//! debug_event((rule, term, component), __weight, __timestamp, input, output)
//! debug_event_join((rule, term, component), __weight, __timestamp, input1, input2, output)
//! ```
//!
//! The last term of a rule is never part of a suppressed run, even when the
//! term before it is a condition whose own hook was suppressed.

use crate::ast::{Expr, Program, Rule, Term};
use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, InstrumentResult};
use crate::names::INPUTS_PREFIX;
use crate::scope::RecordScope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observation point of a trace event: `(rule, term, output component)`.
///
/// The only correlation key between instrumented rules and the debugger, so
/// it never repeats within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorId {
    pub rule: u32,
    pub term: u32,
    pub head: u32,
}

impl OperatorId {
    /// Build an identifier from positions, which must fit in `u32`
    pub fn new(rule: usize, term: usize, head: usize) -> InstrumentResult<Self> {
        let narrow = |value: usize, what: &str| {
            u32::try_from(value).map_err(|_| {
                InstrumentError::invariant(rule, term, format!("{what} index {value} exceeds u32"))
            })
        };
        Ok(OperatorId {
            rule: narrow(rule, "rule")?,
            term: narrow(term, "term")?,
            head: narrow(head, "output")?,
        })
    }

    /// `(rule, term, head)` as a tuple of `u32` literals
    pub fn to_expr(self) -> Expr {
        Expr::tuple(vec![
            Expr::u32(self.rule),
            Expr::u32(self.term),
            Expr::u32(self.head),
        ])
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.rule, self.term, self.head)
    }
}

/// Shape of the hook placed after a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Sole term of a single-term rule: input is the matched fact
    Source,
    /// Join with a new relation: inputs are the previous record and the fact
    Join,
    /// Aggregate: input is the provenance collected by the wrapper
    Aggregate,
    /// Any other step: input is the previous record
    Step,
}

/// One `Inspect` term together with what it observes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub id: OperatorId,
    pub kind: HookKind,
    pub term: Term,
}

/// Which hook, if any, follows the term at `index`
pub fn placement(rule: &Rule, index: usize) -> Option<HookKind> {
    let len = rule.body.len();
    let term = rule.body.get(index)?;

    if index == 0 && len > 1 {
        return None;
    }
    if term.is_condition() && index + 1 != len && rule.body[index + 1].is_condition() {
        return None;
    }
    if index == 0 {
        return Some(HookKind::Source);
    }
    match term {
        Term::Match { .. } if term.is_positive_match() => Some(HookKind::Join),
        Term::Aggregate { .. } => Some(HookKind::Aggregate),
        Term::Match { .. } | Term::Condition(_) | Term::FlatMap { .. } | Term::Inspect(_) => {
            Some(HookKind::Step)
        }
    }
}

/// Builds the `Inspect` terms for one program
pub struct HookPlacer<'a, S: ?Sized> {
    program: &'a Program,
    scope: &'a S,
    config: &'a InstrumentConfig,
}

impl<'a, S> HookPlacer<'a, S>
where
    S: RecordScope + ?Sized,
{
    pub fn new(program: &'a Program, scope: &'a S, config: &'a InstrumentConfig) -> Self {
        HookPlacer {
            program,
            scope,
            config,
        }
    }

    /// Hooks to splice in right after term `index` of `rule`.
    ///
    /// `rule` is the aggregate-rewritten rule, and `index` a position in it.
    pub fn hooks_after(
        &self,
        rule: &Rule,
        rule_index: usize,
        index: usize,
    ) -> InstrumentResult<Vec<Hook>> {
        let Some(kind) = placement(rule, index) else {
            return Ok(Vec::new());
        };

        let inputs = match kind {
            HookKind::Source => vec![Expr::var(self.fact_at(rule, rule_index, index)?)],
            HookKind::Join => vec![
                self.previous_record(rule, rule_index, index)?,
                Expr::var(self.fact_at(rule, rule_index, index)?),
            ],
            HookKind::Aggregate => vec![Expr::proj(
                Expr::var(provenance_var(rule, rule_index, index)?),
                0,
            )],
            HookKind::Step => vec![self.previous_record(rule, rule_index, index)?],
        };

        let outputs = self.scope.record_after_prefix(self.program, rule, index);
        if outputs.is_empty() {
            return Err(InstrumentError::invariant(
                rule_index,
                index,
                "no output record after term",
            ));
        }

        let func = match kind {
            HookKind::Join => &self.config.join_event_function,
            HookKind::Source | HookKind::Aggregate | HookKind::Step => {
                &self.config.event_function
            }
        };

        outputs
            .into_iter()
            .enumerate()
            .map(|(component, output)| {
                let id = OperatorId::new(rule_index, index, component)?;
                let mut args = vec![
                    id.to_expr(),
                    Expr::var(self.config.weight_var.clone()),
                    Expr::var(self.config.timestamp_var.clone()),
                ];
                args.extend(inputs.iter().cloned());
                args.push(output);
                Ok(Hook {
                    id,
                    kind,
                    term: Term::Inspect(Expr::apply(func.clone(), args)),
                })
            })
            .collect()
    }

    /// First record visible before term `index`
    fn previous_record(&self, rule: &Rule, rule_index: usize, index: usize) -> InstrumentResult<Expr> {
        let previous = index.checked_sub(1).ok_or_else(|| {
            InstrumentError::invariant(rule_index, index, "no term before the first term")
        })?;
        self.scope
            .record_after_prefix(self.program, rule, previous)
            .into_iter()
            .next()
            .ok_or_else(|| {
                InstrumentError::invariant(rule_index, index, "no record visible before term")
            })
    }

    fn fact_at(&self, rule: &Rule, rule_index: usize, index: usize) -> InstrumentResult<String> {
        rule.body
            .get(index)
            .and_then(Term::bound_fact)
            .map(str::to_string)
            .ok_or_else(|| {
                InstrumentError::invariant(rule_index, index, "term does not bind a matched fact")
            })
    }
}

/// Renamed result of the rewritten aggregate at `index`
fn provenance_var(rule: &Rule, rule_index: usize, index: usize) -> InstrumentResult<&str> {
    match rule.body.get(index) {
        Some(Term::Aggregate { result, .. }) if result.starts_with(INPUTS_PREFIX) => Ok(result),
        _ => Err(InstrumentError::invariant(
            rule_index,
            index,
            "aggregate was not rewritten to carry provenance",
        )),
    }
}
