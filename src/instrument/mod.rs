//! # Debug Instrumentation
//!
//! Runs the instrumentation stages over a rule and over a whole program.
//!
//! ## Pipeline Position
//!
//! ```text
//! checked program
//!     -> [Literal Binding]        every positive match gets a name
//!     -> [Aggregate Provenance]   aggregates carry their input rows
//!     -> [Hook Placement]         Inspect terms spliced after each term
//!     -> code generation
//!
//! checked program
//!     -> [Wrapper Synthesis]      one __debug_<f> per aggregate function
//!     -> function table
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dataflow_inspect::ast::builders::RuleBuilder;
//! use dataflow_inspect::ast::Program;
//! use dataflow_inspect::{BoundVariables, DebugInstrumenter};
//!
//! let rule = RuleBuilder::new()
//!     .head_vars("R", ["a", "b"])
//!     .matches("S", ["a", "b"])
//!     .build();
//! let program = Program::new(vec![rule], Default::default());
//!
//! let mut instrumenter = DebugInstrumenter::new(BoundVariables);
//! let instrumented = instrumenter.instrument_program(&program).unwrap();
//!
//! assert_eq!(instrumented.rules[0].body.len(), 2);
//! ```

use crate::ast::{FunctionTable, Program, Rule, Term};
use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, InstrumentResult};
use crate::hook_placement::{HookKind, HookPlacer, OperatorId};
use crate::literal_binding::bind_literal;
use crate::names::{is_wrapper, INPUTS_PREFIX};
use crate::provenance::rewrite_aggregate;
use crate::scope::RecordScope;
use crate::wrapper_synthesis::{ensure_wrapper, AggregateSite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// Statistics about instrumentation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentStats {
    /// Number of rules rewritten
    pub rules_instrumented: usize,
    /// Number of positive matches that received a synthesized name
    pub literals_bound: usize,
    /// Number of aggregates rewritten to carry provenance
    pub aggregates_rewritten: usize,
    /// Number of Inspect terms inserted
    pub inspects_inserted: usize,
    /// Number of wrapper functions added to the function table
    pub wrappers_synthesized: usize,
}

/// Catalog entry describing one observation point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorEntry {
    pub id: OperatorId,
    pub kind: HookKind,
    /// Rendered term the hook observes
    pub term: String,
}

/// Debug instrumentation pass
///
/// Owns the injected [`RecordScope`] and the runtime naming configuration,
/// and accumulates statistics and the operator catalog across rules.
pub struct DebugInstrumenter<S> {
    scope: S,
    config: InstrumentConfig,
    stats: InstrumentStats,
    operators: Vec<OperatorEntry>,
}

impl<S: RecordScope> DebugInstrumenter<S> {
    /// Create an instrumenter with the default runtime names
    pub fn new(scope: S) -> Self {
        Self::with_config(scope, InstrumentConfig::default())
    }

    pub fn with_config(scope: S, config: InstrumentConfig) -> Self {
        DebugInstrumenter {
            scope,
            config,
            stats: InstrumentStats::default(),
            operators: Vec::new(),
        }
    }

    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }

    pub fn stats(&self) -> &InstrumentStats {
        &self.stats
    }

    /// Observation points created so far, in program order
    pub fn operators(&self) -> &[OperatorEntry] {
        &self.operators
    }

    /// Instrument every rule and extend the function table with wrappers.
    ///
    /// Statistics and the operator catalog restart with each call.
    pub fn instrument_program(&mut self, program: &Program) -> InstrumentResult<Program> {
        self.stats = InstrumentStats::default();
        self.operators.clear();

        for (rule_index, rule) in program.rules.iter().enumerate() {
            ensure_uninstrumented(rule, rule_index)?;
        }

        let functions = self.synthesize_wrappers(program)?;
        let rules = program
            .rules
            .iter()
            .enumerate()
            .map(|(rule_index, rule)| Ok(rule.with_body(self.instrument_rule(program, rule_index)?)))
            .collect::<InstrumentResult<Vec<Rule>>>()?;

        info!(
            rules = self.stats.rules_instrumented,
            literals = self.stats.literals_bound,
            aggregates = self.stats.aggregates_rewritten,
            inspects = self.stats.inspects_inserted,
            wrappers = self.stats.wrappers_synthesized,
            "program_instrumented"
        );

        Ok(Program::new(rules, functions))
    }

    /// Instrument the rule at `rule_index` and return its new body.
    ///
    /// Binds literals, rewrites aggregates, then splices hooks after each
    /// term of the rewritten body. Operator ids use positions in that
    /// rewritten body.
    ///
    /// Catalog entries from an earlier call for the same rule are replaced,
    /// so ids in [`operators`](Self::operators) stay unique. Statistics
    /// count every call.
    pub fn instrument_rule(
        &mut self,
        program: &Program,
        rule_index: usize,
    ) -> InstrumentResult<Vec<Term>> {
        let rule = program.rules.get(rule_index).ok_or_else(|| {
            InstrumentError::invariant(rule_index, 0, "rule index out of range")
        })?;
        ensure_uninstrumented(rule, rule_index)?;

        let bound_body: Vec<Term> = rule
            .body
            .iter()
            .enumerate()
            .map(|(index, term)| bind_literal(term, index))
            .collect();
        let literals_bound = rule
            .body
            .iter()
            .zip(&bound_body)
            .filter(|(before, after)| before != after)
            .count();
        let bound_rule = rule.with_body(bound_body);

        let mut rewritten_body = Vec::with_capacity(bound_rule.body.len());
        let mut aggregates_rewritten = 0;
        for index in 0..bound_rule.body.len() {
            let terms = rewrite_aggregate(program, &self.scope, &bound_rule, rule_index, index)?;
            if terms.len() > 1 {
                aggregates_rewritten += 1;
            }
            rewritten_body.extend(terms);
        }
        let rewritten_rule = bound_rule.with_body(rewritten_body);

        let placer = HookPlacer::new(program, &self.scope, &self.config);
        let mut body = Vec::with_capacity(rewritten_rule.body.len() * 2);
        let mut entries = Vec::new();
        for (index, term) in rewritten_rule.body.iter().enumerate() {
            body.push(term.clone());
            for hook in placer.hooks_after(&rewritten_rule, rule_index, index)? {
                trace!(rule = rule_index, term = index, id = %hook.id, kind = ?hook.kind, "hook_placed");
                entries.push(OperatorEntry {
                    id: hook.id,
                    kind: hook.kind,
                    term: term.to_string(),
                });
                body.push(hook.term);
            }
        }

        debug!(
            rule = rule_index,
            terms_before = rule.body.len(),
            terms_after = body.len(),
            hooks = entries.len(),
            "rule_instrumented"
        );

        self.stats.rules_instrumented += 1;
        self.stats.literals_bound += literals_bound;
        self.stats.aggregates_rewritten += aggregates_rewritten;
        self.stats.inspects_inserted += entries.len();
        self.operators
            .retain(|op| usize::try_from(op.id.rule).ok() != Some(rule_index));
        self.operators.extend(entries);

        Ok(body)
    }

    /// Function table extended with one wrapper per distinct aggregate
    /// function used anywhere in `program`
    pub fn synthesize_wrappers(&mut self, program: &Program) -> InstrumentResult<FunctionTable> {
        let mut sites: BTreeMap<&str, AggregateSite> = BTreeMap::new();
        for (rule_index, rule) in program.rules.iter().enumerate() {
            for (term_index, term) in rule.body.iter().enumerate() {
                if let Term::Aggregate { function, .. } = term {
                    sites.entry(function.as_str()).or_insert(AggregateSite {
                        rule: rule_index,
                        term: term_index,
                    });
                }
            }
        }

        let mut functions = program.functions.clone();
        for (function, site) in sites {
            if ensure_wrapper(&mut functions, function, &self.config, site)? {
                self.stats.wrappers_synthesized += 1;
            }
        }
        Ok(functions)
    }
}

/// Reject rules that already went through the pass
fn ensure_uninstrumented(rule: &Rule, rule_index: usize) -> InstrumentResult<()> {
    let instrumented = rule.body.iter().any(|term| match term {
        Term::Inspect(_) => true,
        Term::Aggregate {
            result, function, ..
        } => is_wrapper(function) || result.starts_with(INPUTS_PREFIX),
        Term::Match { .. } | Term::Condition(_) | Term::FlatMap { .. } => false,
    });
    if instrumented {
        return Err(InstrumentError::AlreadyInstrumented { rule: rule_index });
    }
    Ok(())
}
