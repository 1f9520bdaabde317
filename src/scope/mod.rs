//! # Record Scope
//!
//! The instrumentation pass needs to know which values are in scope after a
//! prefix of a rule body has been evaluated. That knowledge belongs to the
//! code generator, so the pass receives it as an injected [`RecordScope`].
//!
//! [`BoundVariables`] is a self-contained implementation used by the command
//! line front end and by tests. It follows the code generator's convention:
//!
//! ```text
//! prefix ends before the last term  -> [ (live bound variables) ]
//! prefix covers the whole body      -> [ head_0.value, head_1.value, ... ]
//! ```

use crate::ast::{push_unique, Expr, Program, Rule, Term};

/// Source of the records visible part-way through a rule body
pub trait RecordScope {
    /// Records visible once terms `0..=index` of `rule` have been evaluated,
    /// one expression per output component.
    fn record_after_prefix(&self, program: &Program, rule: &Rule, index: usize) -> Vec<Expr>;
}

impl<F> RecordScope for F
where
    F: Fn(&Program, &Rule, usize) -> Vec<Expr>,
{
    fn record_after_prefix(&self, program: &Program, rule: &Rule, index: usize) -> Vec<Expr> {
        self(program, rule, index)
    }
}

/// Scope derived from variable bindings alone.
///
/// Before the last term the record is a single tuple holding every variable
/// bound so far that a later term or a head still reads, in order of first
/// binding. An aggregate forgets everything except its grouping key and its
/// result. After the last term the record is the value of each head.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundVariables;

impl BoundVariables {
    pub fn new() -> Self {
        BoundVariables
    }

    /// Variables bound after evaluating terms `0..=index`
    pub fn bound_after(rule: &Rule, index: usize) -> Vec<String> {
        let mut bound: Vec<String> = Vec::new();
        for term in rule.body.iter().take(index + 1) {
            match term {
                Term::Aggregate {
                    result, group_by, ..
                } => {
                    bound = group_by.variables();
                    push_unique(&mut bound, result);
                }
                other => {
                    for var in other.bound_variables() {
                        push_unique(&mut bound, &var);
                    }
                }
            }
        }
        bound
    }

    /// Variables read by terms after `index` or by any head
    fn live_after(rule: &Rule, index: usize) -> Vec<String> {
        let mut live = Vec::new();
        for term in rule.body.iter().skip(index + 1) {
            for var in term.referenced_variables() {
                push_unique(&mut live, &var);
            }
        }
        for head in &rule.heads {
            for var in head.value.variables() {
                push_unique(&mut live, &var);
            }
        }
        live
    }
}

impl RecordScope for BoundVariables {
    fn record_after_prefix(&self, _program: &Program, rule: &Rule, index: usize) -> Vec<Expr> {
        if index + 1 >= rule.body.len() {
            return rule.heads.iter().map(|h| h.value.clone()).collect();
        }

        let live = Self::live_after(rule, index);
        let record = Self::bound_after(rule, index)
            .into_iter()
            .filter(|v| live.contains(v))
            .map(Expr::Var)
            .collect();
        vec![Expr::Tuple(record)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::RuleBuilder;

    fn join_rule() -> Rule {
        // T(c) :- S(a, b), a > 0, U(b, c).
        RuleBuilder::new()
            .head_vars("T", ["c"])
            .matches("S", ["a", "b"])
            .condition(Expr::binop(">", Expr::var("a"), Expr::int(0)))
            .matches("U", ["b", "c"])
            .build()
    }

    #[test]
    fn test_record_keeps_only_live_variables() {
        let program = Program::default();
        let rule = join_rule();

        let after_first = BoundVariables.record_after_prefix(&program, &rule, 0);
        assert_eq!(after_first, vec![Expr::vars(["a", "b"])]);

        // `a` is no longer read after the filter
        let after_filter = BoundVariables.record_after_prefix(&program, &rule, 1);
        assert_eq!(after_filter, vec![Expr::vars(["b"])]);
    }

    #[test]
    fn test_last_term_yields_one_record_per_head() {
        let program = Program::default();
        let rule = RuleBuilder::new()
            .head_vars("A", ["x"])
            .head_vars("B", ["x", "y"])
            .matches("C", ["x", "y"])
            .build();

        let records = BoundVariables.record_after_prefix(&program, &rule, 0);
        assert_eq!(records, vec![Expr::vars(["x"]), Expr::vars(["x", "y"])]);
    }

    #[test]
    fn test_aggregate_resets_scope() {
        let program = Program::default();
        let rule = RuleBuilder::new()
            .head_vars("M", ["k", "m"])
            .matches("S", ["k", "v"])
            .aggregate("c", Expr::vars(["k"]), "group_max", Expr::var("v"))
            .assign("m", Expr::var("c"))
            .build();

        assert_eq!(
            BoundVariables::bound_after(&rule, 1),
            vec!["k".to_string(), "c".to_string()]
        );
        let records = BoundVariables.record_after_prefix(&program, &rule, 1);
        assert_eq!(records, vec![Expr::vars(["k", "c"])]);
    }

    #[test]
    fn test_closure_is_a_scope() {
        let program = Program::default();
        let rule = join_rule();
        let stub = |_: &Program, _: &Rule, i: usize| vec![Expr::int(i as i64)];
        assert_eq!(stub.record_after_prefix(&program, &rule, 2), vec![Expr::int(2)]);
    }
}
