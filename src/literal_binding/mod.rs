//! # Literal Binding
//!
//! Gives every positively matched fact a name so trace hooks can pass the
//! whole fact as an argument.
//!
//! ## Example
//!
//! ```datalog
//! R(a, b) :- S(a, b).
//! ```
//!
//! After binding:
//! ```datalog
//! R(a, b) :- __s0 in S(a, b).
//! ```
//!
//! The binding wraps the original pattern, so the match itself is unchanged.
//! Negative matches have no fact to name and pass through untouched, as do
//! all other terms.

use crate::ast::{Expr, Polarity, Term};
use crate::names::fact_binding;

/// Bind the fact matched by the term at `index`.
///
/// Patterns that already carry a name are returned as they are.
pub fn bind_literal(term: &Term, index: usize) -> Term {
    match term {
        Term::Match {
            polarity: Polarity::Positive,
            relation,
            value,
        } => {
            if value.binding_name().is_some() {
                return term.clone();
            }
            Term::Match {
                polarity: Polarity::Positive,
                relation: relation.clone(),
                value: Expr::bind(fact_binding(relation, index), value.clone()),
            }
        }
        Term::Match {
            polarity: Polarity::Negative,
            ..
        }
        | Term::Condition(_)
        | Term::Aggregate { .. }
        | Term::FlatMap { .. }
        | Term::Inspect(_) => term.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive(relation: &str, value: Expr) -> Term {
        Term::Match {
            polarity: Polarity::Positive,
            relation: relation.to_string(),
            value,
        }
    }

    #[test]
    fn test_binds_unnamed_match() {
        let term = positive("S", Expr::vars(["a", "b"]));
        let bound = bind_literal(&term, 0);
        assert_eq!(bound, positive("S", Expr::bind("__s0", Expr::vars(["a", "b"]))));
        assert_eq!(bound.to_string(), "__s0 in S(a, b)");
    }

    #[test]
    fn test_binding_uses_term_index() {
        let term = positive("Edge", Expr::vars(["x", "y"]));
        assert_eq!(bind_literal(&term, 4).bound_fact(), Some("__edge4"));
    }

    #[test]
    fn test_named_match_unchanged() {
        let term = positive("S", Expr::bind("fact", Expr::vars(["a", "b"])));
        assert_eq!(bind_literal(&term, 2), term);
    }

    #[test]
    fn test_negative_match_unchanged() {
        let term = Term::Match {
            polarity: Polarity::Negative,
            relation: "S".to_string(),
            value: Expr::vars(["a"]),
        };
        assert_eq!(bind_literal(&term, 1), term);
    }

    #[test]
    fn test_other_terms_unchanged() {
        let cond = Term::Condition(Expr::binop(">", Expr::var("a"), Expr::int(0)));
        assert_eq!(bind_literal(&cond, 1), cond);

        let flat = Term::FlatMap {
            var: "x".to_string(),
            expr: Expr::var("xs"),
        };
        assert_eq!(bind_literal(&flat, 2), flat);
    }
}
