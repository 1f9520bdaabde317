//! Builder Patterns for AST Construction
//!
//! Provides fluent APIs for constructing rules and functions, particularly
//! useful for tests.
//!
//! ## Example
//!
//! ```rust
//! use dataflow_inspect::ast::builders::RuleBuilder;
//! use dataflow_inspect::ast::Expr;
//!
//! // T(c) :- S(a, b), a > 0, U(b, c).
//! let rule = RuleBuilder::new()
//!     .head_vars("T", ["c"])
//!     .matches("S", ["a", "b"])
//!     .condition(Expr::binop(">", Expr::var("a"), Expr::int(0)))
//!     .matches("U", ["b", "c"])
//!     .build();
//!
//! assert_eq!(rule.body.len(), 3);
//! ```

use super::{Expr, Function, Head, Param, Polarity, Rule, Term, Type};

/// Builder for constructing Rule instances
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    heads: Vec<Head>,
    body: Vec<Term>,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a head with an arbitrary value expression
    pub fn head(mut self, relation: &str, value: Expr) -> Self {
        self.heads.push(Head::new(relation, value));
        self
    }

    /// Add a head whose value is a tuple of variables
    pub fn head_vars<I, S>(self, relation: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.head(relation, Expr::vars(vars))
    }

    /// Positive match of a relation against a tuple of variables
    pub fn matches<I, S>(self, relation: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_value(relation, Expr::vars(vars))
    }

    /// Positive match of a relation against an arbitrary pattern
    pub fn match_value(mut self, relation: &str, value: Expr) -> Self {
        self.body.push(Term::Match {
            polarity: Polarity::Positive,
            relation: relation.to_string(),
            value,
        });
        self
    }

    /// Negative match (antijoin)
    pub fn not_matches<I, S>(mut self, relation: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.push(Term::Match {
            polarity: Polarity::Negative,
            relation: relation.to_string(),
            value: Expr::vars(vars),
        });
        self
    }

    pub fn condition(mut self, expr: Expr) -> Self {
        self.body.push(Term::Condition(expr));
        self
    }

    /// `var var = rhs`
    pub fn assign(self, var: &str, rhs: Expr) -> Self {
        self.condition(Expr::assign(Expr::var_decl(var), rhs))
    }

    pub fn aggregate(mut self, result: &str, group_by: Expr, function: &str, input: Expr) -> Self {
        self.body.push(Term::Aggregate {
            result: result.to_string(),
            group_by,
            function: function.to_string(),
            input,
        });
        self
    }

    pub fn flat_map(mut self, var: &str, expr: Expr) -> Self {
        self.body.push(Term::FlatMap {
            var: var.to_string(),
            expr,
        });
        self
    }

    pub fn term(mut self, term: Term) -> Self {
        self.body.push(term);
        self
    }

    pub fn build(self) -> Rule {
        Rule::new(self.heads, self.body)
    }
}

/// Builder for constructing Function instances
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    name: String,
    params: Vec<Param>,
    ret: Type,
    body: Option<Expr>,
}

impl FunctionBuilder {
    /// Start an extern function returning `ret`
    pub fn new(name: &str, ret: Type) -> Self {
        FunctionBuilder {
            name: name.to_string(),
            params: Vec::new(),
            ret,
            body: None,
        }
    }

    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
        });
        self
    }

    pub fn body(mut self, body: Expr) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Function {
        Function {
            name: self.name,
            params: self.params,
            ret: self.ret,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_builder_multi_head() {
        let rule = RuleBuilder::new()
            .head_vars("A", ["x"])
            .head_vars("B", ["x"])
            .matches("C", ["x"])
            .build();
        assert_eq!(rule.heads.len(), 2);
        assert_eq!(rule.to_string(), "A(x), B(x) :- C(x).");
    }

    #[test]
    fn test_rule_builder_aggregate() {
        let rule = RuleBuilder::new()
            .head_vars("M", ["k", "c"])
            .matches("S", ["k", "v"])
            .aggregate("c", Expr::vars(["k"]), "group_max", Expr::var("v"))
            .build();
        assert_eq!(
            rule.body[1].to_string(),
            "var c = Aggregate((k), group_max(v))"
        );
    }

    #[test]
    fn test_function_builder_extern() {
        let f = FunctionBuilder::new("group_max", Type::var("V"))
            .param("g", Type::named("Group", vec![Type::var("K"), Type::var("V")]))
            .build();
        assert!(f.body.is_none());
        assert_eq!(
            f.to_string(),
            "extern function group_max(g: Group<'K, 'V>): 'V"
        );
    }
}
