//! # Rule AST
//!
//! Typed representation of the incremental-Datalog rules handled by the
//! instrumentation pass. Parsing and type checking happen elsewhere; this
//! module only models what the pass inspects and constructs.
//!
//! ## Builders
//!
//! For programmatic construction of rules and functions, see the
//! [`builders`] module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod builders;

/// Program-wide function table, keyed by function name.
///
/// Ordered so that rendering and serialization are stable between runs.
pub type FunctionTable = BTreeMap<String, Function>;

// ============================================================================
// Expressions
// ============================================================================

/// Literal constants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    /// Fixed-width unsigned constant, used for operator identifiers
    U32(u32),
    Str(String),
}

/// Expression tree.
///
/// The same type is used in pattern position (the value captured by a
/// relation match, the left side of an assignment) and in value position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Variable reference (binds the variable when used in a pattern)
    Var(String),
    /// Fresh variable declaration: `var x`
    VarDecl(String),
    /// Named binding of a whole pattern: `name @ pattern`
    Bind { name: String, pattern: Box<Expr> },
    Tuple(Vec<Expr>),
    /// Tuple projection: `expr.index`
    Proj { expr: Box<Expr>, index: usize },
    /// Function application: `func(args)`
    Apply { func: String, args: Vec<Expr> },
    /// Infix operator: `lhs op rhs`
    BinOp {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Lit(Literal),
    /// Sequencing: `{e1; e2; ...}`, evaluates to the last expression
    Seq(Vec<Expr>),
    /// Assignment: `lhs = rhs`
    Assign { lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn var_decl(name: impl Into<String>) -> Self {
        Expr::VarDecl(name.into())
    }

    pub fn bind(name: impl Into<String>, pattern: Expr) -> Self {
        Expr::Bind {
            name: name.into(),
            pattern: Box::new(pattern),
        }
    }

    pub fn tuple(items: Vec<Expr>) -> Self {
        Expr::Tuple(items)
    }

    /// Tuple of variable references
    pub fn vars<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::Tuple(names.into_iter().map(Expr::var).collect())
    }

    pub fn proj(expr: Expr, index: usize) -> Self {
        Expr::Proj {
            expr: Box::new(expr),
            index,
        }
    }

    pub fn apply(func: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Apply {
            func: func.into(),
            args,
        }
    }

    pub fn binop(op: impl Into<String>, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinOp {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Lit(Literal::Int(value))
    }

    pub fn u32(value: u32) -> Self {
        Expr::Lit(Literal::U32(value))
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Expr::Assign {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Name of the binding if this is a named binding
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Expr::Bind { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Every variable name mentioned by this expression, in order of first
    /// occurrence. Includes declarations and binding names.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expr::Var(name) | Expr::VarDecl(name) => push_unique(out, name),
            Expr::Bind { name, pattern } => {
                push_unique(out, name);
                pattern.collect_variables(out);
            }
            Expr::Tuple(items) | Expr::Seq(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Expr::Apply { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
            Expr::Proj { expr, .. } => expr.collect_variables(out),
            Expr::BinOp { lhs, rhs, .. } | Expr::Assign { lhs, rhs } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::Lit(_) => {}
        }
    }

    /// Variables introduced when this expression is used as a pattern.
    ///
    /// Only the left side of an assignment binds; any other expression
    /// evaluated as a condition binds nothing.
    pub fn declared_variables(&self) -> Vec<String> {
        match self {
            Expr::Assign { lhs, .. } => lhs.variables(),
            Expr::Seq(items) => {
                let mut out = Vec::new();
                for item in items {
                    for name in item.declared_variables() {
                        push_unique(&mut out, &name);
                    }
                }
                out
            }
            _ => Vec::new(),
        }
    }
}

/// Append `name` unless already present
pub(crate) fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|n| n == name) {
        out.push(name.to_string());
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::U32(u) => write!(f, "{u}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::VarDecl(name) => write!(f, "var {name}"),
            Expr::Bind { name, pattern } => write!(f, "{name} @ {pattern}"),
            Expr::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items, ", ")?;
                f.write_str(")")
            }
            Expr::Proj { expr, index } => write!(f, "{expr}.{index}"),
            Expr::Apply { func, args } => {
                write!(f, "{func}(")?;
                write_list(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::BinOp { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expr::Lit(lit) => write!(f, "{lit}"),
            Expr::Seq(items) => {
                f.write_str("{")?;
                write_list(f, items, "; ")?;
                f.write_str("}")
            }
            Expr::Assign { lhs, rhs } => write!(f, "{lhs} = {rhs}"),
        }
    }
}

// ============================================================================
// Terms and rules
// ============================================================================

/// Polarity of a relation match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

/// One element of a rule body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Relation lookup (join when positive, antijoin when negative)
    Match {
        polarity: Polarity,
        relation: String,
        value: Expr,
    },
    /// Filter or assignment with no relation lookup
    Condition(Expr),
    /// `var result = Aggregate(group_by, function(input))`
    Aggregate {
        result: String,
        group_by: Expr,
        function: String,
        input: Expr,
    },
    /// `var var = FlatMap(expr)`
    FlatMap { var: String, expr: Expr },
    /// Side-effecting expression evaluated for its effect only
    Inspect(Expr),
}

impl Term {
    pub fn is_condition(&self) -> bool {
        matches!(self, Term::Condition(_))
    }

    pub fn is_positive_match(&self) -> bool {
        matches!(
            self,
            Term::Match {
                polarity: Polarity::Positive,
                ..
            }
        )
    }

    /// Name the matched fact is bound to, for positive matches whose value
    /// is a named binding
    pub fn bound_fact(&self) -> Option<&str> {
        match self {
            Term::Match {
                polarity: Polarity::Positive,
                value,
                ..
            } => value.binding_name(),
            _ => None,
        }
    }

    /// Variables bound by evaluating this term
    pub fn bound_variables(&self) -> Vec<String> {
        match self {
            Term::Match {
                polarity: Polarity::Positive,
                value,
                ..
            } => value.variables(),
            Term::Match {
                polarity: Polarity::Negative,
                ..
            }
            | Term::Inspect(_) => Vec::new(),
            Term::Condition(expr) => expr.declared_variables(),
            Term::Aggregate { result, .. } => vec![result.clone()],
            Term::FlatMap { var, .. } => vec![var.clone()],
        }
    }

    /// Variables referenced by this term, bound or read
    pub fn referenced_variables(&self) -> Vec<String> {
        match self {
            Term::Match { value, .. } => value.variables(),
            Term::Condition(expr) | Term::Inspect(expr) => expr.variables(),
            Term::Aggregate {
                result,
                group_by,
                input,
                ..
            } => {
                let mut vars = group_by.variables();
                for v in input.variables() {
                    push_unique(&mut vars, &v);
                }
                push_unique(&mut vars, result);
                vars
            }
            Term::FlatMap { var, expr } => {
                let mut vars = expr.variables();
                push_unique(&mut vars, var);
                vars
            }
        }
    }
}

fn write_atom(f: &mut fmt::Formatter<'_>, relation: &str, value: &Expr) -> fmt::Result {
    match value {
        Expr::Tuple(_) => write!(f, "{relation}{value}"),
        other => write!(f, "{relation}({other})"),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Match {
                polarity,
                relation,
                value,
            } => {
                if *polarity == Polarity::Negative {
                    f.write_str("not ")?;
                }
                match value {
                    Expr::Bind { name, pattern } => {
                        write!(f, "{name} in ")?;
                        write_atom(f, relation, pattern)
                    }
                    other => write_atom(f, relation, other),
                }
            }
            Term::Condition(expr) => write!(f, "{expr}"),
            Term::Aggregate {
                result,
                group_by,
                function,
                input,
            } => write!(f, "var {result} = Aggregate({group_by}, {function}({input}))"),
            Term::FlatMap { var, expr } => write!(f, "var {var} = FlatMap({expr})"),
            Term::Inspect(expr) => write!(f, "Inspect {expr}"),
        }
    }
}

/// Atom produced when a rule body matches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Head {
    pub relation: String,
    pub value: Expr,
}

impl Head {
    pub fn new(relation: impl Into<String>, value: Expr) -> Self {
        Head {
            relation: relation.into(),
            value,
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_atom(f, &self.relation, &self.value)
    }
}

/// Rule: one or more heads derived from an ordered body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub heads: Vec<Head>,
    pub body: Vec<Term>,
}

impl Rule {
    pub fn new(heads: Vec<Head>, body: Vec<Term>) -> Self {
        Rule { heads, body }
    }

    /// Same heads, different body
    pub fn with_body(&self, body: Vec<Term>) -> Self {
        Rule {
            heads: self.heads.clone(),
            body,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, head) in self.heads.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{head}")?;
        }
        if !self.body.is_empty() {
            f.write_str(" :- ")?;
            for (i, term) in self.body.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{term}")?;
            }
        }
        f.write_str(".")
    }
}

// ============================================================================
// Types and functions
// ============================================================================

/// Type expressions, as far as the pass needs them
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Named type with optional arguments: `Group<K, V>`, `bool`
    Named { name: String, args: Vec<Type> },
    Tuple(Vec<Type>),
    /// Type variable: `'K`
    Var(String),
}

impl Type {
    pub fn named(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Named {
            name: name.into(),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Type::Var(name.into())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Type::Var(name) => write!(f, "'{name}"),
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// Function declaration; extern functions have no body
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    #[serde(default)]
    pub body: Option<Expr>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_none() {
            f.write_str("extern ")?;
        }
        write!(f, "function {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, "): {}", self.ret)?;
        match &self.body {
            Some(body) => write!(f, " = {body}"),
            None => Ok(()),
        }
    }
}

/// A checked program: rules referenced by position, plus the function table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub functions: FunctionTable,
}

impl Program {
    pub fn new(rules: Vec<Rule>, functions: FunctionTable) -> Self {
        Program { rules, functions }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.insert(function.name.clone(), function);
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for function in self.functions.values() {
            writeln!(f, "{function}")?;
        }
        if !self.functions.is_empty() && !self.rules.is_empty() {
            writeln!(f)?;
        }
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_display_with_binding() {
        let term = Term::Match {
            polarity: Polarity::Positive,
            relation: "S".to_string(),
            value: Expr::bind("__s0", Expr::vars(["a", "b"])),
        };
        assert_eq!(term.to_string(), "__s0 in S(a, b)");
        assert_eq!(term.bound_fact(), Some("__s0"));
    }

    #[test]
    fn test_negative_match_binds_nothing() {
        let term = Term::Match {
            polarity: Polarity::Negative,
            relation: "S".to_string(),
            value: Expr::vars(["a"]),
        };
        assert_eq!(term.to_string(), "not S(a)");
        assert!(term.bound_variables().is_empty());
        assert_eq!(term.bound_fact(), None);
    }

    #[test]
    fn test_condition_binds_only_assignments() {
        let filter = Term::Condition(Expr::binop(">", Expr::var("a"), Expr::int(0)));
        assert!(filter.bound_variables().is_empty());
        assert_eq!(filter.to_string(), "a > 0");

        let assign = Term::Condition(Expr::assign(
            Expr::var_decl("c"),
            Expr::proj(Expr::var("__inputs_c"), 1),
        ));
        assert_eq!(assign.bound_variables(), vec!["c".to_string()]);
        assert_eq!(assign.to_string(), "var c = __inputs_c.1");
    }

    #[test]
    fn test_variables_in_first_occurrence_order() {
        let expr = Expr::tuple(vec![
            Expr::var("b"),
            Expr::apply("f", vec![Expr::var("a"), Expr::var("b")]),
        ]);
        assert_eq!(expr.variables(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::new(
            vec![Head::new("R", Expr::vars(["a", "b"]))],
            vec![Term::Match {
                polarity: Polarity::Positive,
                relation: "S".to_string(),
                value: Expr::vars(["a", "b"]),
            }],
        );
        assert_eq!(rule.to_string(), "R(a, b) :- S(a, b).");
    }

    #[test]
    fn test_type_display() {
        let ty = Type::named(
            "Group",
            vec![
                Type::var("K"),
                Type::Tuple(vec![Type::var("I"), Type::var("V")]),
            ],
        );
        assert_eq!(ty.to_string(), "Group<'K, ('I, 'V)>");
    }

    #[test]
    fn test_program_json_roundtrip() {
        let rule = Rule::new(
            vec![Head::new("R", Expr::vars(["a"]))],
            vec![Term::Condition(Expr::binop("==", Expr::var("a"), Expr::int(1)))],
        );
        let program = Program::new(vec![rule], FunctionTable::new());
        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, program);
    }
}
