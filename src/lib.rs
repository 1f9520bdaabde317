//! # Dataflow Inspect
//!
//! Debug instrumentation for incremental Datalog rules. The pass rewrites a
//! checked program so that, once compiled to dataflow operators, every rule
//! emits trace events describing how its intermediate records were derived.
//! Program-visible bindings and results are unchanged.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Checked Program (rules + function table)
//!     ↓
//! [Literal Binding]          → every positive match bound to __<rel><idx>
//!     ↓
//! [Aggregate Provenance]     → aggregates call __debug_<f>, result restored
//!     ↓
//! [Hook Placement]           → Inspect terms after observable steps
//!     ↓
//! Instrumented rules         → code generator
//!
//! [Wrapper Synthesis]        → __debug_<f> added to the function table
//! ```
//!
//! ## Runtime Contract
//!
//! Instrumented rules call three runtime functions, provided by the
//! debugger runtime:
//!
//! ```text
//! debug_event(op_id: (u32, u32, u32), weight, timestamp, input, output)
//! debug_event_join(op_id: (u32, u32, u32), weight, timestamp, input1, input2, output)
//! debug_split_group(g: Group<K, (I, V)>) -> (Vec<I>, Group<K, V>)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use dataflow_inspect::ast::builders::RuleBuilder;
//! use dataflow_inspect::ast::{Expr, Program};
//! use dataflow_inspect::{BoundVariables, DebugInstrumenter};
//!
//! // T(c) :- S(a, b), a > 0, b > 0, U(b, c).
//! let rule = RuleBuilder::new()
//!     .head_vars("T", ["c"])
//!     .matches("S", ["a", "b"])
//!     .condition(Expr::binop(">", Expr::var("a"), Expr::int(0)))
//!     .condition(Expr::binop(">", Expr::var("b"), Expr::int(0)))
//!     .matches("U", ["b", "c"])
//!     .build();
//! let program = Program::new(vec![rule], Default::default());
//!
//! let mut instrumenter = DebugInstrumenter::new(BoundVariables);
//! let instrumented = instrumenter.instrument_program(&program)?;
//!
//! // one hook after the condition run, one after the join
//! assert_eq!(instrumenter.stats().inspects_inserted, 2);
//! # Ok::<(), dataflow_inspect::InstrumentError>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ast` | Rules, terms, expressions, functions |
//! | `scope` | Records visible after a rule prefix |
//! | `literal_binding` | Names positively matched facts |
//! | `provenance` | Aggregates carry their input rows |
//! | `wrapper_synthesis` | `__debug_<f>` wrapper functions |
//! | `hook_placement` | Where `Inspect` terms go and what they report |
//! | `instrument` | Runs the stages over rules and programs |
//! | `config` | Runtime names and logging configuration |

pub mod ast;
pub mod config;
pub mod error;
pub mod hook_placement;
pub mod instrument;
pub mod literal_binding;
pub mod names;
pub mod provenance;
pub mod scope;
pub mod wrapper_synthesis;

// Re-export public types
pub use ast::{Expr, Function, FunctionTable, Head, Polarity, Program, Rule, Term, Type};
pub use config::{Config, InstrumentConfig};
pub use error::{InstrumentError, InstrumentResult};
pub use hook_placement::{HookKind, OperatorId};
pub use instrument::{DebugInstrumenter, InstrumentStats, OperatorEntry};
pub use scope::{BoundVariables, RecordScope};
