//! Ordered deterministic predicate engine (§4.2). Evaluates enabled rules in
//! ascending `priority` order and mutates a message's classification fields.

pub mod builtins;
pub mod engine;

pub use engine::{ConditionResult, EvaluationOutcome, RuleTestReport, RulesEngine, test_rule, validate_rule};
