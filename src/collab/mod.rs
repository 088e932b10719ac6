//! Boundary collaborators: a typed registry with initialize-once gating
//! and a rule-based number formatter

pub mod registry;
pub mod rules;

pub use registry::Registry;
pub use rules::RuleFormatter;
