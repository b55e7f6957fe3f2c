//! IPv4 CIDR membership predicate and its rhai host bindings.
//!
//! [`builtins::cidr`] holds the predicate. [`engine`] registers it as
//! `example::ip_belongs_to_network` for expressions, and [`expr_rule`] shows a
//! host using it from stored, named expressions.

use serde::Serialize;
use std::fmt::Debug;

pub mod builtins;
pub mod engine;
pub mod error;
pub mod expr_rule;

pub use builtins::cidr::ip_belongs_to_network;
pub use error::{ErrorKind, ParseError, RuleError, ValidationError};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Name of the first rule that evaluated to `true`, `None` when none did.
    pub rule: Option<String>,
}

/// The ruleset trait.
pub trait Ruleset: Send + Sync + Debug {
    /// - finds the first rule an address satisfies.
    ///
    /// It must be safe for concurrent use by multiple callers.
    fn matches(&self, ip: &str) -> Result<MatchResult, RuleError>;
}
