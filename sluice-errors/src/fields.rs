use std::collections::BTreeMap;

use crate::traits::Field;

/// Text of the statement that was in progress when the failure happened.
pub struct StatementText;

/// Diagnostic attributes copied from the statement context.
pub struct Attributes;

/// Isolation level a failed isolation change was asked for.
pub struct IsolationLevel;

impl Field for StatementText {
    const NAME: &'static str = "statement_text";
    type Value = String;
}

impl Field for Attributes {
    const NAME: &'static str = "attributes";
    type Value = BTreeMap<String, String>;
}

impl Field for IsolationLevel {
    const NAME: &'static str = "isolation_level";
    type Value = i32;
}
