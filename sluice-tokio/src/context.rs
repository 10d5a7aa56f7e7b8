use std::collections::BTreeMap;

/// Diagnostic metadata for the statement in progress.
///
/// Created by the pipeline for each statement and handed to the
/// [`ExceptionPolicy`](crate::ExceptionPolicy) by reference when something
/// fails. The policy may read it but never keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementContext {
    sql: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl StatementContext {
    pub(crate) fn new(sql: &str, attributes: &BTreeMap<String, String>) -> StatementContext {
        StatementContext {
            sql: Some(sql.to_owned()),
            attributes: attributes.clone(),
        }
    }

    /// Context with no statement, for failures outside statement execution.
    pub fn empty() -> StatementContext {
        StatementContext::default()
    }

    /// Set statement text. Mostly useful for constructing contexts in tests
    /// of custom policies.
    pub fn with_sql(mut self, sql: impl Into<String>) -> StatementContext {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> StatementContext {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Statement text as it was handed to the driver.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| &v[..])
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
