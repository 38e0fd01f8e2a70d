use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// One problem found with a column of a loaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIssue {
    pub column: String,
    pub problem: String,
}

impl ColumnIssue {
    pub fn new(column: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            problem: problem.into(),
        }
    }
}

impl fmt::Display for ColumnIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.column, self.problem)
    }
}

/// The categorical dimensions that must never be left empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDimension {
    Model,
    Status,
}

impl fmt::Display for SelectionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionDimension::Model => write!(f, "transformer model"),
            SelectionDimension::Status => write!(f, "approval status"),
        }
    }
}

/// Reasons a [`FilterSpec`](crate::data::filter::FilterSpec) is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("select a complete period (start and end date); got {endpoints} endpoint(s)")]
    IncompleteRange { endpoints: usize },
    #[error("select at least one {0}")]
    EmptySelection(SelectionDimension),
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no test records loaded")]
    EmptyTable,
    #[error("schema violation: {}", join_issues(.0))]
    SchemaViolation(Vec<ColumnIssue>),
    #[error("duplicate transformer id '{0}'")]
    DuplicateId(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

fn join_issues(issues: &[ColumnIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_lists_every_column() {
        let err = DashboardError::SchemaViolation(vec![
            ColumnIssue::new("model", "missing required column"),
            ColumnIssue::new("test_date", "missing required column"),
        ]);
        let text = err.to_string();
        assert!(text.contains("'model'"));
        assert!(text.contains("'test_date'"));
    }

    #[test]
    fn filter_errors_read_as_user_messages() {
        let err = FilterError::EmptySelection(SelectionDimension::Status);
        assert_eq!(err.to_string(), "select at least one approval status");
        let err = FilterError::IncompleteRange { endpoints: 1 };
        assert!(err.to_string().contains("1 endpoint"));
    }
}
