//! Collected warnings and errors for validation and contingency screening.
//!
//! Operations that can partially succeed (network validation, line contingency
//! screening) record what they skipped here instead of failing the whole batch.
//!
//! # Example
//!
//! ```
//! use opfkit_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("contingency", "bridge line excluded", "branch 7");
//! diag.add_error("validation", "no reference bus");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert!(diag.has_errors());
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Operation continued without the offending element
    Warning,
    /// Element or operation could not be handled
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g. "validation", "reference", "contingency")
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g. "bus 4", "branch 1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    /// Append every issue from `other`, preserving order.
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Iterate over issues of one category
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// One-line summary, e.g. "2 warnings, 0 errors"
    pub fn summary(&self) -> String {
        format!(
            "{} warnings, {} errors",
            self.warning_count(),
            self.error_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_severity() {
        let mut diag = Diagnostics::new();
        diag.add_warning("contingency", "bridge line excluded");
        diag.add_warning("validation", "no loads");
        diag.add_error("reference", "unknown bus");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
        assert_eq!(diag.summary(), "2 warnings, 1 errors");
    }

    #[test]
    fn test_display_includes_entity() {
        let issue = DiagnosticIssue::new(Severity::Warning, "contingency", "bridge line")
            .with_entity("branch 6");
        assert_eq!(issue.to_string(), "[warning:contingency] bridge line (branch 6)");
    }

    #[test]
    fn test_merge_and_category_filter() {
        let mut a = Diagnostics::new();
        a.add_warning("validation", "first");
        let mut b = Diagnostics::new();
        b.add_warning_with_entity("contingency", "second", "branch 2");
        a.merge(b);

        assert_eq!(a.issues.len(), 2);
        let contingency: Vec<_> = a.in_category("contingency").collect();
        assert_eq!(contingency.len(), 1);
        assert_eq!(contingency[0].entity.as_deref(), Some("branch 2"));
    }

    #[test]
    fn test_empty_serializes_without_issues() {
        let diag = Diagnostics::new();
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(json, "{}");
        assert!(diag.is_empty());
    }
}
