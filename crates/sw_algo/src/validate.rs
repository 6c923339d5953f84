//! crates/sw_algo/src/validate.rs
//! Issue/report model shared by allocation validation.
//! Deterministic outputs: issues are sorted by (code, where, message).

use sw_core::ids::IndicatorId;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "id", rename_all = "snake_case"))]
pub enum EntityRef {
    Root,
    Indicator(IndicatorId),
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(rename = "where"))]
    pub where_: EntityRef,
}

/// pass = (no Error); ordering of issues is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues_stably(&mut issues);
        ValidationReport {
            pass: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }
}

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.code
            .cmp(b.code)
            .then_with(|| cmp_where(&a.where_, &b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}

fn cmp_where(a: &EntityRef, b: &EntityRef) -> core::cmp::Ordering {
    use core::cmp::Ordering::*;
    use EntityRef::*;
    match (a, b) {
        (Root, Root) => Equal,
        (Root, _) => Less,
        (_, Root) => Greater,
        (Indicator(x), Indicator(y)) => x.cmp(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(sev: Severity, code: &'static str, w: EntityRef) -> ValidationIssue {
        ValidationIssue { severity: sev, code, message: String::new(), where_: w }
    }

    #[test]
    fn warnings_only_pass() {
        let r = ValidationReport::from_issues(vec![issue(Severity::Warning, "W", EntityRef::Root)]);
        assert!(r.pass);
        assert_eq!(r.warnings().count(), 1);
    }

    #[test]
    fn sorted_by_code_then_where() {
        let r = ValidationReport::from_issues(vec![
            issue(Severity::Error, "B", EntityRef::Root),
            issue(Severity::Error, "A", EntityRef::Indicator("i2".parse().unwrap())),
            issue(Severity::Error, "A", EntityRef::Root),
            issue(Severity::Error, "A", EntityRef::Indicator("i1".parse().unwrap())),
        ]);
        assert!(!r.pass);
        let order: Vec<_> = r.issues.iter().map(|i| (i.code, i.where_.clone())).collect();
        assert_eq!(order[0], ("A", EntityRef::Root));
        assert_eq!(order[1], ("A", EntityRef::Indicator("i1".parse().unwrap())));
        assert_eq!(order[2], ("A", EntityRef::Indicator("i2".parse().unwrap())));
        assert_eq!(order[3].0, "B");
    }
}
