use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Weakness level. Declaration order gives `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Finding kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    KeywordCritical,
    KeywordHigh,
    KeywordMedium,
    CodeClassLeak,
    CodeFunctionLeak,
    CodeStringLeak,
    NoLogging,
    NoDocstrings,
    NoTyping,
    NoRole,
    NoCredentials,
    NoAuthorization,
    NoAnchor,
    InitiationFraming,
    ObviousPattern,
    OverJustified,
}

impl FindingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingKind::KeywordCritical => "keyword_critical",
            FindingKind::KeywordHigh => "keyword_high",
            FindingKind::KeywordMedium => "keyword_medium",
            FindingKind::CodeClassLeak => "code_class_leak",
            FindingKind::CodeFunctionLeak => "code_function_leak",
            FindingKind::CodeStringLeak => "code_string_leak",
            FindingKind::NoLogging => "no_logging",
            FindingKind::NoDocstrings => "no_docstrings",
            FindingKind::NoTyping => "no_typing",
            FindingKind::NoRole => "no_role",
            FindingKind::NoCredentials => "no_credentials",
            FindingKind::NoAuthorization => "no_authorization",
            FindingKind::NoAnchor => "no_anchor",
            FindingKind::InitiationFraming => "initiation_framing",
            FindingKind::ObviousPattern => "obvious_pattern",
            FindingKind::OverJustified => "over_justified",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub detail: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            severity,
            suggested_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: Option<&str>) -> Self {
        self.suggested_fix = fix.map(str::to_string);
        self
    }
}
