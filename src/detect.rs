use std::collections::HashSet;

use regex::Regex;
use tracing::warn;

use crate::finding::{Finding, FindingKind, Severity};
use crate::indicators::{Indicator, IndicatorRules, StructuralFlags};

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

struct Hyperparameters {
    match_snippet_chars: usize,
    justification_max_count: usize,
    justification_max_density: f64,
    code_markers: &'static [&'static str],
}

static HP: Hyperparameters = Hyperparameters {
    match_snippet_chars: 30,
    justification_max_count: 3,
    justification_max_density: 0.02,
    code_markers: &["```", "class ", "def ", "function "],
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compile a rule pattern. A pattern that fails to compile disables its rule.
pub(crate) fn compile(src: &str) -> Option<Regex> {
    match Regex::new(src) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = src, error = %e, "Skipping rule with invalid pattern");
            None
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The text under analysis plus everything derived from it before detection.
#[derive(Debug)]
pub(crate) struct Document<'a> {
    pub raw: &'a str,
    pub lower: String,
    pub word_count: usize,
    pub has_code: bool,
    pub flags: StructuralFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    /// Only evaluated when the document contains code.
    CodeOnly,
}

impl Gate {
    fn open(self, doc: &Document<'_>) -> bool {
        match self {
            Gate::Always => true,
            Gate::CodeOnly => doc.has_code,
        }
    }
}

// ---------------------------------------------------------------------------
// Keyword detectors
// ---------------------------------------------------------------------------

/// Case-insensitive substring match; one finding per matched term.
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    kind: FindingKind,
    severity: Severity,
    terms: Vec<String>,
    fix: Option<String>,
}

impl KeywordDetector {
    fn detect(&self, doc: &Document<'_>) -> Vec<Finding> {
        self.terms
            .iter()
            .filter(|term| doc.lower.contains(term.as_str()))
            .map(|term| {
                Finding::new(self.kind, self.severity, format!("Contains \"{term}\""))
                    .with_fix(self.fix.as_deref())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Pattern detectors
// ---------------------------------------------------------------------------

/// Regex over the raw text; one finding per distinct match. The first capture
/// group (or the whole match) replaces `{match}` in the detail template.
#[derive(Debug, Clone)]
pub struct PatternDetector {
    kind: FindingKind,
    severity: Severity,
    pattern: Option<Regex>,
    detail: String,
    fix: Option<String>,
    gate: Gate,
}

impl PatternDetector {
    fn detect(&self, doc: &Document<'_>) -> Vec<Finding> {
        let Some(re) = &self.pattern else {
            return Vec::new();
        };
        if !self.gate.open(doc) {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for caps in re.captures_iter(doc.raw) {
            let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                continue;
            };
            if !seen.insert(m.as_str()) {
                continue;
            }
            let snippet = truncate_chars(m.as_str(), HP.match_snippet_chars);
            out.push(
                Finding::new(self.kind, self.severity, self.detail.replace("{match}", snippet))
                    .with_fix(self.fix.as_deref()),
            );
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Structural / absence detectors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Expectation {
    /// The structural indicator is present.
    Indicator(Indicator),
    /// At least one marker occurs in the lower-cased text.
    AnyMarker(Vec<String>),
    /// Initiation framing, if any, comes with continuation framing.
    ContinuationIfInitiated,
    /// Justification phrases stay under both the count and per-word limits.
    JustificationWithinLimits {
        pattern: Option<Regex>,
        max_count: usize,
        max_density: f64,
    },
}

impl Expectation {
    fn holds(&self, doc: &Document<'_>) -> bool {
        match self {
            Expectation::Indicator(indicator) => doc.flags.get(*indicator),
            Expectation::AnyMarker(markers) => markers.iter().any(|m| doc.lower.contains(m.as_str())),
            Expectation::ContinuationIfInitiated => !doc.flags.initiation_without_continuation(),
            Expectation::JustificationWithinLimits {
                pattern,
                max_count,
                max_density,
            } => {
                let Some(re) = pattern else {
                    return true;
                };
                if doc.word_count == 0 {
                    return true;
                }
                let count = re.find_iter(doc.raw).count();
                let density = count as f64 / doc.word_count as f64;
                count <= *max_count && density <= *max_density
            }
        }
    }
}

/// Emits a single finding when the expected element is absent.
#[derive(Debug, Clone)]
pub struct StructuralDetector {
    kind: FindingKind,
    severity: Severity,
    expect: Expectation,
    detail: String,
    fix: Option<String>,
    gate: Gate,
}

impl StructuralDetector {
    fn detect(&self, doc: &Document<'_>) -> Vec<Finding> {
        if !self.gate.open(doc) || self.expect.holds(doc) {
            return Vec::new();
        }
        vec![Finding::new(self.kind, self.severity, self.detail.clone()).with_fix(self.fix.as_deref())]
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Detector {
    Keyword(KeywordDetector),
    Pattern(PatternDetector),
    Structural(StructuralDetector),
}

impl Detector {
    pub fn keyword(kind: FindingKind, severity: Severity, terms: &[&str], fix: &str) -> Self {
        Detector::Keyword(KeywordDetector {
            kind,
            severity,
            terms: terms.iter().map(|t| t.to_lowercase()).collect(),
            fix: Some(fix.to_string()),
        })
    }

    pub fn pattern(
        kind: FindingKind,
        severity: Severity,
        pattern: &str,
        detail: &str,
        fix: &str,
    ) -> Self {
        Detector::Pattern(PatternDetector {
            kind,
            severity,
            pattern: compile(pattern),
            detail: detail.to_string(),
            fix: Some(fix.to_string()),
            gate: Gate::Always,
        })
    }

    pub fn absent(
        kind: FindingKind,
        severity: Severity,
        expect: Expectation,
        detail: &str,
        fix: &str,
    ) -> Self {
        Detector::Structural(StructuralDetector {
            kind,
            severity,
            expect,
            detail: detail.to_string(),
            fix: Some(fix.to_string()),
            gate: Gate::Always,
        })
    }

    /// Restrict the detector to documents containing code.
    pub fn code_only(self) -> Self {
        match self {
            Detector::Pattern(d) => Detector::Pattern(PatternDetector {
                gate: Gate::CodeOnly,
                ..d
            }),
            Detector::Structural(d) => Detector::Structural(StructuralDetector {
                gate: Gate::CodeOnly,
                ..d
            }),
            other => other,
        }
    }

    pub fn kind(&self) -> FindingKind {
        match self {
            Detector::Keyword(d) => d.kind,
            Detector::Pattern(d) => d.kind,
            Detector::Structural(d) => d.kind,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Detector::Keyword(d) => d.severity,
            Detector::Pattern(d) => d.severity,
            Detector::Structural(d) => d.severity,
        }
    }

    fn detect(&self, doc: &Document<'_>) -> Vec<Finding> {
        match self {
            Detector::Keyword(d) => d.detect(doc),
            Detector::Pattern(d) => d.detect(doc),
            Detector::Structural(d) => d.detect(doc),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Ordered, immutable rule set. Build once and share by reference.
#[derive(Debug, Clone)]
pub struct Registry {
    indicators: IndicatorRules,
    code_markers: Vec<String>,
    detectors: Vec<Detector>,
}

impl Registry {
    pub fn new(indicators: IndicatorRules) -> Self {
        Self {
            indicators,
            code_markers: HP.code_markers.iter().map(|m| m.to_string()).collect(),
            detectors: Vec::new(),
        }
    }

    pub fn with(mut self, detector: Detector) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub(crate) fn indicators(&self) -> &IndicatorRules {
        &self.indicators
    }

    /// Code markers are matched against the raw text, case-sensitively.
    pub(crate) fn has_code(&self, raw: &str) -> bool {
        self.code_markers.iter().any(|m| raw.contains(m.as_str()))
    }

    /// Concatenate every detector's output in declaration order.
    pub(crate) fn run(&self, doc: &Document<'_>) -> Vec<Finding> {
        self.detectors.iter().flat_map(|d| d.detect(doc)).collect()
    }

    pub fn standard() -> Self {
        use FindingKind as K;
        use Severity as S;

        let justification = compile(
            r"(?i)authorized|legitimate|legal|approved|permitted|compliance|for (my|our|the) (company|team|organization)",
        );

        Registry::new(IndicatorRules::standard())
            // 1-3. Flagged vocabulary
            .with(Detector::keyword(
                K::KeywordCritical,
                S::Critical,
                &[
                    "ransomware",
                    "malware",
                    "keylogger",
                    "backdoor",
                    "trojan",
                    "rootkit",
                    "botnet",
                    "c2 server",
                    "command and control",
                    "rat ",
                    "remote access trojan",
                ],
                "Replace the flagged term with a precise description",
            ))
            .with(Detector::keyword(
                K::KeywordHigh,
                S::High,
                &[
                    "exploit",
                    "hack ",
                    "hacking",
                    "victim",
                    "payload",
                    "exfil",
                    "pwn",
                    "reverse shell",
                    "meterpreter",
                ],
                "Replace the flagged term with neutral wording",
            ))
            .with(Detector::keyword(
                K::KeywordMedium,
                S::Medium,
                &["inject", "bypass", "evade", "brute force", "crack", "dump", "sniff"],
                "Consider plainer wording",
            ))
            // 4. Identifier leaks inside code
            .with(
                Detector::pattern(
                    K::CodeClassLeak,
                    S::Critical,
                    r"(?i)class\s+(\w*(?:ransomware|malware|hack|exploit|attack|keylog|payload|victim|backdoor)\w*)",
                    "Suspicious class: \"{match}...\"",
                    "Rename identifiers descriptively",
                )
                .code_only(),
            )
            .with(
                Detector::pattern(
                    K::CodeFunctionLeak,
                    S::Critical,
                    r"(?i)def\s+(\w*(?:ransomware|malware|hack|exploit|attack|inject|victim|payload)\w*)",
                    "Suspicious function: \"{match}...\"",
                    "Rename identifiers descriptively",
                )
                .code_only(),
            )
            .with(
                Detector::pattern(
                    K::CodeStringLeak,
                    S::Critical,
                    r#"(?i)["']([^"']*(?:ransom|victim|payload|exploit|malicious|attack)[^"']*)["']"#,
                    "Suspicious string: \"{match}...\"",
                    "Rename identifiers descriptively",
                )
                .code_only(),
            )
            // 5. Code hygiene
            .with(
                Detector::absent(
                    K::NoLogging,
                    S::Low,
                    Expectation::AnyMarker(vec!["logging".into(), "logger".into()]),
                    "Code lacks logging",
                    "Add logging",
                )
                .code_only(),
            )
            .with(
                Detector::absent(
                    K::NoDocstrings,
                    S::Low,
                    Expectation::AnyMarker(vec!["\"\"\"".into(), "'''".into()]),
                    "Code lacks docstrings",
                    "Add docstrings",
                )
                .code_only(),
            )
            .with(
                Detector::absent(
                    K::NoTyping,
                    S::Low,
                    Expectation::AnyMarker(vec!["-> ".into(), ": str".into(), ": int".into()]),
                    "Code lacks type hints",
                    "Add type annotations",
                )
                .code_only(),
            )
            // 6. Missing structure
            .with(Detector::absent(
                K::NoRole,
                S::Medium,
                Expectation::Indicator(Indicator::Role),
                "No professional role",
                "State the author's role",
            ))
            .with(Detector::absent(
                K::NoCredentials,
                S::Medium,
                Expectation::Indicator(Indicator::Credentials),
                "No credentials",
                "State relevant qualifications",
            ))
            .with(Detector::absent(
                K::NoAuthorization,
                S::Medium,
                Expectation::Indicator(Indicator::Authorization),
                "No authorization framing",
                "Reference the authorization covering the work",
            ))
            .with(Detector::absent(
                K::NoAnchor,
                S::Medium,
                Expectation::Indicator(Indicator::Anchor),
                "No partial work anchor",
                "Include the existing work the request builds on",
            ))
            // 7. Framing
            .with(Detector::absent(
                K::InitiationFraming,
                S::High,
                Expectation::ContinuationIfInitiated,
                "Asks for creation, not completion",
                "Frame the request around existing work",
            ))
            // 8. Instruction-override phrasing
            .with(Detector::pattern(
                K::ObviousPattern,
                S::Critical,
                r"(?i)ignore (previous|your|all) (instructions|rules)",
                "Obvious injection",
                "Remove the instruction-override phrasing",
            ))
            .with(Detector::pattern(
                K::ObviousPattern,
                S::Critical,
                r"(?i)you are (now )?DAN",
                "Known DAN pattern",
                "Remove the instruction-override phrasing",
            ))
            .with(Detector::pattern(
                K::ObviousPattern,
                S::Critical,
                r"(?i)pretend you (have no|don't have)",
                "Pretend bypass",
                "Remove the instruction-override phrasing",
            ))
            .with(Detector::pattern(
                K::ObviousPattern,
                S::Critical,
                r"(?i)in developer mode",
                "Developer mode pattern",
                "Remove the instruction-override phrasing",
            ))
            // 9. Over-justification
            .with(Detector::absent(
                K::OverJustified,
                S::Medium,
                Expectation::JustificationWithinLimits {
                    pattern: justification,
                    max_count: HP.justification_max_count,
                    max_density: HP.justification_max_density,
                },
                "Too many justification phrases - looks defensive",
                "Reduce justification density",
            ))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
