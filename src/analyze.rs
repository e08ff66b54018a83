use std::collections::BTreeSet;

use serde::Serialize;

use crate::detect::{Document, Registry};
use crate::error::AnalyzeError;
use crate::finding::{Finding, FindingKind, Severity};
use crate::indicators::StructuralFlags;
use crate::score::{ScoreWeights, Scores};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub word_count: usize,
    pub has_code: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub flags: StructuralFlags,
    pub scores: Scores,
    pub stats: Stats,
}

impl AnalysisResult {
    /// Distinct finding kinds, ordered for stable diffs.
    pub fn kinds(&self) -> BTreeSet<FindingKind> {
        self.findings.iter().map(|f| f.kind).collect()
    }

    pub fn count_at(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Applies a [`Registry`] and scores the result. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    registry: Registry,
    weights: ScoreWeights,
}

impl Analyzer {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalyzeError> {
        if text.trim().is_empty() {
            return Err(AnalyzeError::InvalidInput("document is empty".to_string()));
        }

        let lower = text.to_lowercase();
        let has_code = self.registry.has_code(text);
        let flags = self.registry.indicators().evaluate(&lower, has_code);
        let doc = Document {
            raw: text,
            word_count: text.split_whitespace().count(),
            lower,
            has_code,
            flags,
        };

        let findings = self.registry.run(&doc);
        let scores = Scores::compute(&findings, &flags, &self.weights);

        Ok(AnalysisResult {
            findings,
            flags,
            scores,
            stats: Stats {
                word_count: doc.word_count,
                has_code,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_input() {
        let analyzer = Analyzer::default();
        assert!(matches!(analyzer.analyze(""), Err(AnalyzeError::InvalidInput(_))));
        assert!(matches!(analyzer.analyze("  \n\t"), Err(AnalyzeError::InvalidInput(_))));
    }

    #[test]
    fn counts_whitespace_tokens() {
        let result = Analyzer::default().analyze("  one two\nthree\tfour ").unwrap();
        assert_eq!(result.stats.word_count, 4);
        assert!(!result.stats.has_code);
    }

    #[test]
    fn detects_code_markers() {
        let result = Analyzer::default()
            .analyze("Here it is:\n```\ndef run() -> None:\n    pass\n```")
            .unwrap();
        assert!(result.stats.has_code);
        assert!(result.flags.has_anchor);
    }

    #[test]
    fn kinds_deduplicates() {
        let result = Analyzer::default()
            .analyze("malware and a rootkit in one sentence")
            .unwrap();
        assert_eq!(result.count_at(Severity::Critical), 2);
        let kinds = result.kinds();
        assert!(kinds.contains(&FindingKind::KeywordCritical));
        assert_eq!(
            kinds.iter().filter(|k| **k == FindingKind::KeywordCritical).count(),
            1
        );
    }
}
