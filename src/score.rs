use serde::Serialize;

use crate::finding::{Finding, Severity};
use crate::indicators::StructuralFlags;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Scoring constants. The genuineness magnitudes are empirical, so every value
/// can be overridden; `Default` reproduces the stock table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub critical_penalty: f64,
    pub high_penalty: f64,
    pub medium_penalty: f64,
    pub low_penalty: f64,
    pub genuineness_baseline: f64,
    pub role_with_credentials_bonus: f64,
    pub authorization_bonus: f64,
    pub anchor_bonus: f64,
    pub any_critical_penalty: f64,
    pub any_high_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            critical_penalty: 0.20,
            high_penalty: 0.12,
            medium_penalty: 0.06,
            low_penalty: 0.02,
            genuineness_baseline: 0.5,
            role_with_credentials_bonus: 0.15,
            authorization_bonus: 0.10,
            anchor_bonus: 0.10,
            any_critical_penalty: 0.30,
            any_high_penalty: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn penalty(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical_penalty,
            Severity::High => self.high_penalty,
            Severity::Medium => self.medium_penalty,
            Severity::Low => self.low_penalty,
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub overall: f64,
    pub genuineness: f64,
}

impl Scores {
    /// The two scores are independent signals and are never combined.
    pub fn compute(findings: &[Finding], flags: &StructuralFlags, weights: &ScoreWeights) -> Self {
        Self {
            overall: overall(findings, weights),
            genuineness: genuineness(findings, flags, weights),
        }
    }
}

/// NaN counts as zero.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    round2(value.clamp(0.0, 1.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn overall(findings: &[Finding], weights: &ScoreWeights) -> f64 {
    let penalty: f64 = findings.iter().map(|f| weights.penalty(f.severity)).sum();
    clamp_unit(1.0 - penalty)
}

pub fn genuineness(findings: &[Finding], flags: &StructuralFlags, weights: &ScoreWeights) -> f64 {
    let mut score = weights.genuineness_baseline;
    if flags.has_role && flags.has_credentials {
        score += weights.role_with_credentials_bonus;
    }
    if flags.has_authorization {
        score += weights.authorization_bonus;
    }
    if flags.has_anchor {
        score += weights.anchor_bonus;
    }
    if findings.iter().any(|f| f.severity == Severity::Critical) {
        score -= weights.any_critical_penalty;
    }
    if findings.iter().any(|f| f.severity == Severity::High) {
        score -= weights.any_high_penalty;
    }
    clamp_unit(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingKind;

    fn finding(severity: Severity) -> Finding {
        Finding::new(FindingKind::KeywordCritical, severity, "x")
    }

    #[test]
    fn penalties_strictly_decrease_with_severity() {
        let w = ScoreWeights::default();
        assert!(w.penalty(Severity::Critical) > w.penalty(Severity::High));
        assert!(w.penalty(Severity::High) > w.penalty(Severity::Medium));
        assert!(w.penalty(Severity::Medium) > w.penalty(Severity::Low));
    }

    #[test]
    fn nan_weights_stay_in_bounds() {
        let w = ScoreWeights {
            high_penalty: f64::NAN,
            genuineness_baseline: f64::NAN,
            ..ScoreWeights::default()
        };
        let findings = vec![finding(Severity::High)];
        assert_eq!(overall(&findings, &w), 0.0);
        assert_eq!(genuineness(&findings, &StructuralFlags::default(), &w), 0.0);
    }

    #[test]
    fn overall_is_clamped_at_zero() {
        let findings: Vec<_> = (0..10).map(|_| finding(Severity::Critical)).collect();
        assert_eq!(overall(&findings, &ScoreWeights::default()), 0.0);
    }

    #[test]
    fn overall_subtracts_per_finding() {
        let findings = vec![finding(Severity::High), finding(Severity::Low)];
        assert_eq!(overall(&findings, &ScoreWeights::default()), 0.86);
    }

    #[test]
    fn extra_critical_never_raises_overall() {
        let w = ScoreWeights::default();
        let mut findings = vec![finding(Severity::Medium), finding(Severity::Low)];
        let before = overall(&findings, &w);
        findings.push(finding(Severity::Critical));
        assert!(overall(&findings, &w) <= before);
    }

    #[test]
    fn genuineness_rewards_structure() {
        let flags = StructuralFlags {
            has_role: true,
            has_credentials: true,
            has_authorization: true,
            has_anchor: true,
            ..StructuralFlags::default()
        };
        assert_eq!(genuineness(&[], &flags, &ScoreWeights::default()), 0.85);
    }

    #[test]
    fn genuineness_needs_role_and_credentials_together() {
        let flags = StructuralFlags {
            has_role: true,
            ..StructuralFlags::default()
        };
        assert_eq!(genuineness(&[], &flags, &ScoreWeights::default()), 0.5);
    }

    #[test]
    fn genuineness_penalizes_severe_findings_once() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::Critical),
            finding(Severity::High),
        ];
        let score = genuineness(&findings, &StructuralFlags::default(), &ScoreWeights::default());
        assert_eq!(score, 0.05);
    }

    #[test]
    fn custom_weights_are_honoured() {
        let weights = ScoreWeights {
            genuineness_baseline: 2.0,
            ..ScoreWeights::default()
        };
        assert_eq!(genuineness(&[], &StructuralFlags::default(), &weights), 1.0);
    }
}
