use regex::Regex;
use serde::Serialize;

use crate::detect::compile;

// ---------------------------------------------------------------------------
// Structural indicators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Role,
    Credentials,
    Authorization,
    Anchor,
    Continuation,
    Initiation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructuralFlags {
    pub has_role: bool,
    pub has_credentials: bool,
    pub has_authorization: bool,
    pub has_anchor: bool,
    pub has_continuation: bool,
    pub has_initiation: bool,
}

impl StructuralFlags {
    pub fn get(&self, indicator: Indicator) -> bool {
        match indicator {
            Indicator::Role => self.has_role,
            Indicator::Credentials => self.has_credentials,
            Indicator::Authorization => self.has_authorization,
            Indicator::Anchor => self.has_anchor,
            Indicator::Continuation => self.has_continuation,
            Indicator::Initiation => self.has_initiation,
        }
    }

    fn set(&mut self, indicator: Indicator, value: bool) {
        match indicator {
            Indicator::Role => self.has_role = value,
            Indicator::Credentials => self.has_credentials = value,
            Indicator::Authorization => self.has_authorization = value,
            Indicator::Anchor => self.has_anchor = value,
            Indicator::Continuation => self.has_continuation = value,
            Indicator::Initiation => self.has_initiation = value,
        }
    }

    /// Initiation framing present without any continuation framing.
    pub fn initiation_without_continuation(&self) -> bool {
        self.has_initiation && !self.has_continuation
    }
}

// ---------------------------------------------------------------------------
// Indicator rules
// ---------------------------------------------------------------------------

/// Presence predicates, evaluated against the lower-cased document.
/// An indicator whose pattern failed to compile never fires.
#[derive(Debug, Clone)]
pub struct IndicatorRules {
    rules: Vec<(Indicator, Vec<Regex>)>,
}

impl IndicatorRules {
    pub fn standard() -> Self {
        let table: [(Indicator, &[&str]); 6] = [
            (
                Indicator::Role,
                &[
                    r"(?i)i('m| am) (a |an )?(senior |lead |principal )?(security |software |devops )?engineer",
                    r"(?i)as (a |an )?(senior |lead )",
                ],
            ),
            (
                Indicator::Credentials,
                &[r"(?i)oscp|gpen|ceh|cissp|certified|\d+\s*years?\s*(of\s*)?(experience|exp)"],
            ),
            (
                Indicator::Authorization,
                &[r"(?i)authorized|permission|legitimate|compliance|legal|approved|ciso|management"],
            ),
            (
                Indicator::Anchor,
                &[r"(?i)here('s| is) (my|the|our) (code|implementation|work)"],
            ),
            (
                Indicator::Continuation,
                &[r"(?i)complete|finish|continue|the (next|remaining|rest)|fill in"],
            ),
            (
                Indicator::Initiation,
                &[r"(?i)can you (write|create|make|build|generate)|write me|create a|make a"],
            ),
        ];
        Self::from_patterns(&table)
    }

    pub fn from_patterns(table: &[(Indicator, &[&str])]) -> Self {
        let rules = table
            .iter()
            .map(|(indicator, sources)| {
                let compiled = sources.iter().filter_map(|src| compile(src)).collect();
                (*indicator, compiled)
            })
            .collect();
        Self { rules }
    }

    /// Evaluate every indicator. Embedded code always counts as an anchor.
    pub fn evaluate(&self, lower: &str, has_code: bool) -> StructuralFlags {
        let mut flags = StructuralFlags::default();
        for (indicator, patterns) in &self.rules {
            let hit = patterns.iter().any(|re| re.is_match(lower));
            if hit {
                flags.set(*indicator, true);
            }
        }
        if has_code {
            flags.has_anchor = true;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(text: &str) -> StructuralFlags {
        IndicatorRules::standard().evaluate(&text.to_lowercase(), false)
    }

    #[test]
    fn detects_role_and_credentials() {
        let f = flags("I'm a senior security engineer with 10 years of experience.");
        assert!(f.has_role);
        assert!(f.has_credentials);
        assert!(!f.has_authorization);
    }

    #[test]
    fn continuation_and_initiation_can_coexist() {
        let f = flags("Can you write the remaining handler and finish the parser?");
        assert!(f.has_initiation);
        assert!(f.has_continuation);
        assert!(!f.initiation_without_continuation());
    }

    #[test]
    fn code_counts_as_anchor() {
        let rules = IndicatorRules::standard();
        assert!(rules.evaluate("plain words", true).has_anchor);
        assert!(!rules.evaluate("plain words", false).has_anchor);
    }

    #[test]
    fn broken_pattern_never_fires() {
        let table: [(Indicator, &[&str]); 1] = [(Indicator::Role, &["(unclosed"])];
        let rules = IndicatorRules::from_patterns(&table);
        assert!(!rules.evaluate("(unclosed", false).has_role);
    }
}
