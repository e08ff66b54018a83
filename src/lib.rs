//! Heuristic document analysis with an iterative rewrite loop.
//!
//! [`analyze`] runs the stock rule set over a document and reports findings,
//! structural flags and two independent scores. An [`Orchestrator`] feeds
//! those findings to a [`RewriteOracle`] round after round, keeping a
//! versioned [`Session`] history.

pub mod analyze;
pub mod category;
pub mod config;
pub mod detect;
pub mod directive;
pub mod error;
pub mod finding;
pub mod indicators;
pub mod oracle;
pub mod orchestrator;
pub mod score;
pub mod session;

use once_cell::sync::Lazy;

pub use analyze::{AnalysisResult, Analyzer, Stats};
pub use category::{Catalog, CategoryContext, CategoryId, CategorySelector, CategoryTable};
pub use config::Config;
pub use detect::{Detector, Expectation, Registry};
pub use error::{AnalyzeError, OracleError, RefineError};
pub use finding::{Finding, FindingKind, Severity};
pub use indicators::{Indicator, IndicatorRules, StructuralFlags};
pub use oracle::{ClaudeOracle, OracleRequest, OracleResponse, RewriteOracle, ScriptedOracle};
pub use orchestrator::Orchestrator;
pub use score::{ScoreWeights, Scores};
pub use session::{HistoryEntry, Mode, PendingRound, RoundReport, RoundState, Session};

static STANDARD: Lazy<Analyzer> = Lazy::new(Analyzer::default);

/// Analyze `text` with the stock registry and weights.
pub fn analyze(text: &str) -> Result<AnalysisResult, AnalyzeError> {
    STANDARD.analyze(text)
}
