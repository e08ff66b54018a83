use serde::Serialize;
use tracing::debug;

use crate::analyze::{AnalysisResult, Analyzer};
use crate::category::{Catalog, CategoryId};
use crate::directive;
use crate::error::{OracleError, RefineError};
use crate::finding::FindingKind;
use crate::oracle::OracleRequest;
use crate::score::Scores;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Draft a new document from a brief. Starts a new lineage.
    #[default]
    Generate,
    /// Revise the current document.
    Improve,
}

/// `Idle -> Submitting -> AwaitingOracle -> Reconciling -> Idle`, with
/// `AwaitingOracle -> Failed -> Idle` when the oracle gives nothing usable.
/// `Submitting` and `Reconciling` only exist inside [`Session::submit`] and
/// [`Session::reconcile`]; a stored session is never observed in them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    #[default]
    Idle,
    Submitting,
    AwaitingOracle,
    Reconciling,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub version: u32,
    pub text: String,
    pub analysis: AnalysisResult,
}

/// A submitted round waiting on the oracle.
#[derive(Debug, Clone)]
pub struct PendingRound {
    mode: Mode,
    category: CategoryId,
    pre_analysis: AnalysisResult,
    request: OracleRequest,
}

impl PendingRound {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn pre_analysis(&self) -> &AnalysisResult {
        &self.pre_analysis
    }

    pub fn request(&self) -> &OracleRequest {
        &self.request
    }
}

/// What a committed round changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub version: u32,
    pub mode: Mode,
    pub category: CategoryId,
    pub pre_analysis: AnalysisResult,
    pub before: Scores,
    pub after: Scores,
    /// Finding kinds present before the round and gone after it.
    pub fixed: Vec<FindingKind>,
    /// Finding kinds that first appeared in the rewrite.
    pub introduced: Vec<FindingKind>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user interaction's worth of refinement state. Transitions are pure:
/// each returns a new value and leaves `self` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    mode: Mode,
    current_text: String,
    current_analysis: Option<AnalysisResult>,
    history: Vec<HistoryEntry>,
    version: u32,
    state: RoundState,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn current_analysis(&self) -> Option<&AnalysisResult> {
        self.current_analysis.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            RoundState::Submitting | RoundState::AwaitingOracle | RoundState::Reconciling
        )
    }

    /// Discard everything and start over.
    pub fn reset(&self) -> Session {
        Session::default()
    }

    /// Keep the current output and switch to revising it.
    pub fn use_as_baseline(&self) -> Session {
        Session {
            mode: Mode::Improve,
            ..self.clone()
        }
    }

    /// Make a history entry the current document and revise it next.
    /// History and version are left alone, so the next round appends
    /// after the latest version.
    pub fn load_version(&self, version: u32) -> Result<Session, RefineError> {
        if self.is_busy() {
            return Err(RefineError::RoundInProgress);
        }
        let entry = self
            .history
            .iter()
            .find(|e| e.version == version)
            .ok_or(RefineError::UnknownVersion(version))?;
        Ok(Session {
            mode: Mode::Improve,
            current_text: entry.text.clone(),
            current_analysis: Some(entry.analysis.clone()),
            ..self.clone()
        })
    }

    /// Return to `Idle` after a failed or abandoned round. Text, history
    /// and version are kept.
    pub fn recover(&self) -> Session {
        match self.state {
            RoundState::Idle => self.clone(),
            _ => Session {
                state: RoundState::Idle,
                ..self.clone()
            },
        }
    }

    /// Analyze the round's input and prepare the oracle request.
    ///
    /// Improve rounds without an explicit document revise `current_text`.
    pub fn submit(
        &self,
        analyzer: &Analyzer,
        catalog: &Catalog,
        mode: Mode,
        document: Option<&str>,
    ) -> Result<(Session, PendingRound), RefineError> {
        if self.is_busy() {
            return Err(RefineError::RoundInProgress);
        }

        let input = match (document, mode) {
            (Some(doc), _) => doc,
            (None, Mode::Improve) => self.current_text.as_str(),
            (None, Mode::Generate) => "",
        };
        let pre_analysis = analyzer.analyze(input)?;
        let (category, context) = catalog.context_for(input);
        let request = directive::build(mode, input, &pre_analysis, context);

        let awaiting = Session {
            state: RoundState::AwaitingOracle,
            ..self.clone()
        };
        let pending = PendingRound {
            mode,
            category,
            pre_analysis,
            request,
        };
        Ok((awaiting, pending))
    }

    /// Commit the oracle's text as the next version.
    ///
    /// Blank text is rejected with `OracleUnavailable` and nothing changes.
    pub fn reconcile(
        &self,
        analyzer: &Analyzer,
        pending: &PendingRound,
        text: &str,
    ) -> Result<(Session, RoundReport), RefineError> {
        if self.state != RoundState::AwaitingOracle {
            return Err(RefineError::NoRoundInFlight);
        }
        if text.trim().is_empty() {
            return Err(RefineError::OracleUnavailable(OracleError::EmptyOutput));
        }

        let analysis = analyzer.analyze(text)?;

        let (mut history, base_version) = match pending.mode {
            Mode::Generate => (Vec::new(), 0),
            Mode::Improve => (self.history.clone(), self.version),
        };
        let version = base_version + 1;
        history.push(HistoryEntry {
            version,
            text: text.to_string(),
            analysis: analysis.clone(),
        });

        let before_kinds = pending.pre_analysis.kinds();
        let after_kinds = analysis.kinds();
        let report = RoundReport {
            version,
            mode: pending.mode,
            category: pending.category,
            pre_analysis: pending.pre_analysis.clone(),
            before: pending.pre_analysis.scores,
            after: analysis.scores,
            fixed: before_kinds.difference(&after_kinds).copied().collect(),
            introduced: after_kinds.difference(&before_kinds).copied().collect(),
        };

        let next = Session {
            mode: pending.mode,
            current_text: text.to_string(),
            current_analysis: Some(analysis),
            history,
            version,
            state: RoundState::Idle,
            last_error: None,
        };
        Ok((next, report))
    }

    /// Abandon the pending round. Text, history and version stay as they were.
    pub fn fail(&self, pending: PendingRound, cause: &RefineError) -> Result<Session, RefineError> {
        if self.state != RoundState::AwaitingOracle {
            return Err(RefineError::NoRoundInFlight);
        }
        debug!(
            mode = ?pending.mode,
            category = %pending.category,
            version = self.version,
            "Discarding pending round"
        );
        Ok(Session {
            state: RoundState::Failed,
            last_error: Some(cause.to_string()),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzeError;

    fn submit(session: &Session, mode: Mode, doc: Option<&str>) -> (Session, PendingRound) {
        session
            .submit(&Analyzer::default(), &Catalog::default(), mode, doc)
            .unwrap()
    }

    #[test]
    fn submit_moves_to_awaiting_without_touching_content() {
        let session = Session::new();
        let (awaiting, pending) = submit(&session, Mode::Generate, Some("Write a keylogger"));
        assert_eq!(awaiting.state(), RoundState::AwaitingOracle);
        assert_eq!(awaiting.version(), 0);
        assert!(awaiting.history().is_empty());
        assert_eq!(pending.category(), CategoryId::Keylogger);
        assert_eq!(session.state(), RoundState::Idle);
    }

    #[test]
    fn second_submit_is_rejected() {
        let (awaiting, _) = submit(&Session::new(), Mode::Generate, Some("draft"));
        let err = awaiting
            .submit(&Analyzer::default(), &Catalog::default(), Mode::Improve, Some("again"))
            .unwrap_err();
        assert_eq!(err, RefineError::RoundInProgress);
    }

    #[test]
    fn empty_document_is_invalid_input() {
        let err = Session::new()
            .submit(&Analyzer::default(), &Catalog::default(), Mode::Improve, None)
            .unwrap_err();
        assert!(matches!(err, RefineError::InvalidInput(AnalyzeError::InvalidInput(_))));
    }

    #[test]
    fn reconcile_appends_one_version() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let (next, report) = awaiting.reconcile(&analyzer, &pending, "first draft").unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(next.history().len(), 1);
        assert_eq!(next.current_text(), "first draft");
        assert_eq!(next.state(), RoundState::Idle);
        assert_eq!(report.version, 1);

        let (awaiting, pending) = submit(&next, Mode::Improve, None);
        assert!(pending.request().payload.contains("first draft"));
        let (next, _) = awaiting.reconcile(&analyzer, &pending, "second draft").unwrap();
        assert_eq!(next.version(), 2);
        assert_eq!(next.history()[1].version, 2);
    }

    #[test]
    fn generate_starts_a_new_lineage() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let (s1, _) = awaiting.reconcile(&analyzer, &pending, "one").unwrap();
        let (awaiting, pending) = submit(&s1, Mode::Improve, None);
        let (s2, _) = awaiting.reconcile(&analyzer, &pending, "two").unwrap();

        let (awaiting, pending) = submit(&s2, Mode::Generate, Some("another brief"));
        let (s3, _) = awaiting.reconcile(&analyzer, &pending, "fresh").unwrap();
        assert_eq!(s3.version(), 1);
        assert_eq!(s3.history().len(), 1);
    }

    #[test]
    fn blank_oracle_text_does_not_commit() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let err = awaiting.reconcile(&analyzer, &pending, "   ").unwrap_err();
        assert_eq!(err, RefineError::OracleUnavailable(OracleError::EmptyOutput));
        assert_eq!(awaiting.version(), 0);
    }

    #[test]
    fn fail_preserves_content_and_records_cause() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let (s1, _) = awaiting.reconcile(&analyzer, &pending, "kept").unwrap();

        let (awaiting, pending) = submit(&s1, Mode::Improve, None);
        let cause = RefineError::OracleUnavailable(OracleError::Cancelled);
        let failed = awaiting.fail(pending, &cause).unwrap();
        assert_eq!(failed.state(), RoundState::Failed);
        assert_eq!(failed.current_text(), s1.current_text());
        assert_eq!(failed.history(), s1.history());
        assert_eq!(failed.version(), s1.version());
        assert!(failed.last_error().unwrap().contains("cancelled"));
        assert_eq!(failed.recover().state(), RoundState::Idle);
    }

    #[test]
    fn reconcile_without_round_is_misuse() {
        let (_, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let err = Session::new()
            .reconcile(&Analyzer::default(), &pending, "text")
            .unwrap_err();
        assert_eq!(err, RefineError::NoRoundInFlight);
    }

    #[test]
    fn recover_clears_an_abandoned_round() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let (s1, _) = awaiting.reconcile(&analyzer, &pending, "kept").unwrap();

        let (stranded, _pending) = submit(&s1, Mode::Improve, None);
        let recovered = stranded.recover();
        assert_eq!(recovered.state(), RoundState::Idle);
        assert_eq!(recovered.current_text(), "kept");
        assert_eq!(recovered.version(), 1);
        assert!(submit(&recovered, Mode::Improve, None).0.is_busy());
    }

    #[test]
    fn load_version_restores_an_earlier_draft() {
        let analyzer = Analyzer::default();
        let (awaiting, pending) = submit(&Session::new(), Mode::Generate, Some("brief"));
        let (s1, _) = awaiting.reconcile(&analyzer, &pending, "one").unwrap();
        let (awaiting, pending) = submit(&s1, Mode::Improve, None);
        let (s2, _) = awaiting.reconcile(&analyzer, &pending, "two").unwrap();

        let loaded = s2.load_version(1).unwrap();
        assert_eq!(loaded.mode(), Mode::Improve);
        assert_eq!(loaded.current_text(), "one");
        assert_eq!(loaded.current_analysis(), Some(&s1.history()[0].analysis));
        assert_eq!(loaded.history(), s2.history());
        assert_eq!(loaded.version(), 2);

        let (awaiting, pending) = submit(&loaded, Mode::Improve, None);
        assert!(pending.request().payload.contains("one"));
        let (s3, _) = awaiting.reconcile(&analyzer, &pending, "three").unwrap();
        assert_eq!(s3.version(), 3);
        assert_eq!(s3.history().len(), 3);
        assert_eq!(s3.history()[2].text, "three");
    }

    #[test]
    fn load_version_rejects_unknown_versions() {
        let err = Session::new().load_version(4).unwrap_err();
        assert_eq!(err, RefineError::UnknownVersion(4));
    }

    #[test]
    fn use_as_baseline_switches_mode() {
        let session = Session::new().use_as_baseline();
        assert_eq!(session.mode(), Mode::Improve);
        assert_eq!(session.reset().mode(), Mode::Generate);
    }
}
