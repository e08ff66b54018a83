use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyze::Analyzer;
use crate::category::Catalog;
use crate::error::{OracleError, RefineError};
use crate::oracle::{OracleResponse, RewriteOracle};
use crate::session::{Mode, RoundReport, Session};

pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives analyze -> rewrite -> re-analyze rounds against one oracle.
pub struct Orchestrator<O> {
    analyzer: Analyzer,
    catalog: Catalog,
    oracle: O,
    timeout: Duration,
}

impl<O: RewriteOracle> Orchestrator<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            analyzer: Analyzer::default(),
            catalog: Catalog::default(),
            oracle,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub async fn round(
        &self,
        session: &mut Session,
        mode: Mode,
        document: Option<&str>,
    ) -> Result<RoundReport, RefineError> {
        self.round_with_cancel(session, mode, document, &CancellationToken::new())
            .await
    }

    /// Run one round. On any oracle failure the session keeps its text,
    /// history and version, and ends up `Failed`.
    ///
    /// `session` is only written once the round settles. Dropping the
    /// future mid-round leaves it exactly as it was.
    pub async fn round_with_cancel(
        &self,
        session: &mut Session,
        mode: Mode,
        document: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RoundReport, RefineError> {
        let (awaiting, pending) = session.submit(&self.analyzer, &self.catalog, mode, document)?;

        debug!(
            mode = ?mode,
            category = %pending.category(),
            findings = pending.pre_analysis().findings.len(),
            "Awaiting oracle"
        );

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(OracleError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.oracle.rewrite(pending.request())) => {
                match res {
                    Ok(reply) => reply.and_then(OracleResponse::into_text),
                    Err(_) => Err(OracleError::Timeout(self.timeout)),
                }
            }
        };

        let committed = outcome
            .map_err(RefineError::from)
            .and_then(|text| awaiting.reconcile(&self.analyzer, &pending, &text));

        match committed {
            Ok((next, report)) => {
                info!(
                    version = report.version,
                    overall = report.after.overall,
                    genuineness = report.after.genuineness,
                    fixed = report.fixed.len(),
                    "Round committed"
                );
                *session = next;
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, version = awaiting.version(), "Round failed, state rolled back");
                *session = awaiting.fail(pending, &err)?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleRequest, ScriptedOracle};
    use crate::session::RoundState;
    use async_trait::async_trait;

    struct SlowOracle;

    #[async_trait]
    impl RewriteOracle for SlowOracle {
        async fn rewrite(&self, _request: &OracleRequest) -> Result<OracleResponse, OracleError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(OracleResponse {
                text: "late".into(),
            })
        }
    }

    #[tokio::test]
    async fn timeout_maps_to_oracle_unavailable() {
        let orchestrator = Orchestrator::new(SlowOracle).with_timeout(Duration::from_millis(10));
        let mut session = Session::new();
        let err = orchestrator
            .round(&mut session, Mode::Generate, Some("brief"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RefineError::OracleUnavailable(OracleError::Timeout(_))
        ));
        assert_eq!(session.state(), RoundState::Failed);
        assert_eq!(session.version(), 0);
    }

    #[tokio::test]
    async fn cancellation_rolls_back() {
        let orchestrator = Orchestrator::new(SlowOracle);
        let mut session = Session::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator
            .round_with_cancel(&mut session, Mode::Generate, Some("brief"), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RefineError::OracleUnavailable(OracleError::Cancelled));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn empty_reply_is_failure() {
        let orchestrator = Orchestrator::new(ScriptedOracle::new([Ok("   ".to_string())]));
        let mut session = Session::new();
        let err = orchestrator
            .round(&mut session, Mode::Generate, Some("brief"))
            .await
            .unwrap_err();
        assert_eq!(err, RefineError::OracleUnavailable(OracleError::EmptyOutput));
        assert_eq!(session.current_text(), "");
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_oracle() {
        let orchestrator = Orchestrator::new(ScriptedOracle::new([Ok("x".to_string())]));
        let mut session = Session::new();
        let err = orchestrator
            .round(&mut session, Mode::Improve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RefineError::InvalidInput(_)));
        assert!(orchestrator.oracle().requests().is_empty());
        assert_eq!(session.state(), RoundState::Idle);
    }

    #[tokio::test]
    async fn dropped_round_leaves_session_usable() {
        let orchestrator = Orchestrator::new(SlowOracle);
        let mut session = Session::new();
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            orchestrator.round(&mut session, Mode::Generate, Some("brief")),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(session.state(), RoundState::Idle);
        assert!(!session.is_busy());

        let scripted = Orchestrator::new(ScriptedOracle::new([Ok("draft".to_string())]));
        let report = scripted
            .round(&mut session, Mode::Generate, Some("brief"))
            .await
            .unwrap();
        assert_eq!(report.version, 1);
        assert_eq!(session.state(), RoundState::Idle);
    }
}
