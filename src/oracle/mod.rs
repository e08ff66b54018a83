mod claude;

pub use claude::ClaudeOracle;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::OracleError;

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleRequest {
    /// System-level framing.
    pub directive: String,
    /// Document, findings and scores.
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    pub text: String,
}

impl OracleResponse {
    /// Blank output is a failure, never "nothing to change".
    pub fn into_text(self) -> Result<String, OracleError> {
        if self.text.trim().is_empty() {
            Err(OracleError::EmptyOutput)
        } else {
            Ok(self.text)
        }
    }
}

// =============================================================================
// RewriteOracle Trait
// =============================================================================

/// External text rewriter. Implementations must be stateless across calls:
/// everything a rewrite needs travels in the request.
#[async_trait]
pub trait RewriteOracle: Send + Sync {
    async fn rewrite(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

// =============================================================================
// Scripted oracle
// =============================================================================

/// Replays canned replies in order and records every request it receives.
/// Once the script runs out it fails with [`OracleError::EmptyOutput`].
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = Result<String, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RewriteOracle for ScriptedOracle {
    async fn rewrite(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        match next {
            Some(reply) => reply.map(|text| OracleResponse { text }),
            None => Err(OracleError::EmptyOutput),
        }
    }
}
