//! Scripted summarizer for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{SummarizeOutcome, SummarizeRequest, Summarizer};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this outcome as-is
    Outcome(SummarizeOutcome),
    /// Fail at the transport level
    TransportError(String),
    /// Sleep long enough to trip any reasonable caller timeout
    Hang(Duration),
}

/// A summarizer that replays a script and records every request it saw.
///
/// When the script runs out, the default reply is used. Defaults to a
/// generic idle outcome so accidental extra calls stay visible in the call
/// log without failing the run.
pub struct MockSummarizer {
    script: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<SummarizeRequest>>,
    default_reply: ScriptedReply,
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            default_reply: ScriptedReply::Outcome(SummarizeOutcome::idle("user away")),
        }
    }

    pub fn with_default(mut self, reply: ScriptedReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Queue the next reply.
    pub fn push(&self, reply: ScriptedReply) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Queue the same reply n times.
    pub fn push_n(&self, reply: &ScriptedReply, n: usize) {
        let mut script = self.script.lock().unwrap();
        for _ in 0..n {
            script.push_back(reply.clone());
        }
    }

    /// Every request seen so far, in call order.
    pub fn calls(&self) -> Vec<SummarizeRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, request: SummarizeRequest) -> DomainResult<SummarizeOutcome> {
        self.calls.lock().unwrap().push(request);

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());

        match reply {
            ScriptedReply::Outcome(outcome) => Ok(outcome),
            ScriptedReply::TransportError(msg) => Err(DomainError::SummarizerFailed(msg)),
            ScriptedReply::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(SummarizeOutcome::idle("user away"))
            }
        }
    }
}
