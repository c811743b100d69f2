//! Scripted completion client for tests.

use super::{CompletionClient, CompletionRequest};
use crate::error::{AnnoError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays scripted results in order, then echoes a fixed reply.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String>>>,
    fallback: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then_fail(self, status: u16) -> Self {
        self.script.lock().unwrap().push_back(Err(AnnoError::Api {
            status,
            message: "scripted failure".to_string(),
        }));
        self
    }

    pub fn then_reply(self, reply: &str) -> Self {
        self.script.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
