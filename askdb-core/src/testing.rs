//! Scripted [`JsonLlm`] for tests in downstream crates.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{AskDbError, JsonLlm, LlmJsonRequest, LlmJsonResponse, Value};

enum Script {
    Queue(VecDeque<Value>),
    /// First route whose needle occurs in the prompt answers.
    Routes(Vec<(String, Value)>),
}

/// Answers from a fixed script and records every request it receives.
pub struct ScriptedLlm {
    script: Mutex<Script>,
    cost: f64,
    requests: Mutex<Vec<LlmJsonRequest>>,
}

impl ScriptedLlm {
    /// Answers in order; a call past the end fails.
    pub fn sequence(answers: impl IntoIterator<Item = Value>) -> Self {
        Self::with_script(Script::Queue(answers.into_iter().collect()))
    }

    /// Answers by prompt content.
    pub fn routes<S: Into<String>>(routes: impl IntoIterator<Item = (S, Value)>) -> Self {
        Self::with_script(Script::Routes(
            routes
                .into_iter()
                .map(|(needle, answer)| (needle.into(), answer))
                .collect(),
        ))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            cost: 0.01,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Cost reported for every call.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn requests(&self) -> Vec<LlmJsonRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests().len()
    }

    /// Number of requests whose prompt contains `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.prompt.contains(needle))
            .count()
    }

    fn next_answer(&self, prompt: &str) -> Result<Value, AskDbError> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| AskDbError::LlmProvider("script lock poisoned".to_string()))?;
        let answer = match &mut *script {
            Script::Queue(queue) => queue.pop_front(),
            Script::Routes(routes) => routes
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, answer)| answer.clone()),
        };
        answer.ok_or_else(|| {
            let head: String = prompt.trim().chars().take(120).collect();
            AskDbError::LlmProvider(format!("no scripted answer for prompt: {head}"))
        })
    }
}

#[async_trait::async_trait]
impl JsonLlm for ScriptedLlm {
    async fn ask_json(&self, request: LlmJsonRequest) -> Result<LlmJsonResponse, AskDbError> {
        let answer = self.next_answer(&request.prompt);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(LlmJsonResponse::new(answer?, self.cost))
    }
}
