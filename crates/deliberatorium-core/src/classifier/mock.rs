//! Deterministic classifier for tests and offline runs

use super::{Classifier, ClassifierError};
use crate::model::JudgingModel;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the scripted classifier does for a matching prompt
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond(String),
    Fail(ClassifierError),
}

/// Replies according to rules keyed on substrings of the rendered prompt.
///
/// The first rule whose key occurs in the prompt wins; prompts matching no
/// rule get the fallback reply. Keys should be drawn from evidence texts,
/// since the instruction part of the prompt is shared by every item.
pub struct ScriptedClassifier {
    rules: Vec<(String, ScriptedReply)>,
    fallback: ScriptedReply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new(fallback: ScriptedReply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer every prompt with the same response
    pub fn always(response: &str) -> Self {
        Self::new(ScriptedReply::Respond(response.to_string()))
    }

    /// Fail every prompt with a network error
    pub fn failing(message: &str) -> Self {
        Self::new(ScriptedReply::Fail(ClassifierError::Network(
            message.to_string(),
        )))
    }

    pub fn respond_when(mut self, key: &str, response: &str) -> Self {
        self.rules
            .push((key.to_string(), ScriptedReply::Respond(response.to_string())));
        self
    }

    pub fn fail_when(mut self, key: &str, error: ClassifierError) -> Self {
        self.rules.push((key.to_string(), ScriptedReply::Fail(error)));
        self
    }

    /// Hold every call for `delay` before replying
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn reply_for(&self, prompt: &str) -> ScriptedReply {
        self.rules
            .iter()
            .find(|(key, _)| prompt.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.reply_for(prompt);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            ScriptedReply::Respond(response) => Ok(response),
            ScriptedReply::Fail(err) => Err(err),
        }
    }

    fn model_info(&self) -> JudgingModel {
        JudgingModel::new("scripted", "v1")
    }
}
