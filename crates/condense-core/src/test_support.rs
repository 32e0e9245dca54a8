//! Deterministic stand-ins for the tokenizer and completion service

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::chunking::ChunkPlanner;
use crate::config::SummarizerConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, CompletionService};
use crate::models::ModelLimits;
use crate::sentences::PunctuationSentenceDetector;
use crate::summarizer::Summarizer;
use crate::tokenizer::{TokenId, Tokenizer};

pub const MODEL: &str = "test/model";

/// One token per whitespace-separated word
#[derive(Default)]
pub struct WordTokenizer {
    vocab: Mutex<(HashMap<String, TokenId>, Vec<String>)>,
}

impl Tokenizer for WordTokenizer {
    fn encode(&self, text: &str, _model: &str) -> Result<Vec<TokenId>> {
        let mut vocab = self.vocab.lock().unwrap();
        let (ids, words) = &mut *vocab;
        Ok(text
            .split_whitespace()
            .map(|word| {
                *ids.entry(word.to_string()).or_insert_with(|| {
                    words.push(word.to_string());
                    (words.len() - 1) as TokenId
                })
            })
            .collect())
    }

    fn decode(&self, tokens: &[TokenId], _model: &str) -> Result<String> {
        let vocab = self.vocab.lock().unwrap();
        tokens
            .iter()
            .map(|id| {
                vocab
                    .1
                    .get(*id as usize)
                    .cloned()
                    .ok_or_else(|| Error::Tokenizer(format!("unknown token {}", id)))
            })
            .collect::<Result<Vec<_>>>()
            .map(|words| words.join(" "))
    }

    fn count(&self, text: &str, _model: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// A sentence of exactly `words` tokens under [`WordTokenizer`]
pub fn sentence(tag: &str, words: usize) -> String {
    let mut parts = vec![tag.to_string()];
    parts.extend((1..words).map(|_| "lorem".to_string()));
    format!("{}.", parts.join(" "))
}

/// Planner over [`WordTokenizer`] with a single model of `window` tokens
pub fn word_planner(window: usize) -> ChunkPlanner {
    ChunkPlanner::new(
        Arc::new(ModelLimits::empty().with_model(MODEL, window).unwrap()),
        Arc::new(WordTokenizer::default()),
        Arc::new(PunctuationSentenceDetector::new()),
    )
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;
type Delay = Box<dyn Fn(&CompletionRequest) -> Duration + Send + Sync>;

/// Completion service that records every request and answers from a closure
pub struct ScriptedCompletion {
    requests: Mutex<Vec<CompletionRequest>>,
    respond: Responder,
    delay: Option<Delay>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(respond: impl Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Always answer with the same text
    pub fn fixed(summary: &str) -> Self {
        let summary = summary.to_string();
        Self::new(move |_| Ok(summary.clone()))
    }

    /// Sleep before answering, per request
    pub fn with_delay(mut self, delay: impl Fn(&CompletionRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Most requests that were ever awaiting a response at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&request)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(&request)
    }
}

/// Pull the text between the triple quotes of a summarization prompt
pub fn prompt_text(request: &CompletionRequest) -> &str {
    let start = request.prompt.find("\"\"\"").map(|i| i + 3).unwrap_or(0);
    let end = request.prompt.rfind("\"\"\"").unwrap_or(request.prompt.len());
    &request.prompt[start..end.max(start)]
}

/// Summarizer over [`word_planner`] with the given headroom split
pub fn word_summarizer(
    window: usize,
    prompt_reserve: usize,
    response_reserve: usize,
    completion: Arc<ScriptedCompletion>,
) -> Summarizer {
    let config = SummarizerConfig {
        response_reserve_tokens: response_reserve,
        prompt_reserve_tokens: prompt_reserve,
        ..SummarizerConfig::default()
    };
    word_summarizer_with(window, config, completion)
}

pub fn word_summarizer_with(
    window: usize,
    config: SummarizerConfig,
    completion: Arc<ScriptedCompletion>,
) -> Summarizer {
    Summarizer::new(word_planner(window), completion, config)
}
