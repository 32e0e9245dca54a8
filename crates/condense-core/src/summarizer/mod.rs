//! Recursive summarization of arbitrarily long text
//!
//! Text that fits the model's budget (minus headroom for the prompt template
//! and the response) is summarized with one completion call. Longer text is
//! split into sentence chunks, each chunk is summarized recursively, and the
//! joined chunk summaries are summarized again until the result fits.
//!
//! Sibling chunks run concurrently but are always joined in source order, and
//! the merge waits for every sibling. [`SummarizerConfig::max_concurrency`]
//! caps the completion calls in flight across the whole call tree, not per
//! level.

mod prompt;

pub use prompt::summarization_prompt;

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chunking::ChunkPlanner;
use crate::config::{Config, SummarizerConfig};
use crate::error::{Error, Result};
use crate::llm::{CompletionRequest, CompletionService, LlmClient};
use crate::models::ModelLimits;
use crate::sentences::PunctuationSentenceDetector;
use crate::tokenizer::TiktokenTokenizer;

/// Separator placed between chunk summaries before the merge step
const SUMMARY_SEPARATOR: &str = "\n\n";

/// Summary of one chunk together with the chunk it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub summary: String,
    pub source: String,
}

/// Outcome of a summarization call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Final summary
    pub summary: String,
    /// Per-chunk summaries in source order; `None` when the text fit in one call
    pub chunks: Option<Vec<ChunkSummary>>,
}

impl SummaryResult {
    fn single(summary: String) -> Self {
        Self {
            summary,
            chunks: None,
        }
    }

    /// Whether the input had to be split
    pub fn is_chunked(&self) -> bool {
        self.chunks.is_some()
    }
}

/// Summarizes text of any length against a model's token budget
#[derive(Clone)]
pub struct Summarizer {
    planner: ChunkPlanner,
    completion: Arc<dyn CompletionService>,
    config: SummarizerConfig,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("planner", &self.planner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Summarizer {
    /// Create a new summarizer
    pub fn new(
        planner: ChunkPlanner,
        completion: Arc<dyn CompletionService>,
        config: SummarizerConfig,
    ) -> Self {
        Self {
            planner,
            completion,
            config,
        }
    }

    /// Wire up the production stack: configured model table, tiktoken,
    /// punctuation sentence detection, and the OpenRouter client
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let planner = ChunkPlanner::new(
            Arc::new(ModelLimits::from_config(config)?),
            Arc::new(TiktokenTokenizer::new()?),
            Arc::new(PunctuationSentenceDetector::new()),
        );
        let client = LlmClient::from_config(&config.llm)?;

        Ok(Self::new(planner, Arc::new(client), config.summarizer.clone()))
    }

    pub fn planner(&self) -> &ChunkPlanner {
        &self.planner
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Budget left for the text itself once headroom is reserved.
    ///
    /// Fails with [`Error::HeadroomExceedsBudget`] when the headroom leaves
    /// nothing.
    pub fn reserved_budget(&self, model: &str, max_override: Option<usize>) -> Result<usize> {
        let budget = self.planner.effective_budget(model, max_override)?;
        let headroom = self.config.headroom();

        if budget <= headroom {
            return Err(Error::HeadroomExceedsBudget {
                model: model.to_string(),
                budget,
                headroom,
            });
        }
        Ok(budget - headroom)
    }

    /// Summarize `text` for `model`, optionally focused on `question`
    pub async fn summarize(
        &self,
        text: &str,
        model: &str,
        question: Option<&str>,
        max_override: Option<usize>,
    ) -> Result<SummaryResult> {
        self.summarize_with_cancel(text, model, question, max_override, &CancellationToken::new())
            .await
    }

    /// Like [`Summarizer::summarize`], aborting with [`Error::Cancelled`] once
    /// `cancel` fires. In-flight sibling calls are dropped.
    pub async fn summarize_with_cancel(
        &self,
        text: &str,
        model: &str,
        question: Option<&str>,
        max_override: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SummaryResult> {
        let permits = Semaphore::new(self.config.max_concurrency.max(1));
        let call = Call {
            model,
            max_override,
            cancel,
            permits: &permits,
        };
        self.summarize_node(text, question, call, 0).await
    }

    fn summarize_node<'a>(
        &'a self,
        text: &'a str,
        question: Option<&'a str>,
        call: Call<'a>,
        depth: usize,
    ) -> BoxFuture<'a, Result<SummaryResult>> {
        Box::pin(async move {
            if text.is_empty() {
                return Err(Error::EmptyInput);
            }
            if depth > self.config.max_depth {
                return Err(Error::RecursionLimit(depth));
            }

            let reserved = self.reserved_budget(call.model, call.max_override)?;
            if !self.planner.must_split(text, call.model, Some(reserved))? {
                info!(model = %call.model, reserved, depth, "Text fits in one call");
                let summary = self.complete(text, question, call).await?;
                return Ok(SummaryResult::single(summary));
            }

            let chunks = self
                .planner
                .sentence_chunk(text, call.model, Some(reserved))?
                .collect::<Result<Vec<_>>>()?;
            let total = chunks.len();
            info!(model = %call.model, chunks = total, depth, "Text split into chunks");

            let siblings: Vec<BoxFuture<'_, Result<String>>> = chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| {
                    async move {
                        info!(
                            chunk = i + 1,
                            of = total,
                            tokens = chunk.token_count,
                            depth,
                            "Summarizing chunk"
                        );
                        let result = self
                            .summarize_node(&chunk.text, question, call, depth + 1)
                            .await?;
                        Ok(result.summary)
                    }
                    .boxed()
                })
                .collect();

            let summaries: Vec<String> = stream::iter(siblings)
                .buffered(self.config.max_concurrency.max(1))
                .try_collect()
                .await?;

            info!(chunks = total, depth, "Summarized chunks");

            // The joined digest is no longer source material, so the focus
            // question is dropped here
            let joined = summaries.join(SUMMARY_SEPARATOR);
            let merged = self.summarize_node(&joined, None, call, depth + 1).await?;

            let trace = summaries
                .into_iter()
                .zip(chunks)
                .map(|(summary, chunk)| ChunkSummary {
                    summary,
                    source: chunk.text,
                })
                .collect();

            Ok(SummaryResult {
                summary: merged.summary,
                chunks: Some(trace),
            })
        })
    }

    /// One completion call, raced against cancellation. Holds one of the
    /// tree-wide permits while the call is in flight.
    async fn complete(&self, text: &str, question: Option<&str>, call: Call<'_>) -> Result<String> {
        let prompt = summarization_prompt(text, question);
        debug!(model = %call.model, "Summarizing with prompt:\n{}", prompt);

        let request =
            CompletionRequest::new(prompt, call.model, self.config.response_reserve_tokens);

        let summary = tokio::select! {
            biased;
            _ = call.cancel.cancelled() => return Err(Error::Cancelled),
            result = async {
                let _permit = call
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| Error::Other(format!("completion permits closed: {}", e)))?;
                self.completion.complete(request).await
            } => result?,
        };

        debug!(model = %call.model, "Summary:\n{}", summary);
        Ok(summary)
    }
}

/// Parameters shared by every node of one summarization call tree
#[derive(Clone, Copy)]
struct Call<'a> {
    model: &'a str,
    max_override: Option<usize>,
    cancel: &'a CancellationToken,
    /// Bounds in-flight completion calls across all recursion levels
    permits: &'a Semaphore,
}
