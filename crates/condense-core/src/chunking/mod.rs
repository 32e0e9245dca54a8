//! Token-aware chunk planning
//!
//! This module decides whether a text fits a model's token budget and, when it
//! does not, splits it into approximately equal chunks that do.
//!
//! # Strategies
//!
//! - **Window chunking** ([`ChunkPlanner::window_chunk`]): slices the raw token
//!   sequence into equal windows, optionally extended with up to
//!   [`MAX_OVERLAP_TOKENS`] of overlap into the next window. Cheap and exact,
//!   but cuts mid-sentence.
//! - **Sentence chunking** ([`ChunkPlanner::sentence_chunk`]): greedily packs
//!   whole sentences, closing a chunk once it is near the target size rather
//!   than when it is full. Used by the summarizer.
//!
//! Both strategies produce lazy iterators whose items come out in source order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use condense_core::chunking::ChunkPlanner;
//!
//! let planner = ChunkPlanner::new(limits, tokenizer, detector);
//! if planner.must_split(&text, "openai/gpt-4", None)? {
//!     for chunk in planner.sentence_chunk(&text, "openai/gpt-4", None)? {
//!         let chunk = chunk?;
//!         println!("{} tokens", chunk.token_count);
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ModelLimits;
use crate::sentences::SentenceDetector;
use crate::tokenizer::{TokenId, Tokenizer};

/// Upper bound on the tokens shared by consecutive windows
pub const MAX_OVERLAP_TOKENS: usize = 200;

/// A slice of source text sized to fit a token budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text of the chunk
    pub text: String,
    /// Tokens the chunk occupies
    pub token_count: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, token_count: usize) -> Self {
        Self {
            text: text.into(),
            token_count,
        }
    }
}

/// Arithmetic behind a window split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    /// Tokens in the whole text
    pub total_tokens: usize,
    /// Effective budget the layout was computed for
    pub budget: usize,
    /// Number of chunks the text is divided into
    pub chunk_count: usize,
    /// Tokens each window advances by
    pub chunk_len: usize,
    /// Tokens each window extends into the next one
    pub overlap: usize,
}

impl WindowLayout {
    /// Compute the layout for `total_tokens` under `budget`.
    ///
    /// Chunk sizes are equalized: the count is the minimum that fits the
    /// budget, and the length is the total spread evenly across that count.
    pub fn new(total_tokens: usize, budget: usize, with_overlap: bool) -> Self {
        let budget = budget.max(1);
        let chunk_count = total_tokens.div_ceil(budget).max(1);
        let chunk_len = total_tokens.div_ceil(chunk_count).max(1);
        let overlap = if with_overlap {
            (budget - chunk_len).min(MAX_OVERLAP_TOKENS)
        } else {
            0
        };

        Self {
            total_tokens,
            budget,
            chunk_count,
            chunk_len,
            overlap,
        }
    }

    /// Tokens in a full window
    pub fn window_len(&self) -> usize {
        self.chunk_len + self.overlap
    }
}

/// Decides when and how text gets split for a model
#[derive(Clone)]
pub struct ChunkPlanner {
    limits: Arc<ModelLimits>,
    tokenizer: Arc<dyn Tokenizer>,
    sentences: Arc<dyn SentenceDetector>,
}

impl fmt::Debug for ChunkPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkPlanner")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl ChunkPlanner {
    /// Create a new planner
    pub fn new(
        limits: Arc<ModelLimits>,
        tokenizer: Arc<dyn Tokenizer>,
        sentences: Arc<dyn SentenceDetector>,
    ) -> Self {
        Self {
            limits,
            tokenizer,
            sentences,
        }
    }

    /// Model registry used for budgets
    pub fn limits(&self) -> &ModelLimits {
        &self.limits
    }

    /// Tokenizer used for counting
    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Token budget for `model`, see [`ModelLimits::effective_budget`]
    pub fn effective_budget(&self, model: &str, max_override: Option<usize>) -> Result<usize> {
        self.limits.effective_budget(model, max_override)
    }

    /// Count tokens in `text` for `model`
    pub fn count_tokens(&self, text: &str, model: &str) -> Result<usize> {
        self.tokenizer.count(text, model)
    }

    /// Whether `text` exceeds the effective budget
    pub fn must_split(&self, text: &str, model: &str, max_override: Option<usize>) -> Result<bool> {
        let budget = self.effective_budget(model, max_override)?;
        Ok(self.count_tokens(text, model)? > budget)
    }

    /// Split `text` into equal token windows.
    ///
    /// Text that fits comes back as a single chunk. Otherwise every window
    /// starts `chunk_len` tokens after the previous one and, with overlap,
    /// repeats the last `overlap` tokens of its predecessor.
    pub fn window_chunk(
        &self,
        text: &str,
        model: &str,
        max_override: Option<usize>,
        with_overlap: bool,
    ) -> Result<WindowChunks> {
        let budget = self.effective_budget(model, max_override)?;
        let tokens = self.tokenizer.encode(text, model)?;

        if tokens.len() <= budget {
            return Ok(WindowChunks::whole(Chunk::new(text, tokens.len())));
        }

        let layout = WindowLayout::new(tokens.len(), budget, with_overlap);
        debug!(
            model = %model,
            total_tokens = layout.total_tokens,
            chunks = layout.chunk_count,
            chunk_len = layout.chunk_len,
            overlap = layout.overlap,
            "Planned window chunks"
        );

        Ok(WindowChunks {
            state: WindowState::Sliding {
                tokenizer: Arc::clone(&self.tokenizer),
                model: model.to_string(),
                tokens,
                layout,
                start: 0,
            },
        })
    }

    /// Split `text` into chunks of whole sentences.
    ///
    /// Newlines are flattened to spaces first. Text shorter than the budget
    /// comes back as a single chunk. A sentence that alone reaches the budget
    /// ends the iteration with [`Error::SentenceTooLong`].
    pub fn sentence_chunk(
        &self,
        text: &str,
        model: &str,
        max_override: Option<usize>,
    ) -> Result<SentenceChunks> {
        let budget = self.effective_budget(model, max_override)?;

        let flattened = text.replace('\n', " ");
        let total_tokens = self.count_tokens(&flattened, model)?;

        if total_tokens < budget {
            return Ok(SentenceChunks::whole(Chunk::new(flattened, total_tokens)));
        }

        let chunk_count = total_tokens.div_ceil(budget);
        let target_len = total_tokens.div_ceil(chunk_count);
        let sentences = self.sentences.detect(&flattened);

        debug!(
            model = %model,
            total_tokens,
            budget,
            target_len,
            sentences = sentences.len(),
            "Planned sentence chunks"
        );

        Ok(SentenceChunks {
            state: SentenceState::Packing(Packer {
                tokenizer: Arc::clone(&self.tokenizer),
                model: model.to_string(),
                budget,
                target_len,
                sentences: sentences.into_iter(),
                current: Vec::new(),
                current_len: 0,
            }),
        })
    }
}

/// Lazy sequence of token windows, see [`ChunkPlanner::window_chunk`]
pub struct WindowChunks {
    state: WindowState,
}

enum WindowState {
    Whole(Option<Chunk>),
    Sliding {
        tokenizer: Arc<dyn Tokenizer>,
        model: String,
        tokens: Vec<TokenId>,
        layout: WindowLayout,
        start: usize,
    },
}

impl WindowChunks {
    fn whole(chunk: Chunk) -> Self {
        Self {
            state: WindowState::Whole(Some(chunk)),
        }
    }

    /// Layout of the split, `None` when the text fit as a single chunk
    pub fn layout(&self) -> Option<&WindowLayout> {
        match &self.state {
            WindowState::Whole(_) => None,
            WindowState::Sliding { layout, .. } => Some(layout),
        }
    }
}

impl Iterator for WindowChunks {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            WindowState::Whole(chunk) => chunk.take().map(Ok),
            WindowState::Sliding {
                tokenizer,
                model,
                tokens,
                layout,
                start,
            } => {
                if *start >= tokens.len() {
                    return None;
                }

                let end = (*start + layout.window_len()).min(tokens.len());
                let window = &tokens[*start..end];
                *start += layout.chunk_len;

                Some(
                    tokenizer
                        .decode(window, model)
                        .map(|text| Chunk::new(text, window.len())),
                )
            }
        }
    }
}

/// Lazy sequence of sentence-packed chunks, see [`ChunkPlanner::sentence_chunk`]
pub struct SentenceChunks {
    state: SentenceState,
}

enum SentenceState {
    Whole(Option<Chunk>),
    Packing(Packer),
    Done,
}

struct Packer {
    tokenizer: Arc<dyn Tokenizer>,
    model: String,
    budget: usize,
    target_len: usize,
    sentences: std::vec::IntoIter<String>,
    current: Vec<String>,
    current_len: usize,
}

impl Packer {
    /// Take the accumulated sentences as a chunk, if there are any
    fn flush(&mut self) -> Option<Chunk> {
        if self.current.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.current).join(" ");
        Some(Chunk::new(text, std::mem::take(&mut self.current_len)))
    }

    fn next_chunk(&mut self) -> Option<Result<Chunk>> {
        while let Some(sentence) = self.sentences.next() {
            let sentence_len = match self.tokenizer.count(&sentence, &self.model) {
                Ok(len) => len,
                Err(e) => return Some(Err(e)),
            };
            // +1 for the joining space
            let expected = self.current_len + 1 + sentence_len;

            // Stop short of the target instead of filling to the budget, so
            // chunks come out close to equal in size
            if expected <= self.budget
                && (expected as f64 - sentence_len as f64 / 2.0) < self.target_len as f64
            {
                self.current.push(sentence);
                self.current_len = expected;
            } else if sentence_len < self.budget {
                let flushed = self.flush();
                self.current.push(sentence);
                self.current_len = sentence_len;
                if let Some(chunk) = flushed {
                    return Some(Ok(chunk));
                }
            } else {
                return Some(Err(Error::SentenceTooLong {
                    tokens: sentence_len,
                    budget: self.budget,
                }));
            }
        }

        self.flush().map(Ok)
    }
}

impl SentenceChunks {
    fn whole(chunk: Chunk) -> Self {
        Self {
            state: SentenceState::Whole(Some(chunk)),
        }
    }
}

impl Iterator for SentenceChunks {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.state {
            SentenceState::Whole(chunk) => chunk.take().map(Ok),
            SentenceState::Packing(packer) => {
                let item = packer.next_chunk();
                if !matches!(item, Some(Ok(_))) {
                    self.state = SentenceState::Done;
                }
                item
            }
            SentenceState::Done => None,
        }
    }
}
