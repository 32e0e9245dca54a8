//! Token counting, encoding and decoding per model
//!
//! The chunk planner only needs three things from a tokenizer: how many tokens
//! a string costs, the token ids themselves, and a way back from ids to text.
//! [`TiktokenTokenizer`] provides them for OpenAI-style BPE vocabularies.

use std::fmt;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::error::{Error, Result};

/// Token id as produced by [`Tokenizer::encode`]
pub type TokenId = u32;

/// Longest run of byte-level tokens a single UTF-8 character can span
const MAX_CHAR_TOKENS: usize = 4;

/// Model-aware tokenizer
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids for the given model
    fn encode(&self, text: &str, model: &str) -> Result<Vec<TokenId>>;

    /// Decode token ids back into text for the given model.
    ///
    /// A slice may start or end inside a multi-byte character; those bytes
    /// come back as U+FFFD instead of failing.
    fn decode(&self, tokens: &[TokenId], model: &str) -> Result<String>;

    /// Count tokens in a string
    fn count(&self, text: &str, model: &str) -> Result<usize> {
        Ok(self.encode(text, model)?.len())
    }
}

/// BPE vocabulary used for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// GPT-4 / GPT-3.5 vocabulary, also used to approximate other vendors
    Cl100kBase,
    /// GPT-4o and o-series vocabulary
    O200kBase,
}

impl Encoding {
    /// Pick the vocabulary for a model id.
    ///
    /// Accepts both bare ids ("gpt-4o") and OpenRouter ids ("openai/gpt-4o").
    pub fn for_model(model: &str) -> Self {
        let name = model.rsplit('/').next().unwrap_or(model).to_lowercase();

        if name.starts_with("gpt-4o")
            || name.starts_with("gpt-4.1")
            || name.starts_with("o1")
            || name.starts_with("o3")
            || name.starts_with("o4")
        {
            Encoding::O200kBase
        } else {
            Encoding::Cl100kBase
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
            Encoding::O200kBase => write!(f, "o200k_base"),
        }
    }
}

/// Tokenizer backed by tiktoken-rs
#[derive(Clone)]
pub struct TiktokenTokenizer {
    cl100k: Arc<CoreBPE>,
    o200k: Arc<CoreBPE>,
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encodings", &["cl100k_base", "o200k_base"])
            .finish()
    }
}

impl TiktokenTokenizer {
    /// Load both vocabularies
    pub fn new() -> Result<Self> {
        let cl100k = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::Tokenizer(format!("failed to load cl100k_base: {}", e)))?;
        let o200k = tiktoken_rs::o200k_base()
            .map_err(|e| Error::Tokenizer(format!("failed to load o200k_base: {}", e)))?;

        Ok(Self {
            cl100k: Arc::new(cl100k),
            o200k: Arc::new(o200k),
        })
    }

    fn bpe(&self, model: &str) -> &CoreBPE {
        match Encoding::for_model(model) {
            Encoding::Cl100kBase => &self.cl100k,
            Encoding::O200kBase => &self.o200k,
        }
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str, model: &str) -> Result<Vec<TokenId>> {
        Ok(self.bpe(model).encode_with_special_tokens(text))
    }

    fn decode(&self, tokens: &[TokenId], model: &str) -> Result<String> {
        let bpe = self.bpe(model);
        match bpe.decode(tokens.to_vec()) {
            Ok(text) => Ok(text),
            Err(e) => {
                debug!(model = %model, error = %e, "Falling back to lossy decode");
                Ok(decode_lossy(bpe, tokens))
            }
        }
    }
}

/// Decode token by token, joining the shortest run that forms whole
/// characters and replacing tokens that never complete one with U+FFFD
fn decode_lossy(bpe: &CoreBPE, tokens: &[TokenId]) -> String {
    let mut text = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let longest = MAX_CHAR_TOKENS.min(tokens.len() - i);
        let decoded = (1..=longest)
            .find_map(|len| bpe.decode(tokens[i..i + len].to_vec()).ok().map(|s| (s, len)));

        match decoded {
            Some((piece, len)) => {
                text.push_str(&piece);
                i += len;
            }
            None => {
                text.push(char::REPLACEMENT_CHARACTER);
                i += 1;
            }
        }
    }

    text
}
