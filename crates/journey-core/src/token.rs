use std::fmt;

use serde::{Deserialize, Serialize};

/// A token produced by the external tokenizer or generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: u32,
    pub text: String,
    pub position: usize,
}

impl Token {
    pub fn new(id: u32, text: impl Into<String>, position: usize) -> Self {
        Self {
            id,
            text: text.into(),
            position,
        }
    }
}

/// Which instance pool a token is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    Input,
    Generated,
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCategory::Input => write!(f, "input"),
            TokenCategory::Generated => write!(f, "generated"),
        }
    }
}

/// Identity of an animated token.
///
/// Vocabulary ids repeat within a sequence, so identity is the category plus
/// the token's position in that category's list. Both lists only grow during
/// a generation, which keeps keys stable across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenKey {
    pub category: TokenCategory,
    pub position: usize,
}

impl TokenKey {
    pub fn input(position: usize) -> Self {
        Self {
            category: TokenCategory::Input,
            position,
        }
    }

    pub fn generated(position: usize) -> Self {
        Self {
            category: TokenCategory::Generated,
            position,
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.position)
    }
}

/// One attention sample: how strongly `query` attends to `key` in `layer`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttentionWeight {
    pub query: usize,
    pub key: usize,
    pub weight: f64,
    pub layer: usize,
}

/// A next-token candidate with its probability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub token: String,
    pub probability: f64,
    pub token_id: u32,
}

impl Candidate {
    pub fn new(token: impl Into<String>, probability: f64, token_id: u32) -> Self {
        Self {
            token: token.into(),
            probability,
            token_id,
        }
    }
}

/// Status of the external generation pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Tokenizing,
    Embedding,
    Inferring,
    Sampling,
    Complete,
}

impl GenerationStatus {
    /// Generated tokens pulse and glow only while the model is producing them.
    pub fn shows_generating_pulse(self) -> bool {
        self == GenerationStatus::Inferring
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Tokenizing => "tokenizing",
            GenerationStatus::Embedding => "embedding",
            GenerationStatus::Inferring => "inferring",
            GenerationStatus::Sampling => "sampling",
            GenerationStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}
