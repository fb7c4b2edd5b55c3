//! Typed errors for the places where a caller can act on the failure kind.
//!
//! Query paths never return these: lookups degrade to empty results. Only
//! blob decoding and construction-time validation surface them.
use thiserror::Error;

/// Failure while decoding or encoding a persisted trie blob.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("trie blob is empty (zero bytes)")]
    Empty,

    #[error("trie blob has an unknown header")]
    BadMagic,

    #[error("trie blob format version {0} is not supported")]
    UnsupportedVersion(u32),

    #[error("trie blob failed to (de)compress: {0}")]
    Compression(#[from] std::io::Error),

    #[error("trie blob payload is malformed: {0}")]
    Codec(#[from] bincode::Error),

    /// A tree with no nodes or no words only comes out of a truncated or
    /// corrupt file, so it is rejected instead of loaded.
    #[error("trie blob decoded to an empty tree ({nodes} nodes, {words} words)")]
    EmptyTree { nodes: usize, words: usize },
}

/// Invalid settings detected when a component is constructed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("node capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("ranking weight `{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f32 },

    #[error("`{name}` must be at least 1")]
    ZeroLimit { name: &'static str },

    #[error("configuration could not be parsed: {0}")]
    Parse(String),
}
