//! The LLM transport stand-in: an asynchronous sequence of text
//! fragments with arbitrary boundaries, ending with end-of-stream.
//! Nothing beyond raw text is assumed about it.

use crate::session::SessionError;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, Stdin};

#[async_trait]
pub trait ChunkSource: Send {
    /// The next fragment of model output, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<String>, SessionError>;
}

/// Streams raw stdin, the way a piped model response arrives.
pub struct StdinSource {
    stdin: Stdin,
    buf: Vec<u8>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            buf: vec![0u8; 1024],
        }
    }
}

#[async_trait]
impl ChunkSource for StdinSource {
    async fn next_chunk(&mut self) -> Result<Option<String>, SessionError> {
        let n = self
            .stdin
            .read(&mut self.buf)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&self.buf[..n]).into_owned()))
    }
}

/// Feeds a fixed response in small fragments. Used by the one-shot CLI
/// mode (reading a saved response file) and by tests; the fragment size
/// is deliberately small so chunk-boundary handling is always exercised.
pub struct TextSource {
    remaining: String,
    chunk_size: usize,
}

impl TextSource {
    pub fn new(text: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            remaining: text.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl ChunkSource for TextSource {
    async fn next_chunk(&mut self) -> Result<Option<String>, SessionError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let mut split_at = self.chunk_size.min(self.remaining.len());
        while !self.remaining.is_char_boundary(split_at) {
            split_at += 1;
        }
        let rest = self.remaining.split_off(split_at);
        let chunk = std::mem::replace(&mut self.remaining, rest);
        Ok(Some(chunk))
    }
}
