use super::request::CheckoutPayload;
use crate::error::{CheckoutError, Result};
use std::io::BufRead;

/// Reads checkout requests from a JSON-lines source, one object per line.
///
/// Blank lines are skipped. A malformed line yields an error item and does
/// not stop the stream.
pub struct RequestReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily reads and deserializes requests, so large batches are never
    /// held in memory at once.
    pub fn requests(self) -> impl Iterator<Item = Result<CheckoutPayload>> {
        self.source.lines().filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str(&line).map_err(CheckoutError::from)),
            Err(e) => Some(Err(CheckoutError::from(e))),
        })
    }
}
