//! Named-entity recognition over article text.

mod http;

pub use http::{chunk_text, HttpRecognizer};

use std::future::Future;

use crate::entity::Span;
use crate::Result;

/// NER collaborator.
pub trait EntityRecognizer {
    /// Tag `text`, returning spans in left-to-right order.
    ///
    /// Errors for which [`crate::WikitreeError::is_transient`] holds may be retried.
    fn extract_spans(&self, text: &str) -> impl Future<Output = Result<Vec<Span>>> + Send;
}
