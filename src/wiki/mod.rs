//! Article text retrieval from Wikipedia.

mod client;
pub mod disambiguation;
pub mod sections;
pub mod summary;

pub use client::WikipediaClient;

use std::future::Future;

use crate::Result;

/// A resolved article: canonical title plus cleaned plaintext body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Plaintext without "See also", "References" and "External links" sections.
    pub body: String,
}

/// Text retrieval collaborator.
pub trait TextRetriever {
    /// Resolve `title` to an article, following redirects.
    ///
    /// When the title lands on a disambiguation page, `hint` (typically the
    /// referring article's body) picks among the alternatives. `Ok(None)`
    /// means the title does not resolve to any article.
    fn fetch_article(
        &self,
        title: &str,
        hint: Option<&str>,
    ) -> impl Future<Output = Result<Option<Article>>> + Send;
}
