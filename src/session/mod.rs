//! Named, persistent container for one graph.

mod store;

pub use store::{SessionStore, SessionSummary};

use chrono::{DateTime, Utc};

use crate::graph::Graph;

/// One named graph plus the defaults it was grown with.
#[derive(Debug, Clone)]
pub struct Session {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_query: Option<String>,
    pub width: usize,
    pub depth: usize,
    pub graph: Graph,
}

impl Session {
    /// Fresh session with an empty graph.
    pub fn new(name: impl Into<String>, width: usize, depth: usize) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
            last_query: None,
            width,
            depth,
            graph: Graph::new(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
