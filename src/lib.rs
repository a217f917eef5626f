pub mod cache;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ner;
pub mod session;
pub mod wiki;

pub use config::Config;
pub use entity::{Candidate, EntityType, Span};
pub use error::{Result, WikitreeError};
pub use graph::{Edge, Graph, GraphSnapshot, Node, Scheduler, TraversalOptions};
pub use session::{Session, SessionStore};
