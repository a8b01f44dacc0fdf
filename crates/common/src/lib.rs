//! Common types and traits shared across the rambler crates.
//!
//! This crate provides the fragment model every pipeline stage consumes,
//! the error type, and the traits for the two external collaborators
//! (thought enrichment and the optional remote relationship classifier).

pub mod error;
pub mod fragment;
pub mod traits;

pub use error::{RamblerError, Result};
pub use fragment::{now_millis, preview, Entity, EntityKind, Fragment};
pub use traits::{
    Relationship, RelationshipType, RemoteClassifier, Sentiment, ThoughtChunk, ThoughtEnricher,
};
