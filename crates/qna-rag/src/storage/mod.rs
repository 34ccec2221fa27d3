//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for documents, embeddings, and the
//! selection set.

mod database;

pub use database::Database;
