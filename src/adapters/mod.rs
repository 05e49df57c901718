//! Adapters: concrete implementations of the domain ports.

pub mod sqlite;
pub mod summarizer;
