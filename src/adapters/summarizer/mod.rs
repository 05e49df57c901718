//! Summarizer adapters: the HTTP client used in production and a scripted
//! mock for tests.

pub mod http;
pub mod mock;

pub use http::HttpSummarizer;
pub use mock::{MockSummarizer, ScriptedReply};
