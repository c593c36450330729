//! Async client for the DeepWiki repository Q&A service.
//!
//! The service answers questions about a GitHub repository asynchronously:
//! a POST submits the question under a client-generated query id, then GETs
//! against that id return an incremental response log until a terminal
//! `done` event appears. This crate owns that submit/poll/assemble cycle
//! and nothing else; command parsing and presentation belong to the host
//! chat platform.

pub mod client;
pub mod config;
pub mod error;
pub mod response;
pub mod transport;

pub use client::DeepWikiClient;
pub use config::{Config, PollErrorPolicy};
pub use error::DeepWikiError;
