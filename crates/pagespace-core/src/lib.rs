//! # PageSpace Core
//!
//! Shared primitives for the AI orchestration and request-gateway core:
//! typed configuration loaded once at startup, the base error type, and the
//! timezone-aware timestamp helpers the prompt assembler depends on.
//!
//! Nothing in this crate talks to the database, the LLM provider, or HTTP —
//! it is the foundation layer every other `pagespace-*` crate builds on.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod config;
pub mod error;
pub mod ids;
pub mod redirect;
pub mod time;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{DriveId, PageId, StreamId, UserId};
pub use redirect::is_safe_return_url;
