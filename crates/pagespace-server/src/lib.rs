//! HTTP gateway binary: wires C1-C13 into one axum application.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod chat_driver;
pub mod error;
pub mod middleware;
pub mod repo;
pub mod router;
pub mod routes;
pub mod state;

#[doc(inline)]
pub use chat_driver::{HttpChatDriver, LocalBaseUrls};
#[doc(inline)]
pub use error::ApiError;
#[doc(inline)]
pub use state::AppState;
