//! # pagespace-stream
//!
//! The abort registry (C10) and streaming chat orchestrator (C11) for the
//! PageSpace AI gateway core.
//!
//! `abort_registry` owns the process-local map from stream id to
//! cancellation handle, with IDOR-safe abort semantics and a lazily
//! started sweeper. `message` is the structured content envelope
//! persisted for both user and assistant messages. `orchestrator` drives
//! one chat turn end to end: attachment validation, prompt assembly,
//! effective tool-map construction, and chunk relay.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod abort_registry;
pub mod error;
pub mod message;
pub mod orchestrator;

#[doc(inline)]
pub use abort_registry::{AbortOutcome, AbortRegistry, STALE_ENTRY_TTL};
#[doc(inline)]
pub use error::{StreamError, StreamResult};
#[doc(inline)]
pub use message::{Envelope, MessagePart};
#[doc(inline)]
pub use orchestrator::{run_chat_turn, ChatTurnHandle, ChatTurnRequest, MessageSink, OrchestratorEvent};
