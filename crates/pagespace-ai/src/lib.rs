//! # pagespace-ai
//!
//! LLM provider resolution (C4), capability oracle (C5), prompt assembly
//! (C8), and attachment validation (C9) for the PageSpace AI gateway core.
//!
//! ## Architecture
//!
//! - `provider_factory` — resolves a user's effective provider/model and
//!   credential from the fixed provider enumeration.
//! - `capability` — vision/tool-calling capability lookup, memoized per
//!   `(provider, model)` for the process lifetime.
//! - `prompt` — assembles the nine-section system prompt and its
//!   per-section token estimate.
//! - `attachments` — validates inline image parts on user messages.
//! - `driver` — the provider-driver streaming contract this crate's
//!   resolution output feeds into; concrete drivers live in the server
//!   crate.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod attachments;
pub mod capability;
pub mod driver;
pub mod error;
pub mod prompt;
pub mod provider_factory;

#[doc(inline)]
pub use attachments::{validate_attachments, AttachmentValidation, FilePart};
#[doc(inline)]
pub use capability::CapabilityOracle;
#[doc(inline)]
pub use driver::{ChatDriver, DriverChunk, DriverMessage, DriverRequest};
#[doc(inline)]
pub use error::{AiError, AiResult};
#[doc(inline)]
pub use prompt::{assemble_prompt, AssembledPrompt, PromptContext, PromptInputs};
#[doc(inline)]
pub use provider_factory::{resolve_provider, Provider, ResolvedProvider};
