//! Upload admission (C12).
//!
//! [`admission::admit_upload`] runs the full pipeline: memory admission,
//! quota admission, per-tier semaphore acquisition, filename
//! sanitization, processor dispatch, sibling-position computation, and
//! `FILE` page insertion. Every external dependency is an injected trait;
//! this crate has no direct datastore or HTTP client of its own.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod admission;
pub mod counter;
pub mod error;
pub mod filename;
pub mod position;
pub mod processor;
pub mod semaphore;

#[doc(inline)]
pub use admission::{admit_upload, NewFilePage, PageWriter, ProcessingStatus, UploadRequest};
#[doc(inline)]
pub use counter::{ActiveUploadCounter, CounterGuard};
#[doc(inline)]
pub use error::{UploadError, UploadResult};
#[doc(inline)]
pub use filename::sanitize_filename;
#[doc(inline)]
pub use position::{compute_position, InsertPosition, PositionContext, SiblingPosition};
#[doc(inline)]
pub use processor::{MemoryMonitor, ProcessedFile, ProcessorClient, QuotaService, QuotaStatus, UploadPayload};
#[doc(inline)]
pub use semaphore::{UploadSemaphores, UploadSlot, UserTier};
