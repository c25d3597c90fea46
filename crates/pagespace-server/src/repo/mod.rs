//! `sqlx`-backed implementations of every trait boundary the upstream
//! crates declare but do not implement themselves (per their own "the
//! server crate supplies this" doc comments).

pub mod activity;
pub mod chat;
pub mod page;
pub mod processor;
pub mod provider_settings;
pub mod quota;

#[doc(inline)]
pub use activity::{ActivityContext, ActivityEntry, PgActivityRepository};
#[doc(inline)]
pub use chat::PgMessageSink;
#[doc(inline)]
pub use page::PgPageRepository;
#[doc(inline)]
pub use processor::HttpProcessorClient;
#[doc(inline)]
pub use provider_settings::PgProviderSettingsStore;
#[doc(inline)]
pub use quota::{PgQuotaService, ThresholdMemoryMonitor};
