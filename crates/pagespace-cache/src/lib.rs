//! Process-local drive caches (C13).
//!
//! Both caches are keyed by `driveId`, hold drive-scope structural facts
//! only, and are invalidated explicitly by callers on the mutations that
//! invalidate them — neither cache polls or subscribes to change events.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod agent_cache;
pub mod error;
pub mod page_type;
pub mod tree_cache;

#[doc(inline)]
pub use agent_cache::{AgentCache, AiChatCandidate, VisibleAgentEntry};
#[doc(inline)]
pub use error::{CacheError, CacheResult};
#[doc(inline)]
pub use page_type::PageType;
#[doc(inline)]
pub use tree_cache::{TreeCache, TreeNode, TreeNodeRow};
