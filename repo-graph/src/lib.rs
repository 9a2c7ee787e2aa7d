//! Repository graph: in-memory store, head-worktree builder, and
//! graph-guided context retrieval.

pub mod builder;
pub mod retrieval;
pub mod store;

pub use builder::GraphBuilder;
pub use retrieval::{RetrievalConfig, find};
pub use store::GraphStore;
