//! Taskfeed Core Library
//!
//! Real-time synchronization core for a shared task list: a mutation
//! gateway writes through to a multi-writer document store, a change feed
//! pushes complete snapshots back, and a sync engine renders each snapshot
//! into the published view - either directly, or round-tripped through a
//! simulated remote task API that serves the same tasks in an alternate
//! schema.
//!
//! ## Overview
//!
//! ```text
//! MutationGateway ──▶ TaskStore ──▶ ChangeFeed ──▶ SyncEngine ──▶ TaskView
//!                                                     │  ▲
//!                                                     ▼  │ (api mode)
//!                                                   RemoteApi
//! ```
//!
//! The engine is the feed's sole subscriber and the only writer of the
//! published view. Mutations never touch the view locally; they surface
//! through the next snapshot.
//!
//! ## Quick Start
//!
//! ```ignore
//! use taskfeed_core::{DataMode, MutationGateway, SyncEngine, TaskStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = TaskStore::open("artifacts/app/public/data/tasks");
//!     let engine = SyncEngine::new();
//!     engine.start(&store);
//!
//!     let gateway = MutationGateway::new(store.clone());
//!     gateway.set_owner("session-abc");
//!     gateway.create_task("Buy milk")?;
//!
//!     let mut view = engine.subscribe_view();
//!     view.changed().await?;
//!     for task in &view.borrow().tasks {
//!         println!("{}: {}", if task.completed { "✓" } else { "○" }, task.text);
//!     }
//!
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod remote;
pub mod store;
pub mod translate;
pub mod types;

// Re-exports
pub use engine::{DataMode, SyncEngine, TaskView};
pub use error::{FeedError, FeedResult};
pub use feed::{ChangeFeed, Subscription};
pub use gateway::MutationGateway;
pub use remote::{RemoteApi, RemoteApiConfig, DEFAULT_API_ENDPOINT, SIMULATED_API_LATENCY};
pub use store::{Fields, RawRecord, TaskStore};
pub use translate::{ApiTask, TaskStatus};
pub use types::{Task, TaskId};
