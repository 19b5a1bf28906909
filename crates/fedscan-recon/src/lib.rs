//! Inventory reconciliation engine.
//!
//! Compares the object inventories held by two independently operated nodes:
//! a coordinating node's view (filtered to one member) against the member
//! node's own listing. The pipeline is fetch (paginated, retrying,
//! cancellable) -> index (duplicate-rejecting map) -> diff (pure set
//! differences) -> report (ordered, truncation-honest, text or JSON).

pub mod engine;
pub mod error;
pub mod fetch;
pub mod index;
pub mod report;

pub use engine::{diff, DiffResult, ReconcileOptions, Reconciler};
pub use error::{ReconError, ReconResult, Side};
pub use fetch::{fetch_all, FetchConfig, Progress};
pub use index::InventoryIndex;
pub use report::{DiffEntry, DiffSection, ReconReport};
