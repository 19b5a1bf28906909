//! Subcommand implementations

pub mod audit;
pub mod counts;
pub mod nodes;
pub mod reconcile;
