//! Background Jobs
//!
//! - `sweeper`: evicts expired entries from the in-memory stores
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handles = spawn_sweepers(state.sweep_schedule(), shutdown_rx);
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod sweeper;

pub use sweeper::{spawn_sweepers, sweep_task, SweepMetrics, SweepSnapshot};
