//! TenTackle: tensile test analysis for Shimadzu exports.
//!
//! ```text
//!   Table::open(path) ──► SelectionCache::cache(table, selection)
//!                               │            ▲
//!                               │            │ undo / redo
//!                               ▼            │
//!                         History (whole-selection snapshots)
//!                               │
//!              ┌────────────────┼─────────────────┐
//!              ▼                ▼                 ▼
//!        analyze()        get_curve()     take/restore_snapshot()
//! ```

pub mod analysis;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;

pub use analysis::{AnalysisReport, Metric, Statistic};
pub use cache::{RemovalScope, SampleSelection, SelectionCache};
pub use config::Config;
pub use data::{Curve, SampleRef, Table, TableId};
