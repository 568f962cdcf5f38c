//! Data layer: parsed exports, derived curves, and curve math.
//!
//! Architecture:
//! ```text
//!  Shift-JIS .csv export
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  table    │  split sub-tables, detect variant → Table
//!   └──────────┘
//!        │  (batch, subbatch)
//!        ▼
//!   ┌──────────┐
//!   │  model    │  RawCurve + Dimensions → Curve
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  curve    │  truncate, regression, extrema, integration
//!   └──────────┘
//! ```

pub mod curve;
pub mod model;
pub mod synthetic;
pub mod table;

pub use model::{Curve, Dimensions, RawCurve, SampleKey, SampleRef, TableId, Truncation};
pub use table::{Table, Variant};
