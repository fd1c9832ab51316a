//! Hypsometric curves and their three-way intersection.
//!
//! ```text
//!  elevations (one series per rock category)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  binner   │  shared BandLayout → ElevationHistogram ×3
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  overlap  │  bands non-zero in all three → Overlap / OverlapRange
//!   └──────────┘
//! ```

pub mod binner;
pub mod overlap;

pub use binner::{BandLayout, ElevationHistogram};
pub use overlap::{Overlap, OverlapRange, locate_overlap, overlap_bands};
