//! Two offline tools for the NYC 311 complaints dataset:
//!
//! - [`normalize`] remaps an arbitrary 311 CSV export onto the fixed
//!   ten-column canonical schema.
//! - [`bench`] runs a fixed battery of aggregate and full-text queries
//!   against MySQL and records timings, samples and plans per run tag.

pub mod bench;
pub mod error;
pub mod normalize;

pub use error::{Error, Result};
