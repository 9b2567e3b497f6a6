//! Core types for hourly ERA5-Land point extracts and the daily records
//! aggregated from them.

pub mod daily;
pub mod error;
pub mod gauge;
pub mod hour_range;
pub mod hourly;
pub mod location;
pub mod variable;

pub use error::{Era5Error, Result};
