//! Pest warning math utilities.

pub mod math;

pub use math::linear::*;
pub use math::stable::*;
