//! Risk classification and alert gating.
//!
//! - `thresholds`: additive scoring of flood characteristics.
//! - `freshness`: whether a stored prediction is still current enough to
//!   suppress generating a new one.

pub mod freshness;
pub mod thresholds;
