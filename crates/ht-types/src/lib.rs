//! # ht-types
//!
//! Data model and error taxonomy shared by the hypertune crates.

pub mod errors;
pub mod observation;
pub mod params;

pub use errors::*;
pub use observation::*;
pub use params::*;
