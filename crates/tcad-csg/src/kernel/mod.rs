//! Boolean kernel abstraction

mod traits;

pub use traits::*;
