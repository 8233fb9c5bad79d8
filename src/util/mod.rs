//! Utility types shared by every layer of the library:
//! - [`ScenePath`] - Absolute prim/property paths
//! - [`Error`] / [`Result`] - Error handling

mod error;
mod path;

pub use error::*;
pub use path::*;
