//! Common utilities shared by the statsdog crates.
#![warn(missing_docs)]

mod retry;
pub mod serde;
pub mod time;

pub use crate::retry::*;
pub use crate::time::UnixTimestamp;
