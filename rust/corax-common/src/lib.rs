//! Error type, `Result` alias and verification macros shared by the corax-*
//! crates.

pub mod error;
pub mod macros;
pub mod result;

pub use error::Error;
pub use result::Result;
