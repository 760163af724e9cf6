pub mod error;
pub mod flatten;
pub mod index;
pub mod io;
pub mod layout;
pub mod logging;
pub mod model;
pub mod sync;
pub mod workspace;

pub use error::{Result, ToolError};
