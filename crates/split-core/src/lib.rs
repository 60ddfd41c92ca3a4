mod error;
mod naming;
mod traits;
mod types;

pub use error::*;
pub use naming::*;
pub use traits::*;
pub use types::*;
