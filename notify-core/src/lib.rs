pub mod domain;
pub mod error;
pub mod projection;

pub use domain::*;
pub use error::*;
pub use projection::*;
