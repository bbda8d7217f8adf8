pub mod repository;
pub mod types;
pub mod utils;

pub use repository::*;
