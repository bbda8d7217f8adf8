pub mod batch;
pub mod mappers;
pub mod services;

pub use batch::*;
pub use mappers::*;
pub use services::*;
