pub mod delinquency_batch;

pub use delinquency_batch::*;
