pub mod customer;
pub mod events;
pub mod loan;

pub use customer::*;
pub use events::*;
pub use loan::*;
