pub mod corpus;
pub mod generation;
pub mod staging;
pub mod reporting;

pub use corpus::*;
pub use generation::*;
pub use staging::*;
pub use reporting::*;
