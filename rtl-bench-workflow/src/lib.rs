pub mod accumulator;
pub mod engine;
pub mod executor;
pub mod extraction;
pub mod inference;
pub mod repetition;
pub mod stages;
pub mod toolchain;

pub use accumulator::*;
pub use engine::*;
pub use executor::*;
pub use extraction::*;
pub use inference::*;
pub use repetition::*;
pub use stages::*;
pub use toolchain::*;
