pub mod pass_at_k;
pub mod aggregators;
pub mod replay;
pub mod statistical;

pub use pass_at_k::*;
pub use aggregators::*;
pub use replay::*;
pub use statistical::*;
