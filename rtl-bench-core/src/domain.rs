pub mod ids;
pub mod task;
pub mod trial;
pub mod tally;
pub mod sampling;
pub mod record;

pub use ids::*;
pub use task::*;
pub use trial::*;
pub use tally::*;
pub use sampling::*;
pub use record::*;
