mod assignment;
mod geographic;
mod partition;

pub use assignment::{Assignment, Flip, PartId};
pub use geographic::geographic_updaters;
pub use partition::Partition;
