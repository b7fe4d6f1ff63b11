mod gingleator;
mod optimizer;

pub use gingleator::{Gingleator, GingleatorScore};
pub use optimizer::SingleMetricOptimizer;
