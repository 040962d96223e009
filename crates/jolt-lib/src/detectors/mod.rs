pub mod bouts;
pub mod peaks;

pub use bouts::{boundaries, segment, Bout, BoutConfig};
pub use peaks::{detect, Peak, PeakDetectionConfig};
