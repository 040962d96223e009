pub mod load;

pub use load::{summarize, BoutTiming, Report};
