pub mod butterworth;

pub use butterworth::{apply, FilterConfig, SosFilter, SosSection};
