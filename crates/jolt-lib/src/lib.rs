pub mod detectors;
pub mod error;
pub mod filters;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod signal;

pub use detectors::*;
pub use error::{JoltError, Result, Stage};
pub use filters::*;
pub use metrics::*;
pub use pipeline::*;
pub use signal::*;
