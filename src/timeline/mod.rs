pub mod extractor;
pub mod scheme;

pub use extractor::{extract_timeline, TimelineError};
pub use scheme::ProbabilityScheme;
