//! Listing projection and filtering.
//!
//! The projector is the pure core of the tool; the filter narrows its
//! output using the configured search bounds.

pub mod filter;
pub mod projector;

pub use filter::{RemoteSearchFilter, SearchFilter};
pub use projector::{project, InvalidRecordPolicy, ProjectOptions, Projection, ProjectionError};
