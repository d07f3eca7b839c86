//! Request handlers for timbre.
//!
//! [`TimbreService`] is the in-process surface a transport binds to: it
//! owns the shared similarity index and the descriptor extractor, and runs
//! every blocking step on tokio's blocking pool.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod handlers;
pub mod types;

pub use error::{ServiceError, ServiceResult};
pub use handlers::TimbreService;
pub use types::{
    AnalyzeBatchRequest, AnalyzeTrackRequest, AnalyzeTrackResponse, FindSimilarRequest,
    FindSimilarResponse, IndexItem, IndexItemsRequest, IndexItemsResponse,
};
