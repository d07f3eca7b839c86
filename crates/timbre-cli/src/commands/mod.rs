pub mod analyze;
pub mod batch;
pub mod build;
pub mod config;
pub mod index;
pub mod similar;
pub mod status;
pub mod vectorize;

pub use analyze::run_analyze;
pub use batch::run_batch;
pub use build::run_build;
pub use index::run_index;
pub use similar::run_similar;
pub use status::show_status;
pub use vectorize::run_vectorize;
