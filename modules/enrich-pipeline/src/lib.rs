pub mod extraction;
pub mod lookup;
pub mod orchestrator;
pub mod retry;
pub mod table;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use extraction::ExtractionProvider;
pub use lookup::LookupProvider;
pub use orchestrator::{Enricher, FailurePolicy};
pub use retry::RetryPolicy;
pub use table::Table;
pub use traits::WebSearcher;
