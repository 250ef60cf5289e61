pub mod config;
pub mod error;
pub mod template;
pub mod types;

pub use config::Config;
pub use error::{EnrichError, ProviderKind, Result};
pub use template::{render, validate_template, ENTITY_PLACEHOLDER};
pub use types::*;
