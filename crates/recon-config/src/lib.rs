//! Run configuration for recon: the JSON test-data descriptor, `.env` files,
//! environment base-URL resolution, and credential resolution.
//!
//! Everything here is resolved once before any request is issued; failures are
//! reported as [`ConfigError`] and abort the run.

mod base_url;
mod credentials;
mod env_file;
mod error;
mod test_data;

pub use base_url::*;
pub use credentials::*;
pub use env_file::*;
pub use error::ConfigError;
pub use test_data::*;
