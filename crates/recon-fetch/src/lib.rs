//! Concurrent paired source/target fetching.
//!
//! [`ParallelFetcher`] issues both requests of a test case together and bounds
//! how many cases are in flight with a semaphore. Transport failures are
//! recorded per side on the [`recon_types::FetchResult`]; they never abort the
//! batch.

mod fetcher;
mod responses;
mod transport;

pub use fetcher::*;
pub use responses::*;
pub use transport::*;
