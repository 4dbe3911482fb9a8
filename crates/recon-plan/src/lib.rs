//! Test planning for source/target reconciliation.
//!
//! Reads the inclusion, exclusion, and endpoint-listing spreadsheets and expands
//! each templated endpoint row into concrete [`recon_types::TestCase`]s. Rows or
//! combinations that cannot produce a valid case are skipped with a recorded
//! [`SkipReason`]; nothing is emitted half-resolved.

mod catalog;
mod cells;
mod error;
mod exclusion;
mod generator;
mod inclusion;
mod table;

pub use catalog::*;
pub use cells::*;
pub use error::{InputError, SkipReason};
pub use exclusion::*;
pub use generator::*;
pub use inclusion::*;
pub use table::*;
