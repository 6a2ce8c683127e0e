//! Free-text intent routing: resolve a query to exactly one capability and
//! invoke it once, converting any failure into a value.

pub mod router;

pub use router::{DispatchOutcome, Dispatcher};
