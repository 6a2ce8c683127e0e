//! Generic fallback-ordering pattern: interchangeable techniques for one
//! logical operation, tried by priority until one succeeds.

pub mod chain;

pub use chain::{Strategy, StrategyChain, StrategyError};
