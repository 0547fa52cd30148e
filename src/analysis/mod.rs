//! Statistics engine.
//!
//! Answers flow through the resolver into the aggregator, are rolled up into
//! the discipline tree, and are re-filtered by banca on demand.

pub mod aggregator;
pub mod filter;
pub mod normalize;
pub mod resolver;
pub mod rollup;
pub mod timeline;

pub use aggregator::aggregate;
pub use filter::{filter_by_banca, BancaSelection};
pub use timeline::ReportWindow;
