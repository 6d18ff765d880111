//! Layout and filter engine for an interactive technology-stack
//! visualization.
//!
//! The crate positions a cloud of labeled circular nodes around a fixed
//! anchor with iterative physics, derives per-node scale factors from
//! historical usage, and answers whole-word text/category queries over
//! an immutable record list with a bounded result cache. There is no
//! rendering here: a presentation layer drives [`sim::Simulation`] once
//! per frame and reads back position snapshots.

pub mod filter;
pub mod geom;
pub mod index;
pub mod records;
pub mod sim;
pub mod util;
pub mod weighting;

pub use filter::{FilterCache, filter_records, filter_records_cached, suggest_tag};
pub use index::{CategorySlice, SelectionIndex, category_summary};
pub use records::{Category, DatasetError, Record, Tag, load_records};
pub use sim::{Dimensions, NodePosition, NodeSpec, Phase, Simulation};
pub use weighting::{size_factors, usage_by_tag};
