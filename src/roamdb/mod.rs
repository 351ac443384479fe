//! Datalog query text and pull-result shapes for Roam graphs.

pub mod daily;
pub mod queries;
mod types;

pub use types::{normalize_blocks, parse_block, parse_entity_id, parse_page, Block, Page};

/// Pull selector that brings a whole subtree back in one call.
pub const SUBTREE_SELECTOR: &str = "[* {:block/children ...}]";
