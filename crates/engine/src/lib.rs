//! Network-view obfuscation core.
//!
//! Keeps a synthetic, concurrently-mutable copy of voxel chunk data -- the
//! "network view" -- separate from authoritative storage. Sensitive blocks
//! (ores) are masked before a chunk is ever served; gameplay events reveal
//! the true values back into the view, cell by cell.
//!
//! This crate is game-agnostic: block identifiers are opaque, storage and
//! environment queries are traits, and masking policy is pluggable. The
//! game-specific layer (block tables, event wiring, configuration) lives in
//! the companion server crate.

pub mod modifier;
pub mod storage;
pub mod world;
