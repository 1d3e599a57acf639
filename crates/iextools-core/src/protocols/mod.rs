//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, tags and fixed lengths (source of truth)
//! - `parser`: decoding through a `ByteCursor` (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; the `source` module loads the capture
//! and the `analysis` layer drives the decoders.

pub(crate) mod common;
pub mod iextp;
pub mod link;
pub mod tops;
