//! Enhanced suffix array indexing and linear-space affine-gap pairwise
//! alignment.
//!
//! `esa` provides on-disk ESA loading and bottom-up traversal
//! (suffix-prefix matching); `alignment::pairwise` provides Hirschberg-style
//! linear-space global and local aligners; `encoding` and `alphabets`
//! provide the two-bit sequence representation and multi-range alphabet
//! both of those build on.

pub mod alignment;
pub mod alphabets;
pub mod encoding;
pub mod error;
pub mod esa;
pub mod merger_trie;
pub mod query_match;
pub mod util;

pub use error::{EsaError, Result};
