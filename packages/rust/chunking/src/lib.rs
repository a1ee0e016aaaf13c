//! Overlapping fixed-size chunking of normalized documents.
//!
//! Documents are cut into windows of at most `max_size` characters. Each
//! window ends on the strongest boundary available inside it, trying
//! paragraph breaks, then line breaks, then spaces, and only then a raw
//! character cut. Consecutive windows share exactly `overlap` characters, so
//! dropping the first `overlap` characters of every chunk after the first and
//! concatenating reconstructs the original content.

mod splitter;

pub use splitter::{ChunkConfig, SEPARATORS, TextSplitter, chunk};
