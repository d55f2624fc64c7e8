//! Audio decoding
//!
//! - `decoder`: symphonia-backed decoder adapter with pull-based reads
//! - `encoding`: source-encoding classification and transport format mapping
//! - `g711`: μ-law / A-law expansion used by the output transport

pub mod decoder;
pub mod encoding;
pub mod g711;

pub use decoder::{DecoderAdapter, SourceInfo};
pub use encoding::{ReadMode, SourceEncoding};
