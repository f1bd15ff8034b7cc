#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Error types for this crate.
mod error;
mod functional;
pub use error::*;

/// base types for EBML framing. ie. `VInt64`, `ElementId`, `Header`.
mod base;
/// Buffered seekable byte stream the editor drives.
pub mod stream;

// Element body definitions and traits.
mod element;
/// Element header framing over a seekable stream.
mod frame;
/// Leaf elements of the Matroska tagging vocabulary.
mod leaf;
/// Master elements: SeekHead, Tags and their children.
mod master;
/// Supplementary elements inherited from EBML. Void padding.
mod supplement;

/// Structure index of an open file: Segment bounds and top-level positions.
mod view;
/// Tag placement strategies for the write path.
mod writer;

/// The user-facing tag editor.
mod file;

/// A prelude for common types and traits.
pub mod prelude {
    pub use crate::base::*;
    pub use crate::element::*;
    pub use crate::file::*;
    pub use crate::frame::*;
    pub use crate::functional::{Buf, BufMut, Decode, Encode};
    pub use crate::leaf::*;
    pub use crate::master::*;
    pub use crate::stream::{BufStream, Medium};
    pub use crate::supplement::*;
    pub use crate::view::*;
}
