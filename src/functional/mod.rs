//! Buffer plumbing for in-memory element coding.

mod buf;
mod coding;

pub use buf::*;
pub use coding::*;
