use crate::base::ElementId;

/// Error types for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid variable-length integer encoding. A VINT longer than 8 bytes,
    /// or an element ID longer than 4 bytes.
    #[error("Invalid variable-length integer encoding")]
    InvalidVInt,

    /// A value does not fit a variable-length integer of the requested width.
    #[error("Value does not fit a {width}-byte variable-length integer")]
    VIntOverflow {
        /// The requested encoded width in bytes.
        width: usize,
    },

    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read past the end of the buffer")]
    OutOfBounds,

    /// Attempted to read past the end of the buffer during element body decoding.
    #[error("Element body over decode, ID: {0}")]
    OverDecode(ElementId),

    /// Not all bytes were consumed in an element body during element body decoding.
    #[error("Element body under decode, ID: {0}")]
    UnderDecode(ElementId),

    /// Missing element.
    #[error("Missing element, ID: {0}")]
    MissingElement(ElementId),

    /// Duplicate element in a master element.
    #[error("Duplicate element {id} in master element {parent}")]
    DuplicateElement {
        /// The duplicate element ID.
        id: ElementId,
        /// The parent master element ID.
        parent: ElementId,
    },

    /// Element body size is unknown where a bounded element is required.
    #[error("Element body size is unknown, ID: {0}")]
    ElementBodySizeUnknown(ElementId),

    /// A string element did not hold valid UTF-8.
    #[error("Invalid UTF-8 in string element")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The file ended before an element did.
    #[error("Unexpected end of file")]
    Truncated,

    /// The file does not start with an EBML header.
    #[error("Not an EBML file")]
    NotEbml,

    /// The EBML DocType is neither `matroska` nor `webm`.
    #[error("Unsupported DocType {0:?}, expected \"matroska\" or \"webm\"")]
    NotMatroska(String),

    /// The element structure contradicts the Matroska layout.
    #[error("Malformed element structure: {0}")]
    Corrupt(&'static str),

    /// A write was attempted on a file opened read-only.
    #[error("File is opened read-only")]
    ReadOnly,

    /// The file carries no Tags element.
    #[error("No Tags element present")]
    NoTags,

    /// No simple tag with the requested name exists.
    #[error("No tag named {0:?}")]
    TagNotFound(String),

    /// A simple tag with an empty name cannot be serialized.
    #[error("Simple tag has an empty name")]
    EmptyTagName,

    /// No placement strategy could fit the serialized tags into the file.
    #[error("Tags do not fit any placement slot")]
    NoSpace,
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
