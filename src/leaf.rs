use crate::base::ElementId;
use crate::element::Element;
use crate::error::Error;
use crate::functional::*;

// Leaf element declarations. The shapes mirror the EBML leaf kinds: an
// unsigned integer is stored big-endian in the fewest bytes (an empty body
// yields the element default), a string is UTF-8 with optional zero padding
// at the tail, binary is kept verbatim.

macro_rules! uint_element {
    ($(#[$meta:meta])* $name:ident = $id:literal) => {
        uint_element!($(#[$meta])* $name = $id, default: 0, has_default: false);
    };
    ($(#[$meta:meta])* $name:ident = $id:literal, default: $default:literal) => {
        uint_element!($(#[$meta])* $name = $id, default: $default, has_default: true);
    };
    ($(#[$meta:meta])* $name:ident = $id:literal, default: $default:literal, has_default: $has_default:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl std::ops::Deref for $name {
            type Target = u64;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self($default)
            }
        }

        impl Element for $name {
            const ID: ElementId = ElementId($id);
            const HAS_DEFAULT_VALUE: bool = $has_default;

            fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
                if !buf.has_remaining() {
                    return Ok(Self::default());
                }
                let len = buf.remaining();
                if len > 8 {
                    return Err(Error::Corrupt("unsigned integer wider than 8 bytes"));
                }
                let mut value = [0u8; 8];
                value[8 - len..].copy_from_slice(buf.slice(len));
                buf.advance(len);
                Ok(Self(u64::from_be_bytes(value)))
            }

            fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
                let bytes = self.0.to_be_bytes();
                let first_non_zero = bytes
                    .iter()
                    .position(|&b| b != 0)
                    .unwrap_or(bytes.len() - 1);
                buf.append_slice(&bytes[first_non_zero..]);
                Ok(())
            }
        }
    };
}

macro_rules! string_element {
    ($(#[$meta:meta])* $name:ident = $id:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub String);

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Element for $name {
            const ID: ElementId = ElementId($id);

            fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
                let mut bytes = buf.slice(buf.remaining()).to_vec();
                buf.advance(bytes.len());
                // EBML strings may be zero-padded at the tail
                while bytes.last() == Some(&0) {
                    bytes.pop();
                }
                Ok(Self(String::from_utf8(bytes)?))
            }

            fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
                buf.append_slice(self.0.as_bytes());
                Ok(())
            }
        }
    };
}

macro_rules! binary_element {
    ($(#[$meta:meta])* $name:ident = $id:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub Vec<u8>);

        impl std::ops::Deref for $name {
            type Target = [u8];
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Element for $name {
            const ID: ElementId = ElementId($id);

            fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
                let bytes = buf.slice(buf.remaining()).to_vec();
                buf.advance(bytes.len());
                Ok(Self(bytes))
            }

            fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
                buf.append_slice(&self.0);
                Ok(())
            }
        }
    };
}

// EBML header children.

uint_element! {
    /// The version of EBML used to create the file.
    EbmlVersion = 0x4286
}
uint_element! {
    /// The minimum EBML version a reader has to support.
    EbmlReadVersion = 0x42F7
}
uint_element! {
    /// The maximum length of an EBML ID in bytes.
    EbmlMaxIdLength = 0x42F2, default: 4
}
uint_element! {
    /// The maximum length of an EBML size in bytes.
    EbmlMaxSizeLength = 0x42F3, default: 8
}
string_element! {
    /// The type of document, `matroska` or `webm` for this crate.
    DocType = 0x4282
}
uint_element! {
    /// The version of DocType interpreter used to create the file.
    DocTypeVersion = 0x4287
}
uint_element! {
    /// The minimum DocType version a reader has to support.
    DocTypeReadVersion = 0x4285
}

// SeekHead children.

binary_element! {
    /// The binary EBML ID of a Top-Level Element.
    SeekId = 0x53AB
}
uint_element! {
    /// Position of a Top-Level Element, relative to the Segment data.
    SeekPosition = 0x53AC
}

impl SeekId {
    /// The referenced element ID, when the payload is a well-formed 1–4
    /// byte ID.
    pub fn element_id(&self) -> Option<ElementId> {
        ElementId::from_be_slice(&self.0)
    }
}

impl From<ElementId> for SeekId {
    fn from(id: ElementId) -> Self {
        let size = id.encode_size();
        Self(id.0.to_be_bytes()[4 - size..].to_vec())
    }
}

// Targets children.

uint_element! {
    /// A number to indicate the logical level of the tag target: 70 is the
    /// whole collection, 50 an album, 30 a single track.
    TargetTypeValue = 0x68CA, default: 50
}
string_element! {
    /// An informational string of the tag target level, e.g. `ALBUM`.
    TargetType = 0x63CA
}
uint_element! {
    /// UID of a track the tag applies to.
    TagTrackUid = 0x63C5
}
uint_element! {
    /// UID of an edition the tag applies to.
    TagEditionUid = 0x63C9
}
uint_element! {
    /// UID of a chapter the tag applies to.
    TagChapterUid = 0x63C4
}
uint_element! {
    /// UID of an attachment the tag applies to.
    TagAttachmentUid = 0x63C6
}

// SimpleTag children.

string_element! {
    /// The name of the simple tag, e.g. `TITLE`.
    TagName = 0x45A3
}
string_element! {
    /// Language of the tag, in the Matroska languages form (`und`, `eng`).
    TagLanguage = 0x447A
}
string_element! {
    /// Language of the tag, in the BCP 47 form.
    TagLanguageBcp47 = 0x447B
}
uint_element! {
    /// Whether this is the default, original language of the tag.
    TagDefault = 0x4484, default: 1
}
string_element! {
    /// The tag value.
    TagString = 0x4487
}
binary_element! {
    /// The tag value, for binary payloads.
    TagBinary = 0x4485
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_bodies() {
        let test_pair = [
            (vec![1u8], 1u64),
            (vec![0u8], 0u64),
            (vec![0xFFu8], 255u64),
            (vec![0x01u8, 0], 256u64),
            (vec![0x01u8, 0xFF], 256u64 + 255),
            (vec![0xFFu8, 0xFFu8], 2u64.pow(16) - 1),
            (vec![1, 0, 0], 2u64.pow(16)),
            (vec![1, 0, 0, 0], 2u64.pow(24)),
            (vec![1, 0, 0, 0, 0, 0, 0, 0], 2u64.pow(56)),
            (vec![0xFF; 8], u64::MAX),
        ];
        for (encoded, decoded) in test_pair {
            let v = SeekPosition::decode_body(&mut &*encoded).unwrap();
            assert_eq!(v, SeekPosition(decoded));

            let mut buf = vec![];
            SeekPosition(decoded).encode_body(&mut buf).unwrap();
            assert_eq!(buf, encoded);
        }
    }

    #[test]
    fn test_uint_defaults() {
        assert_eq!(*TagDefault::decode_body(&mut &[][..]).unwrap(), 1);
        assert_eq!(*TargetTypeValue::decode_body(&mut &[][..]).unwrap(), 50);
        assert_eq!(*SeekPosition::decode_body(&mut &[][..]).unwrap(), 0);
        assert!(TargetTypeValue::HAS_DEFAULT_VALUE);
        assert!(!SeekPosition::HAS_DEFAULT_VALUE);
    }

    #[test]
    fn test_string_padding() {
        let v = TagName::decode_body(&mut &b"TITLE\0\0\0"[..]).unwrap();
        assert_eq!(&*v, "TITLE");

        // no trailing NUL on write
        let mut out = vec![];
        TagName("TITLE".into()).encode(&mut out).unwrap();
        assert_eq!(out, [&[0x45, 0xA3, 0x85][..], b"TITLE"].concat());
    }

    #[test]
    fn test_seek_id() {
        let tags = SeekId(vec![0x12, 0x54, 0xC3, 0x67]);
        assert_eq!(tags.element_id(), Some(ElementId(0x1254C367)));
        assert_eq!(SeekId::from(ElementId(0x1254C367)), tags);
        assert_eq!(SeekId(vec![]).element_id(), None);
        assert_eq!(SeekId::from(ElementId(0xEC)).0, vec![0xEC]);
    }
}
