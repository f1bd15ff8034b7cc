use crate::Error;
use crate::base::*;
use crate::element::*;
use crate::functional::*;
use crate::leaf::*;
use crate::supplement::*;

// A helper for generating nested elements.
/* example:
nested! {
    required: [ TargetTypeValue ],
    optional: [ TargetType ],
    multiple: [ TagTrackUid ],
};
*/
macro_rules! nested {
    (required: [$($required:ident),*$(,)?], optional: [$($optional:ident),*$(,)?], multiple: [$($multiple:ident),*$(,)?],) => {
        paste::paste! {
            fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
                $( let mut [<$required:snake>] = None;)*
                $( let mut [<$optional:snake>] = None;)*
                $( let mut [<$multiple:snake>] = Vec::new();)*

                while let Some(header) = Header::decode_opt(buf)? {
                    if header.size.is_unknown {
                        return Err(Error::ElementBodySizeUnknown(header.id));
                    }
                    match header.id {
                        $( $required::ID => {
                            if [<$required:snake>].is_some() {
                                return Err(Error::DuplicateElement { id: header.id, parent: Self::ID });
                            } else {
                                [<$required:snake>] = Some($required::decode_element(&header, buf)?)
                            }
                        } )*
                        $( $optional::ID => {
                            if [<$optional:snake>].is_some() {
                                return Err(Error::DuplicateElement { id: header.id, parent: Self::ID });
                            } else {
                                [<$optional:snake>] = Some($optional::decode_element(&header, buf)?)
                            }
                        } )*
                        $( $multiple::ID => {
                            [<$multiple:snake>].push($multiple::decode_element(&header, buf)?);
                        } )*
                        Void::ID | ids::CRC32 => {
                            // padding is ignored, checksums are neither verified nor kept
                            let skip = *header.size as usize;
                            if buf.remaining() < skip {
                                return Err(Error::OutOfBounds);
                            }
                            buf.advance(skip);
                        }
                        _ => {
                            let skip = *header.size as usize;
                            if buf.remaining() < skip {
                                return Err(Error::OutOfBounds);
                            }
                            buf.advance(skip);
                            log::warn!("Unknown element {}({}b) in Element({})", header.id, *header.size, Self::ID);
                        }
                    }
                }

                Ok(Self {
                    $( [<$required:snake>]: [<$required:snake>].or(if $required::HAS_DEFAULT_VALUE { Some($required::default()) } else { None }).ok_or(Error::MissingElement($required::ID))?, )*
                    $( [<$optional:snake>], )*
                    $( [<$multiple:snake>], )*
                })
            }

            fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
                $( self.[<$required:snake>].encode(buf)?; )*
                $( self.[<$optional:snake>].encode(buf)?; )*
                $( self.[<$multiple:snake>].encode(buf)?; )*
                Ok(())
            }
        }
    };
}

/// EBML header, the first top-level element in a Matroska file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ebml {
    /// EBMLVersion element, indicates the version of EBML used.
    pub ebml_version: Option<EbmlVersion>,
    /// EBMLReadVersion element, the minimum version of EBML required to read the file.
    pub ebml_read_version: Option<EbmlReadVersion>,
    /// EBMLMaxIDLength element, the maximum length of an EBML ID in bytes.
    pub ebml_max_id_length: EbmlMaxIdLength,
    /// EBMLMaxSizeLength element, the maximum length of an EBML size in bytes.
    pub ebml_max_size_length: EbmlMaxSizeLength,
    /// DocType element. For Matroska files this is "matroska" or "webm".
    pub doc_type: Option<DocType>,
    /// DocTypeVersion element, the version of the document type.
    pub doc_type_version: Option<DocTypeVersion>,
    /// DocTypeReadVersion element, the minimum version required to read the file.
    pub doc_type_read_version: Option<DocTypeReadVersion>,
}

impl Element for Ebml {
    const ID: ElementId = ElementId(0x1A45_DFA3);
    nested! {
        required: [ EbmlMaxIdLength, EbmlMaxSizeLength ],
        optional: [ EbmlVersion, EbmlReadVersion, DocType, DocTypeVersion, DocTypeReadVersion ],
        multiple: [ ],
    }
}

impl Ebml {
    /// The DocType string, when the header carries one.
    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }
}

/// Contains seeking information of Top-Level Elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeekHead {
    /// Contains a single seek entry to an EBML Element.
    pub seek: Vec<Seek>,
}

impl Element for SeekHead {
    const ID: ElementId = ElementId(0x114D_9B74);
    nested! {
      required: [ ],
      optional: [ ],
      multiple: [ Seek ],
    }
}

/// Contains a single seek entry to an EBML Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seek {
    /// The binary EBML ID of a Top-Level Element.
    pub seek_id: SeekId,
    /// The Segment Position of a Top-Level Element.
    pub seek_position: SeekPosition,
}

impl Element for Seek {
    const ID: ElementId = ElementId(0x4DBB);
    nested! {
      required: [ SeekId, SeekPosition ],
      optional: [ ],
      multiple: [ ],
    }
}

/// Element containing metadata describing Tracks, Editions, Chapters,
/// Attachments, or the Segment as a whole. This is the collection the editor
/// reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tags {
    /// A single metadata descriptor.
    pub tag: Vec<Tag>,
}

impl Element for Tags {
    const ID: ElementId = ElementId(0x1254_C367);
    nested! {
      required: [ ],
      optional: [ ],
      multiple: [ Tag ],
    }
}

/// A single metadata descriptor: a Targets level plus its simple tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    /// Specifies which other elements the metadata applies to.
    pub targets: Targets,
    /// General information about the target.
    pub simple_tag: Vec<SimpleTag>,
}

impl Element for Tag {
    const ID: ElementId = ElementId(0x7373);
    nested! {
      required: [ Targets ],
      optional: [ ],
      multiple: [ SimpleTag ],
    }
}

/// Specifies which other elements the metadata represented by the Tag
/// applies to. An empty Targets means the Tag describes everything in the
/// Segment at the default ALBUM level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Targets {
    /// The logical level of the target, 50 (ALBUM) when absent.
    pub target_type_value: TargetTypeValue,
    /// An informational string of the target level.
    pub target_type: Option<TargetType>,
    /// UIDs of the tracks the Tag applies to.
    pub tag_track_uid: Vec<TagTrackUid>,
    /// UIDs of the editions the Tag applies to.
    pub tag_edition_uid: Vec<TagEditionUid>,
    /// UIDs of the chapters the Tag applies to.
    pub tag_chapter_uid: Vec<TagChapterUid>,
    /// UIDs of the attachments the Tag applies to.
    pub tag_attachment_uid: Vec<TagAttachmentUid>,
}

impl Element for Targets {
    const ID: ElementId = ElementId(0x63C0);
    const HAS_DEFAULT_VALUE: bool = true;
    nested! {
      required: [ TargetTypeValue ],
      optional: [ TargetType ],
      multiple: [ TagTrackUid, TagEditionUid, TagChapterUid, TagAttachmentUid ],
    }
}

/// General information about the target, a name/value pair that may nest.
///
/// Decoding and encoding are hand-rolled: the two language forms share one
/// slot with the last occurrence winning, and TagDefault is only written
/// when it deviates from the default of 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleTag {
    /// The name of the tag, e.g. `TITLE`.
    pub tag_name: TagName,
    /// Language of the tag. Omitted on write when unset; readers treat an
    /// absent language as `und`.
    pub tag_language: Option<TagLanguage>,
    /// Whether this is the default, original language of the tag.
    pub tag_default: TagDefault,
    /// The tag value, for text payloads.
    pub tag_string: Option<TagString>,
    /// The tag value, for binary payloads.
    pub tag_binary: Option<TagBinary>,
    /// Nested simple tags, qualifying the parent.
    pub simple_tag: Vec<SimpleTag>,
}

impl Element for SimpleTag {
    const ID: ElementId = ElementId(0x67C8);

    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let mut tag = Self::default();
        let mut named = false;

        while let Some(header) = Header::decode_opt(buf)? {
            if header.size.is_unknown {
                return Err(Error::ElementBodySizeUnknown(header.id));
            }
            match header.id {
                TagName::ID => {
                    tag.tag_name = TagName::decode_element(&header, buf)?;
                    named = true;
                }
                TagLanguage::ID => {
                    tag.tag_language = Some(TagLanguage::decode_element(&header, buf)?);
                }
                TagLanguageBcp47::ID => {
                    let lang = TagLanguageBcp47::decode_element(&header, buf)?;
                    tag.tag_language = Some(TagLanguage(lang.0));
                }
                TagDefault::ID => {
                    tag.tag_default = TagDefault::decode_element(&header, buf)?;
                }
                TagString::ID => {
                    tag.tag_string = Some(TagString::decode_element(&header, buf)?);
                }
                TagBinary::ID => {
                    tag.tag_binary = Some(TagBinary::decode_element(&header, buf)?);
                }
                Self::ID => {
                    tag.simple_tag.push(Self::decode_element(&header, buf)?);
                }
                Void::ID | ids::CRC32 => {
                    let skip = *header.size as usize;
                    if buf.remaining() < skip {
                        return Err(Error::OutOfBounds);
                    }
                    buf.advance(skip);
                }
                _ => {
                    let skip = *header.size as usize;
                    if buf.remaining() < skip {
                        return Err(Error::OutOfBounds);
                    }
                    buf.advance(skip);
                    log::warn!(
                        "Unknown element {}({}b) in Element({})",
                        header.id,
                        *header.size,
                        Self::ID
                    );
                }
            }
        }

        if !named {
            return Err(Error::MissingElement(TagName::ID));
        }
        Ok(tag)
    }

    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        if self.tag_name.is_empty() {
            return Err(Error::EmptyTagName);
        }
        self.tag_name.encode(buf)?;
        self.tag_language.encode(buf)?;
        if *self.tag_default == 0 {
            self.tag_default.encode(buf)?;
        }
        self.tag_string.encode(buf)?;
        self.tag_binary.encode(buf)?;
        self.simple_tag.encode(buf)?;
        Ok(())
    }
}

impl SimpleTag {
    /// A simple tag with a name and a text value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_name: TagName(name.into()),
            tag_string: Some(TagString(value.into())),
            ..Self::default()
        }
    }

    /// The tag name.
    pub fn name(&self) -> &str {
        &self.tag_name
    }

    /// The text value, when present.
    pub fn value(&self) -> Option<&str> {
        self.tag_string.as_deref()
    }

    /// Whether this is the default, original language of the tag.
    pub fn is_default(&self) -> bool {
        *self.tag_default != 0
    }

    /// Set the language of the tag.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.tag_language = Some(TagLanguage(language.into()));
    }

    /// Append a nested simple tag qualifying this one.
    pub fn push_nested(&mut self, nested: SimpleTag) {
        self.simple_tag.push(nested);
    }

    /// Depth-first search for the first text value under a matching name.
    /// Names compare ASCII case-insensitively.
    fn find_string(&self, name: &str) -> Option<&str> {
        if self.tag_name.eq_ignore_ascii_case(name) {
            if let Some(value) = self.value() {
                return Some(value);
            }
        }
        self.simple_tag.iter().find_map(|nested| nested.find_string(name))
    }
}

impl Tag {
    /// A tag bound to the given target type value (50 = ALBUM).
    pub fn new(target_type_value: u64) -> Self {
        Self {
            targets: Targets {
                target_type_value: TargetTypeValue(target_type_value),
                ..Targets::default()
            },
            simple_tag: Vec::new(),
        }
    }

    /// The logical level this tag applies to.
    pub fn target_type_value(&self) -> u64 {
        *self.targets.target_type_value
    }

    /// Append a simple tag.
    pub fn push_simple(&mut self, simple: SimpleTag) {
        self.simple_tag.push(simple);
    }

    /// Bind the tag to a track UID.
    pub fn add_track_uid(&mut self, uid: u64) {
        self.targets.tag_track_uid.push(TagTrackUid(uid));
    }

    fn is_album(&self) -> bool {
        self.target_type_value() == 50
    }
}

impl Tags {
    /// Append a tag at the given target type value and return it for
    /// population.
    pub fn add_tag(&mut self, target_type_value: u64) -> &mut Tag {
        self.tag.push(Tag::new(target_type_value));
        self.tag.last_mut().expect("just pushed")
    }

    /// The first text value whose simple tag name matches, searching tags in
    /// order and nested simple tags depth-first. Names compare ASCII
    /// case-insensitively.
    pub fn find_string(&self, name: &str) -> Option<&str> {
        self.tag
            .iter()
            .find_map(|tag| tag.simple_tag.iter().find_map(|st| st.find_string(name)))
    }

    /// Set a name/value pair at the ALBUM level (target type 50): every
    /// album-level simple tag with a matching name is updated; when none
    /// match the pair is appended to the first album-level tag, and when no
    /// album-level tag exists one is created.
    pub fn set_string(&mut self, name: &str, value: &str) {
        let mut updated = false;
        for tag in self.tag.iter_mut().filter(|t| t.is_album()) {
            for simple in tag
                .simple_tag
                .iter_mut()
                .filter(|st| st.tag_name.eq_ignore_ascii_case(name))
            {
                simple.tag_string = Some(TagString(value.to_owned()));
                simple.tag_binary = None;
                updated = true;
            }
        }
        if updated {
            return;
        }
        match self.tag.iter_mut().find(|t| t.is_album()) {
            Some(tag) => tag.push_simple(SimpleTag::new(name, value)),
            None => self.add_tag(50).push_simple(SimpleTag::new(name, value)),
        }
    }

    /// Remove every album-level simple tag with a matching name. Tags at
    /// other target levels are left alone; album tags left without simple
    /// tags are dropped.
    pub fn remove_string(&mut self, name: &str) {
        for tag in self.tag.iter_mut().filter(|t| t.is_album()) {
            tag.simple_tag
                .retain(|st| !st.tag_name.eq_ignore_ascii_case(name));
        }
        self.tag.retain(|t| !(t.is_album() && t.simple_tag.is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tags {
        let mut tags = Tags::default();
        let tag = tags.add_tag(50);
        tag.push_simple(SimpleTag::new("TITLE", "Night Drive"));
        tag.push_simple(SimpleTag::new("ARTIST", "The Framers"));
        let track = tags.add_tag(30);
        track.add_track_uid(0xDEAD_BEEF);
        track.push_simple(SimpleTag::new("TITLE", "Track One"));
        tags
    }

    #[test]
    fn roundtrip_canonical_order() {
        let tags = sample();
        let mut out = vec![];
        tags.encode(&mut out).unwrap();

        let back = Tags::decode(&mut &out[..]).unwrap();
        assert_eq!(back, tags);

        // Targets precede SimpleTags, TargetTypeValue is always present
        let mut body = vec![];
        tags.tag[0].encode_body(&mut body).unwrap();
        assert_eq!(&body[..2], &[0x63, 0xC0]);
        assert_eq!(&body[3..5], &[0x68, 0xCA]);
    }

    #[test]
    fn simple_tag_default_flag() {
        let mut st = SimpleTag::new("RATING", "5");
        let mut out = vec![];
        st.encode(&mut out).unwrap();
        // default of 1 is implied, not written
        assert!(!out.windows(2).any(|w| w == [0x44, 0x84]));

        st.tag_default = TagDefault(0);
        let mut out = vec![];
        st.encode(&mut out).unwrap();
        assert!(out.windows(2).any(|w| w == [0x44, 0x84]));

        let back = SimpleTag::decode(&mut &out[..]).unwrap();
        assert!(!back.is_default());
    }

    #[test]
    fn simple_tag_language_last_wins() {
        let mut body = vec![];
        TagName("TITLE".to_string()).encode(&mut body).unwrap();
        TagLanguage("eng".to_string()).encode(&mut body).unwrap();
        TagLanguageBcp47("de-DE".to_string()).encode(&mut body).unwrap();

        let st = SimpleTag::decode_body(&mut &body[..]).unwrap();
        assert_eq!(st.tag_language.as_deref(), Some("de-DE"));
    }

    #[test]
    fn simple_tag_requires_name() {
        let mut body = vec![];
        TagString("orphan".to_string()).encode(&mut body).unwrap();
        assert!(matches!(
            SimpleTag::decode_body(&mut &body[..]),
            Err(Error::MissingElement(id)) if id == TagName::ID
        ));

        let empty = SimpleTag::new("", "value");
        let mut out = vec![];
        assert!(matches!(empty.encode(&mut out), Err(Error::EmptyTagName)));
    }

    #[test]
    fn unknown_children_are_skipped() {
        let mut body = vec![];
        TagName("TITLE".to_string()).encode(&mut body).unwrap();
        // a ChapterTranslate element does not belong here
        body.extend_from_slice(&[0x69, 0x24, 0x82, 0x00, 0x00]);
        TagString("kept".to_string()).encode(&mut body).unwrap();

        let st = SimpleTag::decode_body(&mut &body[..]).unwrap();
        assert_eq!(st.value(), Some("kept"));
    }

    #[test]
    fn find_string_is_case_insensitive_and_ordered() {
        let tags = sample();
        assert_eq!(tags.find_string("title"), Some("Night Drive"));
        assert_eq!(tags.find_string("Artist"), Some("The Framers"));
        assert_eq!(tags.find_string("COMPOSER"), None);
    }

    #[test]
    fn set_string_updates_every_album_match() {
        let mut tags = sample();
        tags.tag[0].push_simple(SimpleTag::new("title", "Shadow Copy"));

        tags.set_string("TITLE", "Day Drive");
        let values: Vec<_> = tags.tag[0]
            .simple_tag
            .iter()
            .filter(|st| st.name().eq_ignore_ascii_case("TITLE"))
            .map(|st| st.value().unwrap().to_owned())
            .collect();
        assert_eq!(values, ["Day Drive", "Day Drive"]);
        // the track-level tag is untouched
        assert_eq!(tags.tag[1].simple_tag[0].value(), Some("Track One"));
    }

    #[test]
    fn set_string_creates_album_tag_when_missing() {
        let mut tags = Tags::default();
        tags.set_string("TITLE", "First");
        assert_eq!(tags.tag.len(), 1);
        assert_eq!(tags.tag[0].target_type_value(), 50);
        assert_eq!(tags.find_string("TITLE"), Some("First"));
    }

    #[test]
    fn remove_string_only_touches_album_level() {
        let mut tags = sample();
        tags.remove_string("TITLE");
        assert_eq!(tags.find_string("TITLE"), Some("Track One"));
        tags.remove_string("ARTIST");
        // the album tag lost its last simple tag and is dropped
        assert_eq!(tags.tag.len(), 1);
    }

    #[test]
    fn seek_head_roundtrip() {
        let head = SeekHead {
            seek: vec![Seek {
                seek_id: SeekId::from(Tags::ID),
                seek_position: SeekPosition(0x1234),
            }],
        };
        let mut out = vec![];
        head.encode(&mut out).unwrap();
        let back = SeekHead::decode(&mut &out[..]).unwrap();
        assert_eq!(back, head);
    }

    #[test]
    fn ebml_roundtrip() {
        let ebml_hex = [
            0x1A, 0x45, 0xDF, 0xA3, 0x93, 0x42, 0x82, 0x88, 0x6D, 0x61, 0x74, 0x72, 0x6F, 0x73,
            0x6B, 0x61, 0x42, 0x87, 0x81, 0x01, 0x42, 0x85, 0x81, 0x01,
        ];
        let ebml = Ebml::decode(&mut &ebml_hex[..]).unwrap();
        assert_eq!(ebml.doc_type(), Some("matroska"));
        assert_eq!(ebml.ebml_max_id_length, EbmlMaxIdLength(4));
        assert_eq!(ebml.ebml_max_size_length, EbmlMaxSizeLength(8));
        assert_eq!(ebml.doc_type_version, Some(DocTypeVersion(1)));
    }
}
