//! A view of a Matroska file: Segment bounds and top-level element
//! positions, collected without loading Clusters into memory.

use crate::base::{ElementId, ids};
use crate::element::Element;
use crate::error::Error;
use crate::frame::ElementFrame;
use crate::master::{Ebml, SeekHead, Tags};
use crate::stream::{BufStream, Medium};
use crate::supplement::Void;

/// Bounds of the Segment element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBounds {
    /// Absolute offset of the first Segment header byte.
    pub offset: u64,
    /// Absolute offset of the first Segment content byte.
    pub data_offset: u64,
    /// Declared content size. When the size is unknown, the distance to the
    /// end of the file.
    pub size: u64,
    /// Whether the declared size was the unknown-size sentinel.
    pub size_unknown: bool,
}

impl SegmentBounds {
    /// Absolute offset one past the Segment content.
    pub fn end(&self) -> u64 {
        self.data_offset + self.size
    }
}

/// Absolute positions of the top-level elements the scan recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopPositions {
    /// Position of the SeekHead element.
    pub seek_head: Option<u64>,
    /// Position of the Info element.
    pub info: Option<u64>,
    /// Position of the Tracks element.
    pub tracks: Option<u64>,
    /// Position of the Cues element.
    pub cues: Option<u64>,
    /// Position of the Tags element.
    pub tags: Option<u64>,
    /// Position of the Chapters element.
    pub chapters: Option<u64>,
    /// Position of the Attachments element.
    pub attachments: Option<u64>,
    /// Position of the first Cluster.
    pub first_cluster: Option<u64>,
}

impl TopPositions {
    fn slot_mut(&mut self, id: ElementId) -> Option<&mut Option<u64>> {
        match id {
            SeekHead::ID => Some(&mut self.seek_head),
            ids::INFO => Some(&mut self.info),
            ids::TRACKS => Some(&mut self.tracks),
            ids::CUES => Some(&mut self.cues),
            Tags::ID => Some(&mut self.tags),
            ids::CHAPTERS => Some(&mut self.chapters),
            ids::ATTACHMENTS => Some(&mut self.attachments),
            _ => None,
        }
    }
}

/// A Void span reusable for tag placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoidSlot {
    /// Absolute offset of the Void header.
    pub offset: u64,
    /// Total span in bytes, header included.
    pub total_size: u64,
}

const POSITION_CACHE_CAP: usize = 16;

/// Small bounded cache of element positions the navigator has framed.
#[derive(Debug, Clone, Default)]
pub(crate) struct PositionCache {
    entries: Vec<(ElementId, u64, u64)>,
}

impl PositionCache {
    fn insert(&mut self, id: ElementId, offset: u64, total_size: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.0 == id) {
            *entry = (id, offset, total_size);
            return;
        }
        if self.entries.len() == POSITION_CACHE_CAP {
            self.entries.remove(0);
        }
        self.entries.push((id, offset, total_size));
    }

    fn get(&self, id: ElementId) -> Option<(u64, u64)> {
        self.entries
            .iter()
            .find(|e| e.0 == id)
            .map(|e| (e.1, e.2))
    }
}

/// Parsed structure of an open file: the EBML header, the Segment bounds,
/// the positions of the top-level elements and the largest reusable Void.
#[derive(Debug, Clone)]
pub struct MatroskaView {
    /// The decoded EBML header.
    pub ebml: Ebml,
    /// Bounds of the Segment.
    pub segment: SegmentBounds,
    /// Positions of the top-level elements.
    pub positions: TopPositions,
    /// The largest Void seen in the Segment prologue, if any.
    pub largest_void: Option<VoidSlot>,
    pub(crate) cache: PositionCache,
}

impl MatroskaView {
    /// Validate the EBML header, locate the Segment and index its children
    /// up to the first Cluster, then resolve the SeekHead.
    pub fn scan<S: Medium>(stream: &mut BufStream<S>) -> crate::Result<Self> {
        stream.seek_to(0);
        let head = ElementFrame::read(stream).map_err(|e| match e {
            Error::InvalidVInt | Error::Truncated => Error::NotEbml,
            e => e,
        })?;
        if head.id != Ebml::ID {
            return Err(Error::NotEbml);
        }
        if head.size_unknown {
            return Err(Error::Corrupt("EBML header of unknown size"));
        }
        let body = head.read_binary(stream)?;
        let ebml = Ebml::decode_body(&mut &body[..])?;
        match ebml.doc_type() {
            Some("matroska" | "webm") => {}
            other => return Err(Error::NotMatroska(other.unwrap_or_default().to_owned())),
        }

        stream.seek_to(head.end_offset);
        let seg = ElementFrame::read(stream)?;
        if seg.id != ids::SEGMENT {
            return Err(Error::Corrupt("Segment is not the second top-level element"));
        }
        let segment = SegmentBounds {
            offset: seg.header_offset,
            data_offset: seg.data_offset,
            size: seg.end_offset - seg.data_offset,
            size_unknown: seg.size_unknown,
        };

        let mut view = Self {
            ebml,
            segment,
            positions: TopPositions::default(),
            largest_void: None,
            cache: PositionCache::default(),
        };

        view.scan_prologue(stream)?;
        view.resolve_seek_head(stream)?;
        view.validate_tags_slot(stream)?;
        Ok(view)
    }

    /// Walk the Segment children in file order, recording positions, and
    /// stop at the first Cluster so media data is never read.
    fn scan_prologue<S: Medium>(&mut self, stream: &mut BufStream<S>) -> crate::Result<()> {
        stream.seek_to(self.segment.data_offset);
        while stream.position() < self.segment.end() {
            if skip_zero_gap(stream, self.segment.end())? {
                continue;
            }
            let frame = ElementFrame::read(stream)?;
            if frame.id == ids::CLUSTER {
                self.positions.first_cluster = Some(frame.header_offset);
                break;
            }
            if frame.id == Void::ID {
                let total = frame.total_size();
                if self.largest_void.is_none_or(|v| total > v.total_size) {
                    self.largest_void = Some(VoidSlot {
                        offset: frame.header_offset,
                        total_size: total,
                    });
                }
            } else if let Some(slot) = self.positions.slot_mut(frame.id) {
                if slot.is_none() {
                    *slot = Some(frame.header_offset);
                }
            }
            self.cache
                .insert(frame.id, frame.header_offset, frame.total_size());
            frame.skip(stream)?;
        }
        Ok(())
    }

    /// Parse the SeekHead and overwrite the scanned positions with the
    /// indexed ones, picking up elements that live past the first Cluster.
    fn resolve_seek_head<S: Medium>(&mut self, stream: &mut BufStream<S>) -> crate::Result<()> {
        let Some(offset) = self.positions.seek_head else {
            return Ok(());
        };
        stream.seek_to(offset);
        let frame = ElementFrame::read(stream)?;
        if frame.id != SeekHead::ID {
            return Err(Error::Corrupt("SeekHead position does not hold a SeekHead"));
        }
        let body = frame.read_binary(stream)?;
        let head = SeekHead::decode_body(&mut &body[..])?;
        for seek in &head.seek {
            let Some(id) = seek.seek_id.element_id() else {
                continue;
            };
            if id == SeekHead::ID {
                // chained SeekHeads are not followed
                continue;
            }
            let absolute = self.segment.data_offset + *seek.seek_position;
            if absolute >= stream.size() {
                log::warn!("SeekHead entry for {id} points past the end of the file");
                continue;
            }
            if let Some(slot) = self.positions.slot_mut(id) {
                *slot = Some(absolute);
            }
        }
        Ok(())
    }

    /// The recorded Tags position must frame a Tags element, and the
    /// reusable Void must not overlap its span.
    fn validate_tags_slot<S: Medium>(&mut self, stream: &mut BufStream<S>) -> crate::Result<()> {
        let Some(tags_offset) = self.positions.tags else {
            return Ok(());
        };
        stream.seek_to(tags_offset);
        let frame = ElementFrame::read(stream)?;
        if frame.id != Tags::ID {
            return Err(Error::Corrupt("Tags position does not hold a Tags element"));
        }
        if let Some(void) = self.largest_void {
            if void.offset < frame.end_offset && tags_offset < void.offset + void.total_size {
                self.largest_void = None;
            }
        }
        Ok(())
    }

    /// Stream the Segment children for the first element with the given ID,
    /// skipping Clusters by their declared size. Feeds and consults the
    /// position cache.
    pub fn find_element<S: Medium>(
        &mut self,
        stream: &mut BufStream<S>,
        target: ElementId,
    ) -> crate::Result<Option<ElementFrame>> {
        if let Some((offset, _)) = self.cache.get(target) {
            stream.seek_to(offset);
            let frame = ElementFrame::read(stream)?;
            if frame.id == target {
                return Ok(Some(frame));
            }
        }
        stream.seek_to(self.segment.data_offset);
        while stream.position() < self.segment.end() {
            if skip_zero_gap(stream, self.segment.end())? {
                continue;
            }
            let frame = ElementFrame::read(stream)?;
            self.cache
                .insert(frame.id, frame.header_offset, frame.total_size());
            if frame.id == target {
                return Ok(Some(frame));
            }
            if frame.size_unknown {
                log::warn!("stopping scan at unknown-size element {}", frame.id);
                return Ok(None);
            }
            frame.skip(stream)?;
        }
        Ok(None)
    }
}

/// Consume zero bytes at the current position, up to `limit`. A byte of
/// `0x00` cannot start an element; rewriting a slot can leave a single zero
/// byte of padding when the remainder is too small for a Void header.
/// Returns whether anything was skipped.
fn skip_zero_gap<S: Medium>(stream: &mut BufStream<S>, limit: u64) -> crate::Result<bool> {
    let mut skipped = false;
    let mut byte = [0u8; 1];
    while stream.position() < limit && stream.peek(&mut byte)? == 1 && byte[0] == 0 {
        stream.seek_to(stream.position() + 1);
        skipped = true;
    }
    if skipped {
        log::debug!("skipped zero padding before offset {}", stream.position());
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{Header, VInt64};
    use crate::functional::Encode;
    use crate::leaf::*;
    use crate::master::{Seek, SimpleTag};
    use std::io::Cursor;

    fn raw_element(id: ElementId, body: &[u8]) -> Vec<u8> {
        let mut out = vec![];
        Header {
            id,
            size: VInt64::new(body.len() as u64),
        }
        .encode(&mut out)
        .unwrap();
        out.extend_from_slice(body);
        out
    }

    fn ebml_bytes(doc: &str) -> Vec<u8> {
        let ebml = Ebml {
            ebml_version: Some(EbmlVersion(1)),
            ebml_read_version: Some(EbmlReadVersion(1)),
            doc_type: Some(DocType(doc.to_string())),
            doc_type_version: Some(DocTypeVersion(4)),
            doc_type_read_version: Some(DocTypeReadVersion(2)),
            ..Ebml::default()
        };
        let mut out = vec![];
        ebml.encode(&mut out).unwrap();
        out
    }

    fn info_stub() -> Vec<u8> {
        let mut body = vec![];
        Void::encode_exact(16, &mut body).unwrap();
        raw_element(ids::INFO, &body)
    }

    fn cluster_stub() -> Vec<u8> {
        raw_element(ids::CLUSTER, &[0xE7, 0x81, 0x00])
    }

    fn void_bytes(total: u64) -> Vec<u8> {
        let mut out = vec![];
        Void::encode_exact(total, &mut out).unwrap();
        out
    }

    fn tags_bytes() -> Vec<u8> {
        let mut tags = Tags::default();
        tags.add_tag(50).push_simple(SimpleTag::new("TITLE", "Scan Me"));
        let mut out = vec![];
        tags.encode(&mut out).unwrap();
        out
    }

    fn build_file(doc: &str, children: &[Vec<u8>]) -> Vec<u8> {
        let mut out = ebml_bytes(doc);
        let body = children.concat();
        out.extend_from_slice(&raw_element(ids::SEGMENT, &body));
        out
    }

    fn scan(data: Vec<u8>) -> crate::Result<(MatroskaView, BufStream<Cursor<Vec<u8>>>)> {
        let mut stream = BufStream::new(Cursor::new(data), false).unwrap();
        let view = MatroskaView::scan(&mut stream)?;
        Ok((view, stream))
    }

    #[test]
    fn records_positions_and_largest_void() {
        let info = info_stub();
        let void = void_bytes(4096);
        let tags = tags_bytes();
        let cluster = cluster_stub();
        let data = build_file("matroska", &[info.clone(), void.clone(), tags.clone(), cluster]);
        let (view, stream) = scan(data).unwrap();

        assert_eq!(view.ebml.doc_type(), Some("matroska"));
        let base = view.segment.data_offset;
        assert_eq!(view.positions.info, Some(base));
        assert_eq!(
            view.largest_void,
            Some(VoidSlot {
                offset: base + info.len() as u64,
                total_size: 4096
            })
        );
        let tags_offset = base + (info.len() + void.len()) as u64;
        assert_eq!(view.positions.tags, Some(tags_offset));
        assert_eq!(
            view.positions.first_cluster,
            Some(tags_offset + tags.len() as u64)
        );
        assert!(!view.segment.size_unknown);
        assert_eq!(view.segment.end(), stream.size());
    }

    #[test]
    fn rejects_non_ebml_and_foreign_doctypes() {
        assert!(matches!(
            scan(b"just some text, definitely not a container\n".to_vec()),
            Err(Error::NotEbml)
        ));
        assert!(matches!(
            scan(build_file("avi", &[info_stub()])),
            Err(Error::NotMatroska(d)) if d == "avi"
        ));
    }

    #[test]
    fn seek_head_overrides_scan_results() {
        // Tags live after the first Cluster; only the SeekHead finds them.
        let info = info_stub();
        let cluster = cluster_stub();
        let tags = tags_bytes();

        // SeekHead size must be known before positions can be computed, so
        // build it with a placeholder first.
        let make_head = |position: u64| {
            let head = SeekHead {
                seek: vec![Seek {
                    seek_id: SeekId::from(Tags::ID),
                    seek_position: SeekPosition(position),
                }],
            };
            let mut out = vec![];
            head.encode(&mut out).unwrap();
            out
        };
        let head_len = make_head(0).len();
        let tags_rel = (head_len + info.len() + cluster.len()) as u64;
        let head = make_head(tags_rel);
        assert_eq!(head.len(), head_len);

        let data = build_file("matroska", &[head, info, cluster, tags.clone()]);
        let (view, _) = scan(data).unwrap();

        assert_eq!(
            view.positions.tags,
            Some(view.segment.data_offset + tags_rel)
        );
        assert_eq!(
            view.positions.first_cluster,
            Some(view.segment.end() - tags.len() as u64 - cluster_stub().len() as u64)
        );
    }

    #[test]
    fn find_element_skips_clusters() {
        let info = info_stub();
        let cluster = cluster_stub();
        let tags = tags_bytes();
        let data = build_file("matroska", &[info, cluster, tags]);
        let (mut view, mut stream) = scan(data).unwrap();

        // not in the prologue, not indexed
        assert_eq!(view.positions.tags, None);

        let found = view
            .find_element(&mut stream, Tags::ID)
            .unwrap()
            .expect("tags present after the cluster");
        assert_eq!(found.id, Tags::ID);
        assert_eq!(found.end_offset, view.segment.end());

        // second lookup is served by the cache
        let again = view.find_element(&mut stream, Tags::ID).unwrap().unwrap();
        assert_eq!(again, found);
    }

    #[test]
    fn overlapping_void_record_is_dropped() {
        // SeekHead claims Tags sit where the scan saw the Void
        let info = info_stub();
        let void = void_bytes(64);
        let tags = tags_bytes();

        let make_head = |position: u64| {
            let head = SeekHead {
                seek: vec![Seek {
                    seek_id: SeekId::from(Tags::ID),
                    seek_position: SeekPosition(position),
                }],
            };
            let mut out = vec![];
            head.encode(&mut out).unwrap();
            out
        };
        let head_len = make_head(0).len();
        // point at the Tags element that replaced the void in a prior edit:
        // here Tags simply follow the Void, no overlap, record survives
        let tags_rel = (head_len + info.len() + void.len()) as u64;
        let data = build_file(
            "webm",
            &[make_head(tags_rel), info.clone(), void.clone(), tags.clone()],
        );
        let (view, _) = scan(data).unwrap();
        assert!(view.largest_void.is_some());

        // now the pointer lands inside the Void span (a Tags element buried
        // in the padding): the overlapping record is dropped
        let mut void_with_tags = void_bytes(128);
        void_with_tags[2..2 + tags.len()].copy_from_slice(&tags);
        let tags_rel = (head_len + info.len() + 2) as u64;
        let data = build_file("webm", &[make_head(tags_rel), info, void_with_tags]);
        let (view, _) = scan(data).unwrap();
        assert_eq!(view.positions.tags, Some(view.segment.data_offset + tags_rel));
        assert!(view.largest_void.is_none());
    }
}
