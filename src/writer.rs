//! Placement of a serialized Tags element with the smallest possible byte
//! shift. Three strategies are tried in order: rewrite the existing Tags
//! slot (plus an adjacent Void), reuse the largest free Void, or append to
//! the Segment while patching its declared size.

use crate::base::{ElementId, VInt64, ids};
use crate::element::Element;
use crate::error::Error;
use crate::frame::ElementFrame;
use crate::functional::Encode;
use crate::leaf::{SeekId, SeekPosition};
use crate::master::{Seek, SeekHead, Tags};
use crate::stream::{BufStream, Medium};
use crate::supplement::Void;
use crate::view::MatroskaView;

/// Serialize `tags` and commit the first placement strategy that fits. A
/// successful commit ends with a flush. Only the chosen byte ranges are
/// touched; media data never moves.
pub(crate) fn store_tags<S: Medium>(
    stream: &mut BufStream<S>,
    view: &mut MatroskaView,
    tags: &Tags,
) -> crate::Result<()> {
    if !stream.is_writable() {
        return Err(Error::ReadOnly);
    }
    let mut payload = Vec::new();
    tags.encode(&mut payload)?;

    if try_in_place(stream, view, &payload)? {
        return Ok(());
    }
    if try_void_slot(stream, view, &payload)? {
        return Ok(());
    }
    append_to_segment(stream, view, &payload)
}

/// Strategy 1: the existing Tags span, extended by the single immediately
/// following Void (crossing any zero padding a previous 1-byte remainder
/// left), is rewritten in place. The Tags offset does not move and the file
/// size never changes.
fn try_in_place<S: Medium>(
    stream: &mut BufStream<S>,
    view: &mut MatroskaView,
    payload: &[u8],
) -> crate::Result<bool> {
    let Some(tags_offset) = view.positions.tags else {
        return Ok(false);
    };
    stream.seek_to(tags_offset);
    let old = ElementFrame::read(stream)?;
    if old.size_unknown {
        return Ok(false);
    }
    // the slot is the old Tags span, any stray zero padding left by a
    // 1-byte remainder, and at most the one Void immediately following
    let mut slot_end = old.end_offset;
    let mut byte = [0u8; 1];
    while slot_end < view.segment.end() {
        stream.seek_to(slot_end);
        if stream.peek(&mut byte)? == 1 && byte[0] == 0 {
            slot_end += 1;
        } else {
            break;
        }
    }
    if slot_end < view.segment.end() {
        stream.seek_to(slot_end);
        if let Ok(next) = ElementFrame::peek(stream) {
            if next.id == Void::ID && !next.size_unknown {
                slot_end = next.end_offset;
            }
        }
    }
    let slot = slot_end - tags_offset;
    if payload.len() as u64 > slot {
        log::debug!("tags ({}B) exceed the in-place slot ({slot}B)", payload.len());
        return Ok(false);
    }

    stream.seek_to(tags_offset);
    stream.write_all(payload)?;
    write_padding(stream, slot - payload.len() as u64)?;
    patch_seek_head(stream, view, tags_offset)?;
    stream.flush()?;
    log::debug!("tags rewritten in place at offset {tags_offset}");
    Ok(true)
}

/// Strategy 2: the largest free Void takes the new Tags. An old Tags
/// element, if any, is overwritten with padding of identical span so stale
/// metadata cannot shadow the new one.
fn try_void_slot<S: Medium>(
    stream: &mut BufStream<S>,
    view: &mut MatroskaView,
    payload: &[u8],
) -> crate::Result<bool> {
    let Some(slot) = view.largest_void else {
        return Ok(false);
    };
    if payload.len() as u64 > slot.total_size {
        log::debug!(
            "tags ({}B) exceed the largest void ({}B)",
            payload.len(),
            slot.total_size
        );
        return Ok(false);
    }
    let old_span = old_tags_span(stream, view)?;

    stream.seek_to(slot.offset);
    stream.write_all(payload)?;
    write_padding(stream, slot.total_size - payload.len() as u64)?;
    if let Some((old_offset, old_total)) = old_span {
        stream.seek_to(old_offset);
        write_padding(stream, old_total)?;
    }
    patch_seek_head(stream, view, slot.offset)?;
    stream.flush()?;

    view.positions.tags = Some(slot.offset);
    view.largest_void = None;
    log::debug!("tags moved into the void slot at offset {}", slot.offset);
    Ok(true)
}

/// Strategy 3: append at the Segment content end. The Segment size VINT is
/// re-encoded at its existing width; when the grown size no longer fits
/// that width the whole write is rejected with `NoSpace` before any byte is
/// touched.
fn append_to_segment<S: Medium>(
    stream: &mut BufStream<S>,
    view: &mut MatroskaView,
    payload: &[u8],
) -> crate::Result<()> {
    let append_offset = view.segment.end();

    let patch = if view.segment.size_unknown {
        None
    } else {
        let vint_offset = view.segment.offset + ids::SEGMENT.encode_size() as u64;
        stream.seek_to(vint_offset);
        let width = VInt64::length_from_first_byte(stream.read_byte()?);
        if width == 0 {
            return Err(Error::InvalidVInt);
        }
        let new_size = view.segment.size + payload.len() as u64;
        let mut encoded = Vec::new();
        match VInt64::new(new_size).encode_fixed(width, &mut encoded) {
            Ok(()) => Some((vint_offset, encoded)),
            Err(Error::VIntOverflow { .. }) => return Err(Error::NoSpace),
            Err(e) => return Err(e),
        }
    };

    let old_span = old_tags_span(stream, view)?;

    stream.seek_to(append_offset);
    stream.write_all(payload)?;

    // void out the stale Tags before the Segment is declared to cover the
    // appended bytes, narrowing the window in which both are live
    if let Some((old_offset, old_total)) = old_span {
        stream.seek_to(old_offset);
        write_padding(stream, old_total)?;
    }

    if let Some((vint_offset, encoded)) = patch {
        stream.seek_to(vint_offset);
        stream.write_all(&encoded)?;
    }
    view.segment.size += payload.len() as u64;

    patch_seek_head(stream, view, append_offset)?;
    stream.flush()?;

    view.positions.tags = Some(append_offset);
    log::debug!("tags appended at offset {append_offset}");
    Ok(())
}

/// The span of the currently recorded Tags element, if one exists and is
/// bounded.
fn old_tags_span<S: Medium>(
    stream: &mut BufStream<S>,
    view: &MatroskaView,
) -> crate::Result<Option<(u64, u64)>> {
    let Some(offset) = view.positions.tags else {
        return Ok(None);
    };
    stream.seek_to(offset);
    let frame = ElementFrame::read(stream)?;
    if frame.size_unknown {
        log::warn!("old Tags element has an unknown size and cannot be voided out");
        return Ok(None);
    }
    Ok(Some((offset, frame.total_size())))
}

/// Fill `gap` bytes at the current position with a Void element of exactly
/// that span. A gap of 1 cannot hold a Void header and becomes a single
/// zero byte; a gap of 0 writes nothing.
fn write_padding<S: Medium>(stream: &mut BufStream<S>, gap: u64) -> crate::Result<()> {
    if gap == 0 {
        return Ok(());
    }
    if gap == 1 {
        return stream.write_all(&[0]);
    }
    let (width, body) =
        Void::span_layout(gap).ok_or(Error::Corrupt("void span below the 2-byte minimum"))?;
    let mut header = Vec::new();
    Void::ID.encode(&mut header)?;
    VInt64::new(body).encode_fixed(width, &mut header)?;
    stream.write_all(&header)?;

    let zeros = [0u8; 8192];
    let mut remaining = body;
    while remaining > 0 {
        let n = remaining.min(zeros.len() as u64) as usize;
        stream.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Rewrite the SeekPosition content of the Seek entry referencing Tags,
/// preserving its encoded width. An entry too narrow for the new value is
/// left stale, and a missing entry is never inserted: both would require
/// shifting the bytes that follow.
fn patch_seek_head<S: Medium>(
    stream: &mut BufStream<S>,
    view: &MatroskaView,
    new_tags_offset: u64,
) -> crate::Result<()> {
    let Some(head_offset) = view.positions.seek_head else {
        return Ok(());
    };
    stream.seek_to(head_offset);
    let head = ElementFrame::read(stream)?;
    if head.id != SeekHead::ID || head.size_unknown {
        return Ok(());
    }

    let mut next = head.data_offset;
    while next < head.end_offset {
        stream.seek_to(next);
        let entry = ElementFrame::read(stream)?;
        if entry.size_unknown {
            break;
        }
        next = entry.end_offset;
        if entry.id != Seek::ID {
            continue;
        }

        let mut references_tags = false;
        let mut position_frame = None;
        let mut child_at = entry.data_offset;
        while child_at < entry.end_offset {
            stream.seek_to(child_at);
            let child = ElementFrame::read(stream)?;
            if child.size_unknown {
                break;
            }
            child_at = child.end_offset;
            if child.id == SeekId::ID {
                let raw = child.read_binary(stream)?;
                references_tags = ElementId::from_be_slice(&raw) == Some(Tags::ID);
            } else if child.id == SeekPosition::ID {
                position_frame = Some(child);
            }
        }
        if !references_tags {
            continue;
        }
        let Some(position) = position_frame else {
            return Ok(());
        };

        let relative = new_tags_offset - view.segment.data_offset;
        let width = position.size as usize;
        let fits = (1..=8).contains(&width) && (width == 8 || relative < 1u64 << (8 * width));
        if !fits {
            log::warn!("SeekHead Tags entry too narrow for position {relative}, left stale");
            return Ok(());
        }
        stream.seek_to(position.data_offset);
        stream.write_all(&relative.to_be_bytes()[8 - width..])?;
        return Ok(());
    }
    Ok(())
}
