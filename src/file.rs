use crate::element::Element;
use crate::error::Error;
use crate::frame::ElementFrame;
use crate::master::Tags;
use crate::stream::{BufStream, Medium};
use crate::view::MatroskaView;
use crate::writer;
use std::fs::File;
use std::path::Path;

/// An open Matroska file: the structure index plus a lazily parsed tag
/// collection.
///
/// The context owns its stream exclusively; wrap it in external locking when
/// sharing across threads. The cached collection is dropped by every write,
/// so a read after a write re-parses the file instead of serving stale tags.
#[derive(Debug)]
pub struct TagFile<S: Medium = File> {
    stream: BufStream<S>,
    view: MatroskaView,
    cached_tags: Option<Tags>,
}

impl TagFile<File> {
    /// Open a Matroska file read-only.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::with_stream(BufStream::open(path)?)
    }

    /// Open a Matroska file for reading and in-place tag writing.
    pub fn open_rw(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::with_stream(BufStream::open_rw(path)?)
    }
}

impl<S: Medium> TagFile<S> {
    /// Drive any seekable medium, e.g. an in-memory buffer in tests.
    pub fn from_medium(medium: S, writable: bool) -> crate::Result<Self> {
        Self::with_stream(BufStream::new(medium, writable)?)
    }

    fn with_stream(mut stream: BufStream<S>) -> crate::Result<Self> {
        let view = MatroskaView::scan(&mut stream)?;
        Ok(Self {
            stream,
            view,
            cached_tags: None,
        })
    }

    /// The structure index built when the file was opened.
    pub fn view(&self) -> &MatroskaView {
        &self.view
    }

    /// Whether the file was opened for writing.
    pub fn is_writable(&self) -> bool {
        self.stream.is_writable()
    }

    /// Consume the editor and hand back the underlying medium.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn locate_tags(&mut self) -> crate::Result<u64> {
        if let Some(offset) = self.view.positions.tags {
            return Ok(offset);
        }
        // last resort: Tags may live past the first Cluster in a file whose
        // SeekHead does not index them
        match self.view.find_element(&mut self.stream, Tags::ID)? {
            Some(frame) => {
                self.view.positions.tags = Some(frame.header_offset);
                Ok(frame.header_offset)
            }
            None => Err(Error::NoTags),
        }
    }

    fn parse_tags(&mut self) -> crate::Result<Tags> {
        let offset = self.locate_tags()?;
        self.stream.seek_to(offset);
        let frame = ElementFrame::read(&mut self.stream)?;
        if frame.id != Tags::ID {
            return Err(Error::Corrupt("Tags position does not hold a Tags element"));
        }
        let body = frame.read_binary(&mut self.stream)?;
        Tags::decode_body(&mut &body[..])
    }

    /// The parsed tag collection, cached until the next write.
    pub fn read_tags(&mut self) -> crate::Result<&Tags> {
        if self.cached_tags.is_none() {
            let tags = self.parse_tags()?;
            self.cached_tags = Some(tags);
        }
        Ok(self.cached_tags.as_ref().expect("just parsed"))
    }

    /// The first text value under a matching name, searched across all tags
    /// at every target level, ASCII case-insensitively.
    pub fn read_tag_string(&mut self, name: &str) -> crate::Result<String> {
        let tags = self.read_tags()?;
        tags.find_string(name)
            .map(str::to_owned)
            .ok_or_else(|| Error::TagNotFound(name.to_owned()))
    }

    /// Replace the whole tag collection on disk and re-index the file.
    pub fn write_tags(&mut self, tags: &Tags) -> crate::Result<()> {
        self.cached_tags = None;
        writer::store_tags(&mut self.stream, &mut self.view, tags)?;
        // offsets moved; re-index instead of trusting patched state
        self.view = MatroskaView::scan(&mut self.stream)?;
        Ok(())
    }

    /// Set or remove a name/value pair at the ALBUM level and commit.
    /// `Some(value)` updates every album-level match and inserts when none
    /// exists; `None` removes every album-level match.
    pub fn set_tag_string(&mut self, name: &str, value: Option<&str>) -> crate::Result<()> {
        if !self.stream.is_writable() {
            return Err(Error::ReadOnly);
        }
        if name.is_empty() {
            return Err(Error::EmptyTagName);
        }
        let mut tags = match self.read_tags() {
            Ok(tags) => tags.clone(),
            // removing from a file without tags has nothing to do
            Err(Error::NoTags) if value.is_none() => return Ok(()),
            Err(Error::NoTags) => Tags::default(),
            Err(e) => return Err(e),
        };
        match value {
            Some(value) => tags.set_string(name, value),
            None => tags.remove_string(name),
        }
        self.write_tags(&tags)
    }

    /// Remove every album-level simple tag with the given name and commit.
    pub fn remove_tag(&mut self, name: &str) -> crate::Result<()> {
        self.set_tag_string(name, None)
    }
}
