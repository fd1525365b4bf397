//! Document handle over the `lopdf` container.
//!
//! [`PdfDocument`] owns the parsed document for the duration of one cleaning
//! pass and mediates every container access the rest of the crate needs:
//! ordered page ids, page geometry (with MediaBox inheritance through the
//! page tree), decoded content operations, and saving. It also defines the
//! mapping between PDF user space (bottom-left origin) and the top-left page
//! coordinates used everywhere else ([`PageSpace`]).

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Result, UnmarkError};
use crate::extraction::{self, TextFragment};
use crate::geometry::Rect;

/// An open PDF document.
pub struct PdfDocument {
    doc: Document,
}

impl PdfDocument {
    /// Opens and parses the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid PDF, or is
    /// encrypted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path)?;
        if doc.is_encrypted() {
            return Err(UnmarkError::Encrypted(path.to_path_buf()));
        }
        debug!(path = %path.display(), version = %doc.version, "opened document");
        Ok(Self { doc })
    }

    /// Parses a document from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid PDF or the document is
    /// encrypted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)?;
        if doc.is_encrypted() {
            return Err(UnmarkError::Encrypted("<memory>".into()));
        }
        Ok(Self { doc })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// The page rectangle in top-left coordinates, anchored at the origin.
    pub fn page_rect(&self, page_id: ObjectId) -> Result<Rect> {
        let space = self.page_space(page_id)?;
        Ok(Rect::page(space.width, space.height))
    }

    /// Extracts the page's text fragments in content-stream order.
    ///
    /// Fragment boxes are estimates derived from the text matrix and font
    /// size; they are accurate enough for layout classification but are not
    /// glyph-exact.
    pub fn extract_fragments(&self, page_id: ObjectId) -> Result<Vec<TextFragment>> {
        let space = self.page_space(page_id)?;
        let operations = self.page_operations(page_id)?;
        let resources = self.page_resources(page_id);
        let runs = extraction::collect_text_runs(&self.doc, &operations, resources, space);
        Ok(extraction::merge_runs(runs))
    }

    /// Writes the document to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UnmarkError::Save`] if serialization or the underlying write
    /// fails.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.doc
            .save(path)
            .map(|_| ())
            .map_err(|source| UnmarkError::Save {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Compacts the document before saving: drops unreachable objects,
    /// renumbers, and compresses stream contents.
    pub fn compact(&mut self) {
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();
    }

    pub(crate) fn inner(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn inner_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Decoded content operations of a page (all content streams
    /// concatenated).
    pub(crate) fn page_operations(&self, page_id: ObjectId) -> Result<Vec<Operation>> {
        let data = self.doc.get_page_content(page_id)?;
        let content = Content::decode(&data)
            .map_err(|err| UnmarkError::ContentStream(err.to_string()))?;
        Ok(content.operations)
    }

    /// The page's resource dictionary, following inheritance through the
    /// page tree.
    pub(crate) fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        match inherited_page_entry(&self.doc, page_id, b"Resources")? {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => self.doc.get_object(*id).ok()?.as_dict().ok(),
            _ => None,
        }
    }

    /// Resolves the page's effective MediaBox into a [`PageSpace`].
    pub(crate) fn page_space(&self, page_id: ObjectId) -> Result<PageSpace> {
        let media_box = inherited_page_entry(&self.doc, page_id, b"MediaBox")
            .ok_or_else(|| UnmarkError::PageGeometry("missing MediaBox".to_string()))?;
        let values = match media_box {
            Object::Array(values) => values.as_slice(),
            Object::Reference(id) => self.doc.get_object(*id)?.as_array()?.as_slice(),
            _ => {
                return Err(UnmarkError::PageGeometry(
                    "MediaBox is not an array".to_string(),
                ))
            }
        };
        if values.len() != 4 {
            return Err(UnmarkError::PageGeometry(format!(
                "MediaBox has {} entries, expected 4",
                values.len()
            )));
        }
        let mut n = [0.0f64; 4];
        for (slot, value) in n.iter_mut().zip(values) {
            *slot = object_to_f64(value).ok_or_else(|| {
                UnmarkError::PageGeometry("MediaBox entry is not a number".to_string())
            })?;
        }
        let space = PageSpace {
            origin_x: n[0].min(n[2]),
            origin_y: n[1].min(n[3]),
            width: (n[2] - n[0]).abs(),
            height: (n[3] - n[1]).abs(),
        };
        if space.width <= 0.0 || space.height <= 0.0 {
            return Err(UnmarkError::PageGeometry(format!(
                "degenerate MediaBox {:?}",
                n
            )));
        }
        Ok(space)
    }
}

/// Geometry of one page, used to map PDF user space onto top-left page
/// coordinates and back.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageSpace {
    /// MediaBox lower-left corner.
    pub origin_x: f64,
    pub origin_y: f64,
    /// Page size in points.
    pub width: f64,
    pub height: f64,
}

impl PageSpace {
    /// Converts a PDF user-space box (bottom-left origin, any corner order)
    /// to a normalized top-left rectangle.
    pub fn to_top_left(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        let (lo_x, hi_x) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (lo_y, hi_y) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Rect::new(
            lo_x - self.origin_x,
            self.height - (hi_y - self.origin_y),
            hi_x - self.origin_x,
            self.height - (lo_y - self.origin_y),
        )
    }

    /// Converts a top-left rectangle back into PDF user space, returned as
    /// `(x, y, width, height)` for drawing operations.
    pub fn to_pdf_box(&self, rect: &Rect) -> (f64, f64, f64, f64) {
        (
            rect.x0 + self.origin_x,
            self.origin_y + self.height - rect.y1,
            rect.width(),
            rect.height(),
        )
    }
}

/// Looks up `key` on the page dictionary, walking `Parent` links for
/// inheritable entries (`MediaBox`, `Resources`).
fn inherited_page_entry<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    // Parent chains in well-formed documents are short; the cap guards
    // against reference cycles.
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

/// Numeric coercion for container objects.
pub(crate) fn object_to_f64(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}
