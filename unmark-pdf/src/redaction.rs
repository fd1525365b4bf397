//! Content-stream redaction.
//!
//! [`redact_page`] blanks a set of rectangles on one page: text-show
//! operations whose estimated box overlaps a rectangle are dropped from the
//! content stream, each replaced by positioning operations that keep the
//! rest of the page where it was, opaque white fills are painted over every
//! rectangle, and (optionally) annotations riding inside the blanked area
//! are removed. The original operations are wrapped in `q`/`Q` so the fills
//! are never affected by graphics state the page left dangling.
//!
//! Rectangles are clamped to the page before use; rectangles that end up
//! empty are ignored. Overlap means positive area: content that exactly abuts
//! a rectangle edge is kept.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::document::{object_to_f64, PageSpace, PdfDocument};
use crate::error::Result;
use crate::extraction::{self, FragmentKind};
use crate::geometry::Rect;

/// Totals from redacting one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedactionOutcome {
    /// Text-show operations dropped from the content stream.
    pub text_runs_removed: usize,
    /// Annotations removed from the page.
    pub annotations_removed: usize,
}

/// Blanks `rects` (top-left page coordinates) on the given page.
///
/// Covered text shows are removed rather than merely painted over, so the
/// text does not survive in the file; graphics and images are left in place
/// and covered by the fill. When `remove_annotations` is set, annotations
/// whose `/Rect` overlaps a rectangle are dropped as well (watermark stamps
/// often carry a link annotation). Malformed annotations are kept.
///
/// # Errors
///
/// Returns an error if the page geometry is invalid or its content stream
/// cannot be decoded or re-encoded.
pub fn redact_page(
    document: &mut PdfDocument,
    page_id: ObjectId,
    rects: &[Rect],
    remove_annotations: bool,
) -> Result<RedactionOutcome> {
    let space = document.page_space(page_id)?;
    let page = Rect::page(space.width, space.height);
    let regions: Vec<Rect> = rects
        .iter()
        .map(|rect| rect.clamped_to(&page))
        .filter(|rect| !rect.is_empty())
        .collect();
    if regions.is_empty() {
        return Ok(RedactionOutcome::default());
    }

    let operations = document.page_operations(page_id)?;
    // Covered runs from inside a form XObject carry no operation index; the
    // fill covers them, only page-level shows are dropped.
    let dropped: HashMap<usize, f64> = {
        let resources = document.page_resources(page_id);
        extraction::collect_text_runs(document.inner(), &operations, resources, space)
            .into_iter()
            .filter(|run| run.kind == FragmentKind::Text)
            .filter(|run| regions.iter().any(|region| region.overlaps(&run.rect)))
            .filter_map(|run| run.op_index.map(|index| (index, run.tj_adjustment)))
            .collect()
    };

    let text_runs_removed = dropped.len();
    let rewritten = rewrite_operations(&operations, &dropped, &regions, space);
    replace_page_content(document, page_id, rewritten)?;

    let annotations_removed = if remove_annotations {
        sweep_annotations(document, page_id, &regions, space)
    } else {
        0
    };

    debug!(
        page = ?page_id,
        rects = regions.len(),
        dropped = text_runs_removed,
        annotations = annotations_removed,
        "redacted page"
    );
    Ok(RedactionOutcome {
        text_runs_removed,
        annotations_removed,
    })
}

/// Rebuilds the operation list: kept operations wrapped in `q`/`Q`, dropped
/// shows replaced by their positioning side effects, white fills appended so
/// they paint over everything else.
fn rewrite_operations(
    operations: &[Operation],
    dropped: &HashMap<usize, f64>,
    regions: &[Rect],
    space: PageSpace,
) -> Vec<Operation> {
    let mut rewritten = Vec::with_capacity(operations.len() + regions.len() * 2 + 5);
    rewritten.push(Operation::new("q", vec![]));
    for (index, operation) in operations.iter().enumerate() {
        if let Some(&tj_adjustment) = dropped.get(&index) {
            rewritten.extend(drop_replacements(operation, tj_adjustment));
        } else {
            rewritten.push(operation.clone());
        }
    }
    rewritten.push(Operation::new("Q", vec![]));

    rewritten.push(Operation::new("q", vec![]));
    rewritten.push(Operation::new(
        "rg",
        vec![1.0.into(), 1.0.into(), 1.0.into()],
    ));
    for region in regions {
        let (x, y, w, h) = space.to_pdf_box(region);
        rewritten.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        rewritten.push(Operation::new("f", vec![]));
    }
    rewritten.push(Operation::new("Q", vec![]));
    rewritten
}

/// Positioning side effects of a dropped show operation. `'` and `"` move to
/// the next line (and `"` sets spacing) before showing; those effects must
/// survive or every later line on the page would shift. Every show also
/// advances the text matrix, so a numeric `TJ` element reproducing that
/// advance is emitted in its place, otherwise a following show on the same
/// line would slide back into the blanked area.
fn drop_replacements(operation: &Operation, tj_adjustment: f64) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(4);
    match operation.operator.as_str() {
        "'" => ops.push(Operation::new("T*", vec![])),
        "\"" => {
            if let Some(word_space) = operation.operands.first() {
                ops.push(Operation::new("Tw", vec![word_space.clone()]));
            }
            if let Some(char_space) = operation.operands.get(1) {
                ops.push(Operation::new("Tc", vec![char_space.clone()]));
            }
            ops.push(Operation::new("T*", vec![]));
        }
        _ => {}
    }
    if tj_adjustment != 0.0 {
        ops.push(Operation::new(
            "TJ",
            vec![Object::Array(vec![tj_adjustment.into()])],
        ));
    }
    ops
}

/// Encodes `operations` into a fresh stream object and points the page's
/// `Contents` at it, superseding any previous stream chain.
fn replace_page_content(
    document: &mut PdfDocument,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<()> {
    let data = Content { operations }.encode()?;
    let doc = document.inner_mut();
    let stream_id = doc.add_object(Stream::new(dictionary! {}, data));
    let page_dict = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut())?;
    page_dict.set("Contents", Object::Reference(stream_id));
    Ok(())
}

/// Removes annotations whose `/Rect` overlaps a redaction region. Returns
/// the number removed; the `Annots` entry is rewritten only when that count
/// is positive.
fn sweep_annotations(
    document: &mut PdfDocument,
    page_id: ObjectId,
    regions: &[Rect],
    space: PageSpace,
) -> usize {
    let annots: Vec<Object> = {
        let doc = document.inner();
        let Ok(page) = doc.get_object(page_id).and_then(|o| o.as_dict()) else {
            return 0;
        };
        match page.get(b"Annots") {
            Ok(Object::Array(values)) => values.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id).and_then(|o| o.as_array()) {
                Ok(values) => values.clone(),
                Err(_) => return 0,
            },
            _ => return 0,
        }
    };

    let mut kept = Vec::with_capacity(annots.len());
    let mut removed = 0usize;
    for annot in annots {
        match annotation_rect(document.inner(), &annot, space) {
            Some(rect) if regions.iter().any(|region| region.overlaps(&rect)) => removed += 1,
            _ => kept.push(annot),
        }
    }
    if removed == 0 {
        return 0;
    }

    let doc = document.inner_mut();
    match doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
        Ok(page_dict) => {
            page_dict.set("Annots", Object::Array(kept));
            removed
        }
        Err(_) => 0,
    }
}

/// The annotation's `/Rect` in top-left page coordinates, or `None` when the
/// annotation is malformed.
fn annotation_rect<'a>(doc: &'a Document, annot: &'a Object, space: PageSpace) -> Option<Rect> {
    let dict = match annot {
        Object::Dictionary(dict) => dict,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        _ => return None,
    };
    let values: &[Object] = match dict.get(b"Rect").ok()? {
        Object::Array(values) => values,
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        _ => return None,
    };
    if values.len() != 4 {
        return None;
    }
    let mut n = [0.0f64; 4];
    for (slot, value) in n.iter_mut().zip(values) {
        *slot = resolve_f64(doc, value)?;
    }
    Some(space.to_top_left(n[0], n[1], n[2], n[3]))
}

/// Numeric coercion following one level of indirection.
fn resolve_f64(doc: &Document, object: &Object) -> Option<f64> {
    match object {
        Object::Reference(id) => object_to_f64(doc.get_object(*id).ok()?),
        other => object_to_f64(other),
    }
}
