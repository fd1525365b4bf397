//! Text-fragment extraction from page content streams.
//!
//! Walks a page's decoded content operations, tracking the text state
//! (text/line matrices, font size, character/word spacing, the CTM stack),
//! and turns every text-showing operation into a [`TextRun`] with an
//! estimated bounding box. Runs that continue the same baseline are merged
//! into [`TextFragment`]s so a visual line split across several show
//! operations still counts as one fragment.
//!
//! Glyph widths are approximated from the font size rather than read from
//! font metrics; the resulting boxes are close enough for the layout
//! classification this crate performs.
//!
//! Image XObjects become graphic fragments. Form XObjects are replayed in
//! place under the invoking transform, so text drawn through a form still
//! reaches the detector; runs produced inside a form carry no page-stream
//! operation index.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use crate::document::{object_to_f64, PageSpace};
use crate::geometry::Rect;

/// Average glyph advance as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f64 = 0.5;

/// Kind of layout element a fragment was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// A run of shown text.
    Text,
    /// A placed image.
    Graphic,
}

/// A contiguous text run (or placed image) extracted from a page.
///
/// Coordinates are top-left-origin page points; `sequence` is the fragment's
/// page-local index in content-stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Bounding box in top-left page coordinates.
    pub rect: Rect,
    /// Decoded text. Empty for [`FragmentKind::Graphic`] fragments.
    pub text: String,
    /// Page-local extraction index.
    pub sequence: usize,
    /// Element kind.
    pub kind: FragmentKind,
}

impl TextFragment {
    /// Character count with surrounding whitespace trimmed away.
    pub fn stripped_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// One text-showing (or image-placing) operation with its estimated box.
#[derive(Debug, Clone)]
pub(crate) struct TextRun {
    /// Index of the operation in the decoded operation list. `None` for runs
    /// produced inside a form XObject, which a page-stream rewrite cannot
    /// address.
    pub op_index: Option<usize>,
    /// Index of the enclosing BT/ET block.
    pub block: usize,
    pub text: String,
    pub rect: Rect,
    /// Device-space font height, used as the merge gap unit.
    pub size: f64,
    /// Numeric `TJ` element reproducing this run's horizontal advance, for
    /// rewrites that remove the show operation itself.
    pub tj_adjustment: f64,
    pub kind: FragmentKind,
}

#[derive(Debug, Clone)]
struct TextState {
    text_matrix: [f64; 6],
    line_matrix: [f64; 6],
    font_size: f64,
    char_space: f64,
    word_space: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 0.0,
            char_space: 0.0,
            word_space: 0.0,
            horizontal_scale: 100.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Nesting cap for form XObjects that invoke further form XObjects.
const MAX_FORM_DEPTH: usize = 8;

/// Collects the text runs of a page in operation order.
///
/// `resources` is the page's resource dictionary, used to resolve XObjects:
/// image placements become graphic runs, form content is replayed where the
/// `Do` appears.
pub(crate) fn collect_text_runs(
    doc: &Document,
    operations: &[Operation],
    resources: Option<&Dictionary>,
    space: PageSpace,
) -> Vec<TextRun> {
    let collector = RunCollector {
        doc,
        resources,
        space,
        state: TextState::default(),
        ctm: IDENTITY,
        saved_ctm: Vec::new(),
        block: 0,
        form_depth: 0,
        runs: Vec::new(),
    };
    collector.run(operations)
}

struct RunCollector<'a> {
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    space: PageSpace,
    state: TextState,
    ctm: [f64; 6],
    saved_ctm: Vec<[f64; 6]>,
    block: usize,
    form_depth: usize,
    runs: Vec<TextRun>,
}

impl<'a> RunCollector<'a> {
    fn run(mut self, operations: &[Operation]) -> Vec<TextRun> {
        for (index, operation) in operations.iter().enumerate() {
            self.apply(Some(index), operation);
        }
        self.runs
    }

    fn apply(&mut self, index: Option<usize>, operation: &Operation) {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => {
                self.state.text_matrix = IDENTITY;
                self.state.line_matrix = IDENTITY;
            }
            "ET" => self.block += 1,
            "q" => self.saved_ctm.push(self.ctm),
            "Q" => {
                if let Some(matrix) = self.saved_ctm.pop() {
                    self.ctm = matrix;
                }
            }
            "cm" => {
                if let Some(matrix) = matrix_from(operands) {
                    self.ctm = multiply_matrix(&matrix, &self.ctm);
                }
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(object_to_f64) {
                    self.state.font_size = size;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(object_to_f64),
                    operands.get(1).and_then(object_to_f64),
                ) {
                    self.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(object_to_f64),
                    operands.get(1).and_then(object_to_f64),
                ) {
                    self.state.leading = -ty;
                    self.translate_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(matrix) = matrix_from(operands) {
                    self.state.line_matrix = matrix;
                    self.state.text_matrix = matrix;
                }
            }
            "T*" => self.next_line(),
            "TL" => {
                if let Some(leading) = operands.first().and_then(object_to_f64) {
                    self.state.leading = leading;
                }
            }
            "Tc" => {
                if let Some(spacing) = operands.first().and_then(object_to_f64) {
                    self.state.char_space = spacing;
                }
            }
            "Tw" => {
                if let Some(spacing) = operands.first().and_then(object_to_f64) {
                    self.state.word_space = spacing;
                }
            }
            "Tz" => {
                if let Some(scale) = operands.first().and_then(object_to_f64) {
                    self.state.horizontal_scale = scale;
                }
            }
            "Ts" => {
                if let Some(rise) = operands.first().and_then(object_to_f64) {
                    self.state.rise = rise;
                }
            }
            "Tj" => self.show(index, operands),
            "'" => {
                self.next_line();
                self.show(index, operands);
            }
            "\"" => {
                if operands.len() == 3 {
                    if let Some(word_space) = object_to_f64(&operands[0]) {
                        self.state.word_space = word_space;
                    }
                    if let Some(char_space) = object_to_f64(&operands[1]) {
                        self.state.char_space = char_space;
                    }
                    self.next_line();
                    self.show(index, &operands[2..]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    self.show(index, elements);
                }
            }
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    if let Some(stream) = self.resolve_xobject(name) {
                        match stream.dict.get(b"Subtype") {
                            Ok(Object::Name(kind)) if kind.as_slice() == b"Image" => {
                                self.place_image(index);
                            }
                            Ok(Object::Name(kind)) if kind.as_slice() == b"Form" => {
                                self.run_form(stream);
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn translate_line(&mut self, tx: f64, ty: f64) {
        let translate = [1.0, 0.0, 0.0, 1.0, tx, ty];
        self.state.line_matrix = multiply_matrix(&translate, &self.state.line_matrix);
        self.state.text_matrix = self.state.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.translate_line(0.0, -leading);
    }

    /// Shows the string/adjustment elements of one operation as a single run
    /// and advances the text matrix past it.
    fn show(&mut self, op_index: Option<usize>, elements: &[Object]) {
        let scale = self.state.horizontal_scale / 100.0;
        let device = multiply_matrix(&self.state.text_matrix, &self.ctm);
        let (start_x, start_y) = transform_point(0.0, self.state.rise, &device);
        let scale_x = device[0].hypot(device[1]);
        let scale_y = device[2].hypot(device[3]);

        let mut text = String::new();
        let mut advance = 0.0;
        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    let piece = decode_text_bytes(bytes);
                    advance += self.text_advance(&piece, scale);
                    text.push_str(&piece);
                }
                Object::Integer(_) | Object::Real(_) => {
                    if let Some(adjustment) = object_to_f64(element) {
                        advance -= adjustment / 1000.0 * self.state.font_size * scale;
                    }
                }
                _ => {}
            }
        }

        if advance != 0.0 {
            let translate = [1.0, 0.0, 0.0, 1.0, advance, 0.0];
            self.state.text_matrix = multiply_matrix(&translate, &self.state.text_matrix);
        }
        if text.is_empty() {
            return;
        }

        let width = advance * scale_x;
        let height = self.state.font_size * scale_y;
        let rect = self
            .space
            .to_top_left(start_x, start_y, start_x + width, start_y + height);
        // A TJ element of -advance*1000/(size*scale) displaces the text
        // matrix by exactly `advance` when replayed.
        let tj_adjustment = if advance != 0.0 && self.state.font_size != 0.0 {
            -advance * 1000.0 / (self.state.font_size * scale)
        } else {
            0.0
        };
        self.runs.push(TextRun {
            op_index,
            block: self.block,
            text,
            rect,
            size: height.abs().max(1.0),
            tj_adjustment,
            kind: FragmentKind::Text,
        });
    }

    /// Estimated advance of `piece` in unscaled text space.
    fn text_advance(&self, piece: &str, scale: f64) -> f64 {
        let mut advance = 0.0;
        for ch in piece.chars() {
            advance += self.state.font_size * GLYPH_WIDTH_FACTOR + self.state.char_space;
            if ch == ' ' {
                advance += self.state.word_space;
            }
        }
        advance * scale
    }

    fn resolve_xobject(&self, name: &[u8]) -> Option<&'a Stream> {
        let doc = self.doc;
        let resources = self.resources?;
        let xobjects = match resources.get(b"XObject").ok()? {
            Object::Dictionary(dict) => dict,
            Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
            _ => return None,
        };
        match xobjects.get(name).ok()? {
            Object::Stream(stream) => Some(stream),
            Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok(),
            _ => None,
        }
    }

    /// Replays a form XObject's content under the invoking transform. Runs
    /// produced here carry no operation index: the page stream only holds
    /// the `Do`, so they can be detected and painted over but not dropped.
    fn run_form(&mut self, stream: &'a Stream) {
        if self.form_depth >= MAX_FORM_DEPTH {
            return;
        }
        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let Ok(content) = Content::decode(&data) else {
            return;
        };

        let saved_ctm = self.ctm;
        let saved_resources = self.resources;
        if let Ok(Object::Array(values)) = stream.dict.get(b"Matrix") {
            if let Some(matrix) = matrix_from(values) {
                self.ctm = multiply_matrix(&matrix, &self.ctm);
            }
        }
        if let Some(resources) = form_resources(self.doc, stream) {
            self.resources = Some(resources);
        }

        self.form_depth += 1;
        for operation in &content.operations {
            self.apply(None, operation);
        }
        self.form_depth -= 1;
        self.resources = saved_resources;
        self.ctm = saved_ctm;
    }

    /// Records an image placement: the unit square mapped through the CTM.
    fn place_image(&mut self, op_index: Option<usize>) {
        let corners = [
            transform_point(0.0, 0.0, &self.ctm),
            transform_point(1.0, 0.0, &self.ctm),
            transform_point(0.0, 1.0, &self.ctm),
            transform_point(1.0, 1.0, &self.ctm),
        ];
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        self.runs.push(TextRun {
            op_index,
            block: self.block,
            text: String::new(),
            rect: self.space.to_top_left(min_x, min_y, max_x, max_y),
            size: 0.0,
            tj_adjustment: 0.0,
            kind: FragmentKind::Graphic,
        });
    }
}

/// Merges baseline-continuous runs into fragments.
///
/// Two consecutive text runs join when they belong to the same BT/ET block,
/// share a baseline, and the horizontal gap between them is at most one font
/// height. Larger jumps start a new fragment, so text visually separated
/// from the line it shares a baseline with (a right-edge stamp next to body
/// text, for instance) stays its own fragment.
pub(crate) fn merge_runs(runs: Vec<TextRun>) -> Vec<TextFragment> {
    const BASELINE_TOLERANCE: f64 = 1.0;
    const SPACE_GAP_FACTOR: f64 = 0.2;
    const MAX_BACKTRACK: f64 = 2.0;

    struct Pending {
        rect: Rect,
        text: String,
        block: usize,
        size: f64,
    }

    fn can_merge(pending: &Pending, run: &TextRun) -> bool {
        let gap = run.rect.x0 - pending.rect.x1;
        pending.block == run.block
            && (run.rect.y1 - pending.rect.y1).abs() <= BASELINE_TOLERANCE
            && gap >= -MAX_BACKTRACK
            && gap <= pending.size.max(run.size)
    }

    fn push_text(pending: Pending, fragments: &mut Vec<TextFragment>) {
        let sequence = fragments.len();
        fragments.push(TextFragment {
            rect: pending.rect,
            text: pending.text,
            sequence,
            kind: FragmentKind::Text,
        });
    }

    let mut fragments: Vec<TextFragment> = Vec::new();
    let mut pending: Option<Pending> = None;

    for run in runs {
        if run.kind == FragmentKind::Graphic {
            if let Some(previous) = pending.take() {
                push_text(previous, &mut fragments);
            }
            let sequence = fragments.len();
            fragments.push(TextFragment {
                rect: run.rect,
                text: String::new(),
                sequence,
                kind: FragmentKind::Graphic,
            });
            continue;
        }
        match pending.take() {
            Some(mut previous) if can_merge(&previous, &run) => {
                let gap = run.rect.x0 - previous.rect.x1;
                let unit = previous.size.max(run.size);
                if gap > SPACE_GAP_FACTOR * unit
                    && !previous.text.ends_with(' ')
                    && !run.text.starts_with(' ')
                {
                    previous.text.push(' ');
                }
                previous.text.push_str(&run.text);
                previous.rect = previous.rect.union(&run.rect);
                previous.size = unit;
                pending = Some(previous);
            }
            previous => {
                if let Some(previous) = previous {
                    push_text(previous, &mut fragments);
                }
                pending = Some(Pending {
                    rect: run.rect,
                    text: run.text,
                    block: run.block,
                    size: run.size,
                });
            }
        }
    }
    if let Some(previous) = pending {
        push_text(previous, &mut fragments);
    }
    fragments
}

fn matrix_from(operands: &[Object]) -> Option<[f64; 6]> {
    if operands.len() != 6 {
        return None;
    }
    let mut matrix = [0.0f64; 6];
    for (slot, operand) in matrix.iter_mut().zip(operands) {
        *slot = object_to_f64(operand)?;
    }
    Some(matrix)
}

/// The form's own resource dictionary, when it carries one. Forms without
/// a `/Resources` entry keep using the invoking page's resources.
fn form_resources<'a>(doc: &'a Document, stream: &'a Stream) -> Option<&'a Dictionary> {
    match stream.dict.get(b"Resources").ok()? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

/// Decodes string bytes as UTF-8, falling back to Latin-1.
fn decode_text_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Multiplies two transformation matrices (row-vector convention: the result
/// applies `a` first, then `b`).
pub(crate) fn multiply_matrix(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

/// Transforms a point by a matrix.
pub(crate) fn transform_point(x: f64, y: f64, matrix: &[f64; 6]) -> (f64, f64) {
    (
        matrix[0] * x + matrix[2] * y + matrix[4],
        matrix[1] * x + matrix[3] * y + matrix[5],
    )
}
