//! Watermark-candidate detection
//!
//! This module classifies a page's extracted text fragments into body
//! content versus likely watermark stamps, purely from layout geometry.
//! Injected stamps ("© site.com" and friends) share a recognizable shape:
//! short text, hugging the right edge, well away from the document's real
//! content. The detector turns every fragment matching that shape into a
//! redaction rectangle; it never looks at what the text says.
//!
//! Two classification policies are available:
//!
//! - [`DetectionPolicy::PositionBased`] (default) anchors on the last line
//!   of body content: only short right-side fragments at or below it become
//!   candidates. No distance threshold to mistune, robust across font sizes.
//! - [`DetectionPolicy::DistanceBased`] is the earlier rule, kept for
//!   compatibility with outputs produced by prior runs: short right-side
//!   fragments qualify when they keep a minimum gap from every body block.
//!
//! # Usage
//!
//! ```
//! use unmark_pdf::detector::WatermarkDetector;
//! use unmark_pdf::extraction::{FragmentKind, TextFragment};
//! use unmark_pdf::geometry::Rect;
//!
//! let page = Rect::page(612.0, 792.0);
//! let fragments = vec![
//!     TextFragment {
//!         rect: Rect::new(50.0, 90.0, 540.0, 700.0),
//!         text: "body ".repeat(40),
//!         sequence: 0,
//!         kind: FragmentKind::Text,
//!     },
//!     TextFragment {
//!         rect: Rect::new(500.0, 710.0, 590.0, 720.0),
//!         text: "© example.com".to_string(),
//!         sequence: 1,
//!         kind: FragmentKind::Text,
//!     },
//! ];
//!
//! let detector = WatermarkDetector::new();
//! let rects = detector.detect(&fragments, &page);
//! assert_eq!(rects.len(), 1);
//! ```

use crate::extraction::{FragmentKind, TextFragment};
use crate::geometry::Rect;

/// Classification rule used to separate body content from watermark stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionPolicy {
    /// Candidates must sit on the right side at or below the bottom edge of
    /// the last body line. Body content is every non-empty text fragment
    /// starting left of the body-zone threshold.
    PositionBased,
    /// Candidates must sit in the right column below the header area, fit
    /// the size guards, and keep [`DetectorOptions::isolation_distance`]
    /// from every body block. Body content is every text fragment of at
    /// least [`DetectorOptions::body_min_chars`] stripped characters.
    DistanceBased,
}

impl DetectionPolicy {
    /// Returns true for the position-based rule.
    pub fn is_position_based(&self) -> bool {
        matches!(self, DetectionPolicy::PositionBased)
    }

    /// Returns true for the distance-based rule.
    pub fn is_distance_based(&self) -> bool {
        matches!(self, DetectionPolicy::DistanceBased)
    }
}

/// Configuration options for watermark detection.
///
/// The defaults reproduce the reference behavior; every threshold is
/// explicit so tests can vary them.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    /// Which classification rule to apply.
    pub policy: DetectionPolicy,
    /// Fraction of the page width defining the body zone. Fragments whose
    /// left edge lies strictly left of `body_zone_fraction × pageWidth`
    /// count as body-side. Under the position-based policy candidates must
    /// start strictly right of the threshold; the distance-based policy
    /// accepts a left edge exactly on it.
    pub body_zone_fraction: f64,
    /// Maximum whitespace-stripped character count for a fragment to be
    /// eligible as a watermark candidate.
    pub max_candidate_chars: usize,
    /// Outward padding, in page points, applied to each emitted rectangle
    /// before clamping to the page.
    pub rect_padding: f64,
    /// Minimum gap, in page points, a candidate must keep from every body
    /// block (distance-based policy only).
    pub isolation_distance: f64,
    /// Stripped character count at which a fragment counts as body content
    /// (distance-based policy only).
    pub body_min_chars: usize,
    /// Fraction of the page height excluded as header area: candidates must
    /// start below it (distance-based policy only).
    pub header_exclusion_fraction: f64,
    /// Widest candidate allowed, as a fraction of the page width
    /// (distance-based policy only).
    pub max_candidate_width_fraction: f64,
    /// Tallest candidate allowed, in page points (distance-based policy
    /// only).
    pub max_candidate_height: f64,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::PositionBased,
            body_zone_fraction: 0.5,
            max_candidate_chars: 40,
            rect_padding: 2.0,
            isolation_distance: 25.0,
            body_min_chars: 60,
            header_exclusion_fraction: 0.35,
            max_candidate_width_fraction: 0.30,
            max_candidate_height: 40.0,
        }
    }
}

/// Detector for edge-text watermark stamps.
///
/// A pure value: [`WatermarkDetector::detect`] reads the fragment list and
/// page rectangle and returns redaction rectangles, in fragment order, each
/// padded by [`DetectorOptions::rect_padding`] and clamped to the page.
#[derive(Debug, Clone, Default)]
pub struct WatermarkDetector {
    options: DetectorOptions,
}

impl WatermarkDetector {
    /// Create a detector with the default options.
    pub fn new() -> Self {
        Self {
            options: DetectorOptions::default(),
        }
    }

    /// Create a detector with custom options.
    pub fn with_options(options: DetectorOptions) -> Self {
        Self { options }
    }

    /// The options this detector applies.
    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Find the redaction rectangles for a page's watermark candidates.
    ///
    /// `fragments` must be in source document order; the returned rectangles
    /// keep that order. Graphic fragments never become candidates and never
    /// count toward body content. Fragments classified as body are never
    /// emitted.
    pub fn detect(&self, fragments: &[TextFragment], page: &Rect) -> Vec<Rect> {
        let candidates = match self.options.policy {
            DetectionPolicy::PositionBased => self.position_candidates(fragments, page),
            DetectionPolicy::DistanceBased => self.distance_candidates(fragments, page),
        };
        candidates
            .into_iter()
            .map(|rect| rect.padded(self.options.rect_padding).clamped_to(page))
            .collect()
    }

    /// Position-based rule: a candidate is a short text fragment strictly
    /// right of the body-zone threshold whose top edge is at or below the
    /// bottom edge of the last body line. A left edge exactly on the
    /// threshold counts as neither body nor candidate, so boundary ties are
    /// never redacted.
    ///
    /// A page with no body-side fragments yields `last_body_y = 0`, so any
    /// short right-side fragment qualifies and watermark-only pages still
    /// get cleaned.
    fn position_candidates(&self, fragments: &[TextFragment], page: &Rect) -> Vec<Rect> {
        let threshold = self.options.body_zone_fraction * page.width();
        let last_body_y = fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Text && f.stripped_len() > 0)
            .filter(|f| f.rect.x0 < threshold)
            .map(|f| f.rect.y1)
            .fold(0.0, f64::max);

        fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Text)
            .filter(|f| {
                let len = f.stripped_len();
                len > 0 && len <= self.options.max_candidate_chars
            })
            .filter(|f| f.rect.x0 > threshold)
            .filter(|f| f.rect.y0 >= last_body_y)
            .map(|f| f.rect)
            .collect()
    }

    /// Distance-based rule: a candidate is a short text fragment in the
    /// right column below the header area, within the size guards, that
    /// keeps at least `isolation_distance` from every body block.
    ///
    /// With no body blocks on the page the isolation test passes trivially.
    fn distance_candidates(&self, fragments: &[TextFragment], page: &Rect) -> Vec<Rect> {
        let min_x = self.options.body_zone_fraction * page.width();
        let min_y = self.options.header_exclusion_fraction * page.height();
        let max_width = self.options.max_candidate_width_fraction * page.width();

        let body: Vec<Rect> = fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Text)
            .filter(|f| f.stripped_len() >= self.options.body_min_chars)
            .map(|f| f.rect)
            .collect();

        fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Text)
            .filter(|f| {
                let len = f.stripped_len();
                len > 0 && len <= self.options.max_candidate_chars
            })
            .filter(|f| f.rect.x0 >= min_x && f.rect.y0 >= min_y)
            .filter(|f| {
                f.rect.width() <= max_width && f.rect.height() <= self.options.max_candidate_height
            })
            .filter(|f| {
                body.iter()
                    .all(|b| f.rect.gap_distance(b) >= self.options.isolation_distance)
            })
            .map(|f| f.rect)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    fn text_fragment(rect: Rect, text: &str, sequence: usize) -> TextFragment {
        TextFragment {
            rect,
            text: text.to_string(),
            sequence,
            kind: FragmentKind::Text,
        }
    }

    fn body_fragment(rect: Rect, len: usize, sequence: usize) -> TextFragment {
        text_fragment(rect, &"x".repeat(len), sequence)
    }

    #[test]
    fn test_default_options() {
        let options = DetectorOptions::default();
        assert!(options.policy.is_position_based());
        assert_eq!(options.body_zone_fraction, 0.5);
        assert_eq!(options.max_candidate_chars, 40);
        assert_eq!(options.rect_padding, 2.0);
        assert_eq!(options.isolation_distance, 25.0);
    }

    #[test]
    fn test_stamp_below_body_is_a_candidate() {
        // Page 612 wide, body ends at y1=700, stamp at x0=500, y0=710.
        let fragments = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 700.0), 200, 0),
            text_fragment(Rect::new(500.0, 710.0, 590.0, 720.0), "© example.com", 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert_eq!(rects, vec![Rect::new(498.0, 708.0, 592.0, 722.0)]);
    }

    #[test]
    fn test_left_zone_fragment_is_never_a_candidate() {
        // Short text, but it starts in the body zone.
        let fragments = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 400.0), 200, 0),
            text_fragment(Rect::new(100.0, 700.0, 180.0, 712.0), "page 3 of 4", 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert!(rects.is_empty());
    }

    #[test]
    fn test_fragment_overlapping_body_vertically_is_kept() {
        // The stamp shares the last body baseline region: y0 above last_body_y.
        let fragments = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 700.0), 200, 0),
            text_fragment(Rect::new(500.0, 690.0, 590.0, 699.0), "sidebar", 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert!(rects.is_empty());
    }

    #[test]
    fn test_top_edge_exactly_at_last_body_y_qualifies() {
        let fragments = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 700.0), 200, 0),
            text_fragment(Rect::new(500.0, 700.0, 590.0, 710.0), "stamp", 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_left_edge_exactly_at_threshold_is_never_redacted() {
        // x0 == 306 on a 612-wide page sits on the boundary: not a
        // candidate, and it must not raise last_body_y either.
        let boundary = text_fragment(Rect::new(306.0, 740.0, 400.0, 752.0), "boundary", 0);
        let stamp = text_fragment(Rect::new(500.0, 700.0, 590.0, 712.0), "stamp.example", 1);
        let rects = WatermarkDetector::new().detect(&[boundary, stamp], &PAGE);
        assert_eq!(rects, vec![Rect::new(498.0, 698.0, 592.0, 714.0)]);
    }

    #[test]
    fn test_watermark_only_page_falls_back_to_zero_body_line() {
        // No body-side fragments: last_body_y = 0, any short right-side
        // fragment qualifies, even near the top.
        let fragments = vec![text_fragment(
            Rect::new(520.0, 30.0, 600.0, 42.0),
            "© example.com",
            0,
        )];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_long_text_on_the_right_is_kept() {
        let fragments = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 400.0), 200, 0),
            body_fragment(Rect::new(320.0, 500.0, 600.0, 540.0), 80, 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert!(rects.is_empty());
    }

    #[test]
    fn test_whitespace_only_fragment_is_ignored() {
        let fragments = vec![text_fragment(Rect::new(500.0, 700.0, 590.0, 712.0), " \n\t ", 0)];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert!(rects.is_empty());
    }

    #[test]
    fn test_graphic_fragments_are_ignored_entirely() {
        // A graphic block on the right must not be redacted, and a graphic
        // block on the left must not count as body content.
        let fragments = vec![
            TextFragment {
                rect: Rect::new(40.0, 80.0, 300.0, 740.0),
                text: String::new(),
                sequence: 0,
                kind: FragmentKind::Graphic,
            },
            TextFragment {
                rect: Rect::new(520.0, 700.0, 600.0, 730.0),
                text: String::new(),
                sequence: 1,
                kind: FragmentKind::Graphic,
            },
            text_fragment(Rect::new(500.0, 60.0, 590.0, 72.0), "© example.com", 2),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        // Only the text stamp is emitted; the left graphic did not set a
        // body line that would have excluded it.
        assert_eq!(rects.len(), 1);
        assert!(rects[0].contains(&Rect::new(500.0, 60.0, 590.0, 72.0)));
    }

    #[test]
    fn test_emitted_rects_keep_fragment_order() {
        let fragments = vec![
            text_fragment(Rect::new(500.0, 740.0, 560.0, 750.0), "first", 0),
            text_fragment(Rect::new(500.0, 760.0, 560.0, 770.0), "second", 1),
        ];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert_eq!(rects.len(), 2);
        assert!(rects[0].y0 < rects[1].y0);
    }

    #[test]
    fn test_candidate_rect_is_clamped_to_page() {
        // Stamp flush with the bottom-right corner: padding would exceed the
        // page without clamping.
        let fragments = vec![text_fragment(
            Rect::new(540.0, 780.0, 612.0, 792.0),
            "stamp",
            0,
        )];
        let rects = WatermarkDetector::new().detect(&fragments, &PAGE);
        assert_eq!(rects, vec![Rect::new(538.0, 778.0, 612.0, 792.0)]);
    }

    #[test]
    fn test_body_box_is_never_contained_in_an_emitted_rect() {
        let body = Rect::new(50.0, 90.0, 540.0, 700.0);
        let fragments = vec![
            body_fragment(body, 200, 0),
            text_fragment(Rect::new(500.0, 710.0, 590.0, 720.0), "© example.com", 1),
        ];
        for policy in [DetectionPolicy::PositionBased, DetectionPolicy::DistanceBased] {
            let detector = WatermarkDetector::with_options(DetectorOptions {
                policy,
                ..DetectorOptions::default()
            });
            for rect in detector.detect(&fragments, &PAGE) {
                assert!(!rect.contains(&body));
            }
        }
    }

    #[test]
    fn test_distance_policy_requires_isolation() {
        let options = DetectorOptions {
            policy: DetectionPolicy::DistanceBased,
            ..DetectorOptions::default()
        };
        // 10pt gap from the body block: too close.
        let near = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 700.0), 200, 0),
            text_fragment(Rect::new(500.0, 710.0, 590.0, 720.0), "stamp", 1),
        ];
        let rects = WatermarkDetector::with_options(options.clone()).detect(&near, &PAGE);
        assert!(rects.is_empty());

        // 40pt gap: isolated enough.
        let far = vec![
            body_fragment(Rect::new(50.0, 90.0, 540.0, 680.0), 200, 0),
            text_fragment(Rect::new(500.0, 720.0, 590.0, 730.0), "stamp", 1),
        ];
        let rects = WatermarkDetector::with_options(options).detect(&far, &PAGE);
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_distance_policy_excludes_header_area() {
        // 0.35 × 792 = 277.2: anything starting above that row is kept.
        let options = DetectorOptions {
            policy: DetectionPolicy::DistanceBased,
            ..DetectorOptions::default()
        };
        let fragments = vec![text_fragment(
            Rect::new(500.0, 100.0, 590.0, 112.0),
            "header note",
            0,
        )];
        let rects = WatermarkDetector::with_options(options).detect(&fragments, &PAGE);
        assert!(rects.is_empty());
    }

    #[test]
    fn test_distance_policy_size_guards() {
        let options = DetectorOptions {
            policy: DetectionPolicy::DistanceBased,
            ..DetectorOptions::default()
        };
        // Wider than 0.30 × 612 = 183.6 points.
        let wide = vec![text_fragment(
            Rect::new(400.0, 700.0, 600.0, 712.0),
            "short but wide",
            0,
        )];
        let detector = WatermarkDetector::with_options(options);
        assert!(detector.detect(&wide, &PAGE).is_empty());

        // Taller than 40 points.
        let tall = vec![text_fragment(
            Rect::new(500.0, 600.0, 590.0, 650.0),
            "tall",
            0,
        )];
        assert!(detector.detect(&tall, &PAGE).is_empty());
    }

    #[test]
    fn test_distance_policy_without_body_blocks() {
        let options = DetectorOptions {
            policy: DetectionPolicy::DistanceBased,
            ..DetectorOptions::default()
        };
        let fragments = vec![text_fragment(
            Rect::new(500.0, 700.0, 590.0, 712.0),
            "© example.com",
            0,
        )];
        let rects = WatermarkDetector::with_options(options).detect(&fragments, &PAGE);
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_custom_threshold_moves_the_body_zone() {
        // With a 0.8 fraction the stamp at x0=500 is inside the body zone
        // (threshold 489.6 < 500 keeps it right-side; raise to 0.85 → 520.2).
        let fragments = vec![text_fragment(
            Rect::new(500.0, 700.0, 590.0, 712.0),
            "stamp",
            0,
        )];
        let strict = WatermarkDetector::with_options(DetectorOptions {
            body_zone_fraction: 0.85,
            ..DetectorOptions::default()
        });
        assert!(strict.detect(&fragments, &PAGE).is_empty());

        let loose = WatermarkDetector::with_options(DetectorOptions {
            body_zone_fraction: 0.8,
            ..DetectorOptions::default()
        });
        assert_eq!(loose.detect(&fragments, &PAGE).len(), 1);
    }

    #[test]
    fn test_empty_page_yields_no_candidates() {
        let rects = WatermarkDetector::new().detect(&[], &PAGE);
        assert!(rects.is_empty());
    }
}
