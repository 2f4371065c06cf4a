//! Text-frame metrics and character-capacity estimation.
//!
//! A frame's capacity is approximated from its transform, column, inset, and
//! font attributes. The 0.6 average-glyph-width factor is a heuristic, not
//! font-metric accurate: exact metrics would require rendering the fonts,
//! which the pipeline does not have access to. Attribute parsing is
//! best-effort; malformed values degrade to documented defaults instead of
//! failing a whole-document run.

use serde::{Deserialize, Serialize};

/// Default frame dimensions used when a transform cannot be parsed and for
/// the synthesized "standard" frame of texts with no known layout home.
pub const DEFAULT_FRAME_WIDTH: f64 = 200.0;
pub const DEFAULT_FRAME_HEIGHT: f64 = 100.0;
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_COLUMN_GUTTER: f64 = 12.0;

/// A frame is never treated as having zero capacity; this floor keeps risk
/// scores finite downstream.
pub const MIN_FRAME_CAPACITY: usize = 50;

/// Average glyph width as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f64 = 0.6;

/// Internal margins of a text frame, in document units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InsetSpacing {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl InsetSpacing {
    pub fn uniform(value: f64) -> Self {
        InsetSpacing {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Parses an IDML inset attribute: either a single value applied to all
    /// four sides or four whitespace-separated values (top right bottom left).
    /// Anything else yields zero insets.
    pub fn parse(raw: &str) -> Self {
        let values: Vec<f64> = raw
            .split_whitespace()
            .filter_map(|v| v.parse::<f64>().ok())
            .collect();
        match values.as_slice() {
            [all] => InsetSpacing::uniform(*all),
            [top, right, bottom, left, ..] => InsetSpacing {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            },
            _ => InsetSpacing::default(),
        }
    }

    pub fn max(&self) -> f64 {
        self.top.max(self.right).max(self.bottom).max(self.left)
    }
}

/// Raw attribute strings for one text frame, as read from a spread XML file.
///
/// All fields except the identifier are optional: the layout format is
/// legacy and frames routinely omit typographic attributes.
#[derive(Debug, Clone, Default)]
pub struct FrameSource {
    pub frame_id: String,
    pub item_transform: Option<String>,
    pub column_count: Option<String>,
    pub column_gutter: Option<String>,
    pub inset_spacing: Option<String>,
    pub font_size: Option<String>,
    pub leading: Option<String>,
    /// Characters currently occupying the frame in the source document.
    pub char_count: usize,
}

/// Layout and typographic description of one text frame.
///
/// Immutable after construction; adjusting a frame produces a new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFrameMetrics {
    pub frame_id: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub column_count: u32,
    pub column_gutter: f64,
    pub inset_spacing: InsetSpacing,
    pub font_size: f64,
    pub leading: f64,
    pub char_count: usize,
    pub estimated_overflow_risk: f64,
}

impl TextFrameMetrics {
    /// Builds frame metrics from raw attribute strings, substituting the
    /// documented defaults for anything absent or malformed.
    pub fn from_source(source: &FrameSource) -> Self {
        let (width, height, x, y) = parse_transform(source.item_transform.as_deref());

        let column_count = source
            .column_count
            .as_deref()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&c| c >= 1)
            .unwrap_or(1);
        let column_gutter = source
            .column_gutter
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|g| *g >= 0.0)
            .unwrap_or(DEFAULT_COLUMN_GUTTER);
        let inset_spacing = source
            .inset_spacing
            .as_deref()
            .map(InsetSpacing::parse)
            .unwrap_or_default();

        let font_size = source
            .font_size
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|s| *s > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE);
        let mut leading = source
            .leading
            .as_deref()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|l| *l > 0.0)
            .unwrap_or(font_size * 1.2);
        // Leading below the font size would overlap lines; force the 120% fallback.
        if leading <= font_size {
            leading = font_size * 1.2;
        }

        let mut metrics = TextFrameMetrics {
            frame_id: source.frame_id.clone(),
            width,
            height,
            x,
            y,
            column_count,
            column_gutter,
            inset_spacing,
            font_size,
            leading,
            char_count: source.char_count,
            estimated_overflow_risk: 0.0,
        };
        metrics.estimated_overflow_risk = metrics.occupancy_risk();
        metrics
    }

    /// A synthesized standard frame for texts whose layout home is unknown:
    /// 200x100 units, one column, 6-unit insets, 12pt type.
    pub fn standard(frame_id: impl Into<String>, char_count: usize) -> Self {
        let mut metrics = TextFrameMetrics {
            frame_id: frame_id.into(),
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            x: 0.0,
            y: 0.0,
            column_count: 1,
            column_gutter: DEFAULT_COLUMN_GUTTER,
            inset_spacing: InsetSpacing::uniform(6.0),
            font_size: DEFAULT_FONT_SIZE,
            leading: DEFAULT_FONT_SIZE * 1.2,
            char_count,
            estimated_overflow_risk: 0.0,
        };
        metrics.estimated_overflow_risk = metrics.occupancy_risk();
        metrics
    }

    /// Estimated number of characters that fit in this frame.
    ///
    /// Width and height are reduced by insets, the width is split across
    /// columns minus gutters, and the result is floored at
    /// [`MIN_FRAME_CAPACITY`] so degenerate frames never report zero space.
    pub fn character_capacity(&self) -> usize {
        let mut effective_width =
            self.width - self.inset_spacing.left - self.inset_spacing.right;
        if self.column_count > 1 {
            effective_width = (effective_width
                - (self.column_count as f64 - 1.0) * self.column_gutter)
                / self.column_count as f64;
        }
        let effective_height =
            self.height - self.inset_spacing.top - self.inset_spacing.bottom;

        let chars_per_line = (effective_width / (self.font_size * GLYPH_WIDTH_FACTOR))
            .floor()
            .max(1.0) as usize;
        let lines_available = (effective_height / self.leading).floor().max(1.0) as usize;

        let capacity = chars_per_line * lines_available * self.column_count as usize;
        capacity.max(MIN_FRAME_CAPACITY)
    }

    /// How full the frame already is in the source document, as a ratio of
    /// current characters to capacity, capped at 2.0 for extreme overflow.
    fn occupancy_risk(&self) -> f64 {
        let risk = self.char_count as f64 / self.character_capacity() as f64;
        risk.min(2.0)
    }

    /// Area of the frame in square document units.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Width-to-height ratio; frames near 1.0 are square-ish.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        }
    }

    /// Characters per unit of area in the source document.
    pub fn character_density(&self) -> f64 {
        let area = self.area();
        if area > 0.0 {
            self.char_count as f64 / area
        } else {
            f64::INFINITY
        }
    }
}

/// Parses an ItemTransform attribute into (width, height, x, y).
///
/// The matrix layout is `scaleX skewY skewX scaleY translateX translateY`;
/// for rectangular frames the scale components carry the dimensions.
/// Malformed or truncated values degrade to the default 200x100 frame.
fn parse_transform(raw: Option<&str>) -> (f64, f64, f64, f64) {
    if let Some(raw) = raw {
        let values: Vec<f64> = raw
            .split_whitespace()
            .filter_map(|v| v.parse::<f64>().ok())
            .collect();
        if values.len() >= 6 {
            return (values[0].abs(), values[3].abs(), values[4], values[5]);
        }
    }
    (DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT, 0.0, 0.0)
}
