//! Spread XML handling: text-frame attribute extraction.
//!
//! Spreads are read with a DOM parser because frames are sparse and nested
//! (`TextFramePreference` and its `Properties` children), unlike stories,
//! which are streamed. Attribute values are passed through as raw strings;
//! interpreting them, including all the malformed-value fallbacks, is the
//! metrics layer's job.

use idmltrans_core::geometry::FrameSource;

/// One `<TextFrame>` as found on a spread, before any interpretation.
#[derive(Debug, Clone, Default)]
pub struct SpreadFrame {
    pub parent_story: Option<String>,
    pub source: FrameSource,
}

/// All text frames of one spread, in document order.
pub fn extract_frames(xml: &str) -> Result<Vec<SpreadFrame>, roxmltree::Error> {
    let document = roxmltree::Document::parse(xml)?;
    let mut frames = Vec::new();

    for node in document
        .descendants()
        .filter(|n| n.has_tag_name("TextFrame"))
    {
        let Some(frame_id) = node.attribute("Self") else {
            continue;
        };

        let mut source = FrameSource {
            frame_id: frame_id.to_string(),
            item_transform: node.attribute("ItemTransform").map(String::from),
            // Rarely present on the frame itself; "Auto" leading degrades to
            // the metrics default downstream.
            font_size: node.attribute("PointSize").map(String::from),
            leading: node.attribute("Leading").map(String::from),
            ..FrameSource::default()
        };

        if let Some(preference) = node
            .children()
            .find(|n| n.has_tag_name("TextFramePreference"))
        {
            source.column_count = preference.attribute("TextColumnCount").map(String::from);
            source.column_gutter = preference.attribute("TextColumnGutter").map(String::from);
            source.inset_spacing = inset_spacing(&preference);
        }

        frames.push(SpreadFrame {
            parent_story: node.attribute("ParentStory").map(String::from),
            source,
        });
    }

    Ok(frames)
}

/// Insets appear either as a plain attribute or, for per-side values, as a
/// `Properties/InsetSpacing` list of `ListItem` children. Both forms reduce
/// to the whitespace-separated string the metrics parser accepts.
fn inset_spacing(preference: &roxmltree::Node) -> Option<String> {
    if let Some(value) = preference.attribute("InsetSpacing") {
        return Some(value.to_string());
    }

    let list = preference
        .children()
        .find(|n| n.has_tag_name("Properties"))?
        .children()
        .find(|n| n.has_tag_name("InsetSpacing"))?;
    let items: Vec<&str> = list
        .children()
        .filter(|n| n.has_tag_name("ListItem"))
        .filter_map(|n| n.text())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items.join(" "))
    }
}
