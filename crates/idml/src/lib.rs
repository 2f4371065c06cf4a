//! IDML package reader/writer.
//!
//! An IDML file is a zip archive of XML parts: `designmap.xml` lists the
//! stories in document order, `Stories/*.xml` hold the text, and
//! `Spreads/*.xml` hold the layout frames. This crate loads the archive into
//! memory, exposes ordered text segments and frame metrics, applies
//! translated text back into the stories, and saves a package in which every
//! untouched part is carried over byte-for-byte.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use thiserror::Error;

use idmltrans_core::geometry::TextFrameMetrics;
use idmltrans_core::glossary::Glossary;

pub mod spread;
pub mod story;

pub use story::is_translatable;

#[derive(Debug, Error)]
pub enum IdmlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid IDML archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("XML error in {path}: {message}")]
    Xml { path: String, message: String },
    #[error("package entry not found: {0}")]
    EntryNotFound(String),
    #[error("package entry {0} is not UTF-8")]
    Encoding(String),
}

impl IdmlError {
    fn xml(path: &str, err: impl std::fmt::Display) -> Self {
        IdmlError::Xml {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

/// One translatable text segment: the `index`-th `<Content>` element of the
/// story at `story_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub story_path: String,
    pub index: usize,
    pub text: String,
}

/// An IDML package held fully in memory.
///
/// Entries keep their archive order. Only story entries that actually
/// receive translations are rewritten; everything else round-trips
/// byte-for-byte, so styles, spreads, and resources survive untouched.
pub struct IdmlPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl IdmlPackage {
    pub fn open(path: &Path) -> Result<Self, IdmlError> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdmlError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            entries.push((entry.name().to_string(), data));
        }
        Ok(IdmlPackage { entries })
    }

    /// Story part paths in document order.
    ///
    /// `designmap.xml` is authoritative; when it is absent or lists nothing
    /// the `Stories/` entries are used in archive order instead.
    pub fn story_paths(&self) -> Result<Vec<String>, IdmlError> {
        match self.read_to_string("designmap.xml") {
            Ok(designmap) => {
                let paths = story::story_paths_from_designmap(&designmap)
                    .map_err(|e| IdmlError::xml("designmap.xml", e))?;
                let known: Vec<String> = paths
                    .into_iter()
                    .filter(|p| self.entries.iter().any(|(name, _)| name == p))
                    .collect();
                if known.is_empty() {
                    Ok(self.paths_with_prefix("Stories/"))
                } else {
                    Ok(known)
                }
            }
            Err(IdmlError::EntryNotFound(_)) => Ok(self.paths_with_prefix("Stories/")),
            Err(e) => Err(e),
        }
    }

    pub fn spread_paths(&self) -> Vec<String> {
        self.paths_with_prefix("Spreads/")
    }

    fn paths_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, _)| name.clone())
            .filter(|name| name.starts_with(prefix) && name.ends_with(".xml"))
            .collect()
    }

    pub fn read_to_string(&self, name: &str) -> Result<String, IdmlError> {
        let (_, data) = self
            .entries
            .iter()
            .find(|(entry, _)| entry == name)
            .ok_or_else(|| IdmlError::EntryNotFound(name.to_string()))?;
        String::from_utf8(data.clone()).map_err(|_| IdmlError::Encoding(name.to_string()))
    }

    fn replace_entry(&mut self, name: &str, content: String) -> Result<(), IdmlError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(entry, _)| entry == name)
            .ok_or_else(|| IdmlError::EntryNotFound(name.to_string()))?;
        entry.1 = content.into_bytes();
        Ok(())
    }

    /// All translatable segments of the package in document order.
    ///
    /// Segments that fail the translatability filter (codes, URLs, color
    /// values, glossary-protected terms) are left out; their `<Content>`
    /// elements survive the rewrite unchanged.
    pub fn translatable_segments(&self, glossary: &Glossary) -> Result<Vec<Segment>, IdmlError> {
        let mut segments = Vec::new();
        for story_path in self.story_paths()? {
            let xml = self.read_to_string(&story_path)?;
            let contents = story::extract_contents(&xml)
                .map_err(|e| IdmlError::xml(&story_path, e))?;
            for (index, text) in contents.into_iter().enumerate() {
                if is_translatable(&text, glossary) {
                    segments.push(Segment {
                        story_path: story_path.clone(),
                        index,
                        text,
                    });
                } else {
                    log::debug!("skipping non-translatable segment in {story_path}: {text:?}");
                }
            }
        }
        Ok(segments)
    }

    /// Frame metrics for every text frame on every spread, keyed by frame id.
    ///
    /// Character counts come from each frame's parent story; frames without
    /// a resolvable story count zero characters.
    pub fn frame_metrics(&self) -> Result<BTreeMap<String, TextFrameMetrics>, IdmlError> {
        let mut story_chars: BTreeMap<String, usize> = BTreeMap::new();
        for story_path in self.story_paths()? {
            let xml = self.read_to_string(&story_path)?;
            let story_id = story::story_id_from_path(&story_path);
            let contents = story::extract_contents(&xml)
                .map_err(|e| IdmlError::xml(&story_path, e))?;
            let total = contents.iter().map(|t| t.chars().count()).sum();
            story_chars.insert(story_id, total);
        }

        let mut metrics = BTreeMap::new();
        for spread_path in self.spread_paths() {
            let xml = self.read_to_string(&spread_path)?;
            let frames =
                spread::extract_frames(&xml).map_err(|e| IdmlError::xml(&spread_path, e))?;
            for frame in frames {
                let mut source = frame.source;
                if let Some(story_id) = &frame.parent_story {
                    source.char_count = story_chars.get(story_id).copied().unwrap_or(0);
                }
                metrics.insert(source.frame_id.clone(), TextFrameMetrics::from_source(&source));
            }
        }
        Ok(metrics)
    }

    /// The full text of each frame's parent story, keyed by frame id.
    /// Companion to [`frame_metrics`](Self::frame_metrics) for the
    /// lexical side of diagram detection.
    pub fn frame_texts(&self) -> Result<BTreeMap<String, String>, IdmlError> {
        let mut story_text: BTreeMap<String, String> = BTreeMap::new();
        for story_path in self.story_paths()? {
            let xml = self.read_to_string(&story_path)?;
            let contents = story::extract_contents(&xml)
                .map_err(|e| IdmlError::xml(&story_path, e))?;
            story_text.insert(story::story_id_from_path(&story_path), contents.join(" "));
        }

        let mut texts = BTreeMap::new();
        for spread_path in self.spread_paths() {
            let xml = self.read_to_string(&spread_path)?;
            let frames =
                spread::extract_frames(&xml).map_err(|e| IdmlError::xml(&spread_path, e))?;
            for frame in frames {
                let text = frame
                    .parent_story
                    .as_ref()
                    .and_then(|id| story_text.get(id))
                    .cloned()
                    .unwrap_or_default();
                texts.insert(frame.source.frame_id, text);
            }
        }
        Ok(texts)
    }

    /// Writes translated text back into the stories.
    ///
    /// `segments` and `translations` are parallel; each translation replaces
    /// the `<Content>` element its segment came from. Stories not named by
    /// any segment are left untouched.
    pub fn apply_translations(
        &mut self,
        segments: &[Segment],
        translations: &[String],
    ) -> Result<(), IdmlError> {
        let mut by_story: BTreeMap<&str, BTreeMap<usize, &str>> = BTreeMap::new();
        for (segment, translation) in segments.iter().zip(translations) {
            by_story
                .entry(&segment.story_path)
                .or_default()
                .insert(segment.index, translation.as_str());
        }

        for (story_path, replacements) in by_story {
            let xml = self.read_to_string(story_path)?;
            let rewritten = story::rewrite_contents(&xml, &replacements)
                .map_err(|e| IdmlError::xml(story_path, e))?;
            self.replace_entry(story_path, rewritten)?;
        }
        Ok(())
    }

    /// Saves the package as a new IDML file.
    ///
    /// The `mimetype` entry is written first and uncompressed, as the format
    /// requires; everything else is deflated in original archive order.
    pub fn save(&self, path: &Path) -> Result<(), IdmlError> {
        let file = File::create(path)?;
        let mut writer = zip::ZipWriter::new(file);

        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        if let Some((name, data)) = self.entries.iter().find(|(name, _)| name == "mimetype") {
            writer.start_file(name.as_str(), stored)?;
            writer.write_all(data)?;
        }
        for (name, data) in &self.entries {
            if name == "mimetype" {
                continue;
            }
            writer.start_file(name.as_str(), deflated)?;
            writer.write_all(data)?;
        }
        writer.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESIGNMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Document xmlns:idPkg="http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging">
  <idPkg:Story src="Stories/Story_u200.xml"/>
  <idPkg:Story src="Stories/Story_u100.xml"/>
</Document>"#;

    const STORY_U100: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<idPkg:Story xmlns:idPkg="http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging">
  <Story Self="u100">
    <ParagraphStyleRange>
      <CharacterStyleRange>
        <Content>Montaggio della passerella</Content>
      </CharacterStyleRange>
      <CharacterStyleRange>
        <Content>DIN-1234</Content>
      </CharacterStyleRange>
    </ParagraphStyleRange>
  </Story>
</idPkg:Story>"#;

    const STORY_U200: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<idPkg:Story xmlns:idPkg="http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging">
  <Story Self="u200">
    <ParagraphStyleRange>
      <CharacterStyleRange>
        <Content>Verificare il fissaggio</Content>
      </CharacterStyleRange>
    </ParagraphStyleRange>
  </Story>
</idPkg:Story>"#;

    const SPREAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<idPkg:Spread xmlns:idPkg="http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging">
  <Spread Self="s1">
    <TextFrame Self="u300" ParentStory="u100" ItemTransform="200 0 0 100 30 40">
      <TextFramePreference TextColumnCount="1" InsetSpacing="6"/>
    </TextFrame>
  </Spread>
</idPkg:Spread>"#;

    fn sample_package() -> IdmlPackage {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let stored = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            let deflated = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            writer.start_file("mimetype", stored).unwrap();
            writer
                .write_all(b"application/vnd.adobe.indesign-idml-package")
                .unwrap();
            writer.start_file("designmap.xml", deflated).unwrap();
            writer.write_all(DESIGNMAP.as_bytes()).unwrap();
            writer.start_file("Stories/Story_u100.xml", deflated).unwrap();
            writer.write_all(STORY_U100.as_bytes()).unwrap();
            writer.start_file("Stories/Story_u200.xml", deflated).unwrap();
            writer.write_all(STORY_U200.as_bytes()).unwrap();
            writer.start_file("Spreads/Spread_s1.xml", deflated).unwrap();
            writer.write_all(SPREAD.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        IdmlPackage::from_bytes(buffer.get_ref()).unwrap()
    }

    #[test]
    fn test_story_paths_follow_designmap_order() {
        let package = sample_package();
        assert_eq!(
            package.story_paths().unwrap(),
            vec!["Stories/Story_u200.xml", "Stories/Story_u100.xml"]
        );
    }

    #[test]
    fn test_translatable_segments_skip_codes() {
        let package = sample_package();
        let segments = package.translatable_segments(&Glossary::default()).unwrap();
        // "DIN-1234" is a protected reference code and is filtered out.
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Verificare il fissaggio", "Montaggio della passerella"]
        );
        assert_eq!(segments[1].story_path, "Stories/Story_u100.xml");
        assert_eq!(segments[1].index, 0);
    }

    #[test]
    fn test_frame_metrics_link_story_char_count() {
        let package = sample_package();
        let metrics = package.frame_metrics().unwrap();
        let frame = &metrics["u300"];
        assert_eq!(frame.width, 200.0);
        assert_eq!(frame.height, 100.0);
        // Both story segments of u100 count toward the frame.
        assert_eq!(frame.char_count, "Montaggio della passerella".chars().count() + "DIN-1234".chars().count());
    }

    #[test]
    fn test_frame_texts_join_story_contents() {
        let package = sample_package();
        let texts = package.frame_texts().unwrap();
        assert_eq!(texts["u300"], "Montaggio della passerella DIN-1234");
    }

    #[test]
    fn test_apply_translations_and_roundtrip() {
        let mut package = sample_package();
        let glossary = Glossary::default();
        let segments = package.translatable_segments(&glossary).unwrap();
        let translations = vec![
            "Befestigung prüfen".to_string(),
            "Montage des Stegs".to_string(),
        ];
        package.apply_translations(&segments, &translations).unwrap();

        let rewritten = package.read_to_string("Stories/Story_u100.xml").unwrap();
        assert!(rewritten.contains("Montage des Stegs"));
        // The filtered code survives untouched.
        assert!(rewritten.contains("DIN-1234"));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("translated.idml");
        package.save(&out).unwrap();

        let reopened = IdmlPackage::open(&out).unwrap();
        let segments = reopened.translatable_segments(&glossary).unwrap();
        assert_eq!(segments[0].text, "Befestigung prüfen");
        // Untouched parts round-trip byte-for-byte.
        assert_eq!(
            reopened.read_to_string("Spreads/Spread_s1.xml").unwrap(),
            SPREAD
        );
    }
}
