//! Story XML handling: ordered content extraction, the translatability
//! filter, and the streaming rewrite that puts translations back.
//!
//! Segment identity is positional. The `n`-th `<Content>` element seen while
//! reading a story is segment `n`, and the rewrite walks the same event
//! stream, so indices line up as long as both sides read the same bytes.

use std::collections::BTreeMap;

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

use idmltrans_core::glossary::Glossary;

/// Story part paths referenced by `designmap.xml`, in document order.
pub fn story_paths_from_designmap(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paths = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                if e.name().as_ref() == b"idPkg:Story" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"src" {
                            if let Ok(value) = std::str::from_utf8(&attr.value) {
                                paths.push(value.to_string());
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paths)
}

/// "Stories/Story_u1000.xml" -> "u1000".
pub fn story_id_from_path(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".xml")
        .rsplit('_')
        .next()
        .unwrap_or("unknown")
        .to_string()
}

/// The text of every `<Content>` element in document order.
///
/// Empty elements still produce a segment, so indices stay aligned with the
/// rewrite pass.
pub fn extract_contents(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut contents = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Content" => {
                current = Some(String::new());
            }
            Event::Empty(e) if e.name().as_ref() == b"Content" => {
                contents.push(String::new());
            }
            Event::Text(e) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"Content" => {
                if let Some(text) = current.take() {
                    contents.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(contents)
}

/// Rewrites a story, replacing the text of the `<Content>` elements named by
/// `replacements` (keyed by segment index) and copying everything else
/// through unchanged.
pub fn rewrite_contents(
    xml: &str,
    replacements: &BTreeMap<usize, &str>,
) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut index = 0usize;
    // Some(replacement) while inside a Content element being replaced.
    let mut replacing: Option<&str> = None;
    let mut in_content = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) if e.name().as_ref() == b"Content" => {
                in_content = true;
                replacing = replacements.get(&index).copied();
                index += 1;
                writer.write_event(event)?;
                if let Some(text) = replacing {
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                }
            }
            Event::Empty(ref e) if e.name().as_ref() == b"Content" => {
                index += 1;
                writer.write_event(event)?;
            }
            Event::Text(_) if in_content && replacing.is_some() => {
                // Original text dropped; the replacement was already written.
            }
            Event::End(ref e) if e.name().as_ref() == b"Content" => {
                in_content = false;
                replacing = None;
                writer.write_event(event)?;
            }
            Event::Eof => break,
            event => {
                writer.write_event(event)?;
            }
        }
    }

    let bytes = writer.into_inner();
    Ok(String::from_utf8(bytes).expect("writer output is valid UTF-8"))
}

/// Uppercase codes that are ordinary Italian words and must still be
/// translated. Source documents routinely set section titles and warnings in
/// capitals.
const UPPERCASE_WORDS_TO_TRANSLATE: &[&str] = &[
    "EVITARE",
    "ATTENZIONE",
    "PERICOLO",
    "AVVERTENZA",
    "AVVERTENZE",
    "SICUREZZA",
    "PROTEZIONE",
    "INSTALLAZIONE",
    "MONTAGGIO",
    "FISSAGGIO",
    "FISSAGGI",
    "MANUALE",
    "ISTRUZIONI",
    "INDICE",
    "INTRODUZIONE",
    "MANUTENZIONE",
    "ISPEZIONE",
    "GARANZIA",
    "ASSISTENZA",
    "MARCATURA",
    "CODICE",
    "POSIZIONE",
    "USO",
    "NOTA",
    "IMPORTANTE",
    "CONTENUTO",
    "PROCEDURA",
];

/// Whether a segment should be sent to the translator.
///
/// Filters out fragments shorter than two characters, punctuation-only and
/// numeric-only runs, code-like all-caps identifiers, URLs and addresses,
/// layout-internal values (style references, swatches, color specs, part
/// ids), and glossary-protected terms. Filtered segments pass through the
/// pipeline untouched.
pub fn is_translatable(text: &str, glossary: &Glossary) -> bool {
    let clean = text.trim();
    if clean.chars().count() < 2 {
        return false;
    }

    if Regex::new(r"^[^\w\s]+$").unwrap().is_match(clean) {
        return false;
    }
    if clean.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    if Regex::new(r"^[A-Z0-9_]+$").unwrap().is_match(clean) {
        return UPPERCASE_WORDS_TO_TRANSLATE.contains(&clean);
    }

    if Regex::new(r"^(?:https?://|www\.)").unwrap().is_match(clean) || clean.contains('@') {
        return false;
    }

    if is_layout_value(clean) {
        return false;
    }

    !glossary.is_protected_term(clean)
}

/// Style references, swatch names, color specs, and internal part ids that
/// leak into stories but are not prose.
fn is_layout_value(text: &str) -> bool {
    if text.starts_with("Swatch/")
        || text.starts_with("Color/")
        || text.starts_with("CharacterStyle/")
        || text.starts_with("ParagraphStyle/")
    {
        return true;
    }
    if Regex::new(r"^[CMYKRGB]=\d").unwrap().is_match(text) {
        return true;
    }

    let lower = text.to_lowercase();
    if lower == "none" || lower == "swatch/none" {
        return true;
    }
    if Regex::new(r"^#[0-9a-f]{3,8}$").unwrap().is_match(&lower) {
        return true;
    }
    if Regex::new(r"^pantone\s+\d+").unwrap().is_match(&lower) {
        return true;
    }
    // Internal ids such as "u1a2b3c".
    if Regex::new(r"^[a-z]+[0-9a-f]{4,}$").unwrap().is_match(&lower) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<idPkg:Story xmlns:idPkg="http://ns.adobe.com/AdobeInDesign/idml/1.0/packaging">
  <Story Self="u100">
    <ParagraphStyleRange AppliedParagraphStyle="ParagraphStyle/Heading">
      <CharacterStyleRange>
        <Content>Montaggio &amp; fissaggio</Content>
        <Br/>
        <Content/>
        <Content>Pagina 16</Content>
      </CharacterStyleRange>
    </ParagraphStyleRange>
  </Story>
</idPkg:Story>"#;

    #[test]
    fn test_extract_contents_in_order() {
        let contents = extract_contents(STORY).unwrap();
        assert_eq!(
            contents,
            vec!["Montaggio & fissaggio", "", "Pagina 16"]
        );
    }

    #[test]
    fn test_rewrite_replaces_by_index() {
        let mut replacements = BTreeMap::new();
        replacements.insert(0usize, "Montage & Befestigung");
        replacements.insert(2usize, "Seite 16");
        let rewritten = rewrite_contents(STORY, &replacements).unwrap();

        assert!(rewritten.contains("<Content>Montage &amp; Befestigung</Content>"));
        assert!(rewritten.contains("<Content>Seite 16</Content>"));
        assert!(!rewritten.contains("Montaggio"));

        // Reading the rewritten story yields the replacements in place.
        let contents = extract_contents(&rewritten).unwrap();
        assert_eq!(
            contents,
            vec!["Montage & Befestigung", "", "Seite 16"]
        );
    }

    #[test]
    fn test_rewrite_without_replacements_keeps_text() {
        let rewritten = rewrite_contents(STORY, &BTreeMap::new()).unwrap();
        let contents = extract_contents(&rewritten).unwrap();
        assert_eq!(contents, extract_contents(STORY).unwrap());
    }

    #[test]
    fn test_story_id_from_path() {
        assert_eq!(story_id_from_path("Stories/Story_u1000.xml"), "u1000");
        assert_eq!(story_id_from_path("Story_ua3.xml"), "ua3");
    }

    #[test]
    fn test_designmap_order() {
        let xml = r#"<Document xmlns:idPkg="x">
            <idPkg:Story src="Stories/Story_b.xml"/>
            <idPkg:Story src="Stories/Story_a.xml"/>
        </Document>"#;
        assert_eq!(
            story_paths_from_designmap(xml).unwrap(),
            vec!["Stories/Story_b.xml", "Stories/Story_a.xml"]
        );
    }

    #[test]
    fn test_translatable_filter() {
        let g = Glossary::default();
        assert!(is_translatable("Verificare il fissaggio", &g));
        assert!(is_translatable("Pagina 16", &g));
        // Too short, punctuation, numbers.
        assert!(!is_translatable("a", &g));
        assert!(!is_translatable("---", &g));
        assert!(!is_translatable("16", &g));
        // Codes stay, common uppercase words go through.
        assert!(!is_translatable("ID_123", &g));
        assert!(is_translatable("ATTENZIONE", &g));
        // URLs and addresses.
        assert!(!is_translatable("https://example.com", &g));
        assert!(!is_translatable("info@example.com", &g));
        // Layout-internal values.
        assert!(!is_translatable("Swatch/None", &g));
        assert!(!is_translatable("C=0 M=0 Y=0 K=9", &g));
        assert!(!is_translatable("ParagraphStyle/Heading", &g));
        assert!(!is_translatable("#ff00aa", &g));
        assert!(!is_translatable("u1a2b3c", &g));
        // Glossary-protected terms.
        assert!(!is_translatable("EPDM", &g));
        assert!(!is_translatable("Myriad", &g));
    }
}
