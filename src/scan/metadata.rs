//! Source metadata extraction: EXIF capture time and XMP sidecar parsing.
//!
//! The capture time drives the year/month/day library layout. Ratings and
//! keywords come from the `.xmp` sidecar next to the image, when present;
//! a missing or unparseable sidecar simply means no metadata is applied.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

use crate::model::Location;

/// Metadata extracted from an XMP sidecar.
#[derive(Debug, Clone, Default)]
pub struct SidecarMetadata {
    /// Rating 0-5. Out-of-range values are clamped by the consumer.
    pub rating: Option<u32>,
    /// Keywords; hierarchical keywords use `|` as the path separator.
    pub keywords: Vec<String>,
}

/// Read the capture time from embedded EXIF data. EXIF carries no zone
/// information; values are interpreted as UTC.
pub fn read_time(path: &Path) -> Option<DateTime<Utc>> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let field = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .or_else(|| exif.get_field(exif::Tag::DateTime, exif::In::PRIMARY))?;

    let raw = field
        .display_value()
        .to_string()
        .trim_matches('"')
        .to_string();
    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S"))
        .ok()?;
    Some(naive.and_utc())
}

/// Read and parse the sidecar belonging to `image_path`, if one exists.
pub fn read_sidecar(image_path: &Path) -> Option<SidecarMetadata> {
    let sidecar = Location::from_path(image_path)?.sidecar().path();
    let content = std::fs::read_to_string(sidecar).ok()?;
    Some(parse_xmp(&content))
}

/// Extract rating and keywords from XMP text. Tolerant of both attribute
/// and element form for the rating, and of both flat (`dc:subject`) and
/// hierarchical (`lr:hierarchicalSubject`) keyword bags.
pub fn parse_xmp(content: &str) -> SidecarMetadata {
    static RATING_ATTR: OnceLock<Regex> = OnceLock::new();
    static RATING_ELEM: OnceLock<Regex> = OnceLock::new();
    static SUBJECT_BLOCK: OnceLock<Regex> = OnceLock::new();
    static LIST_ITEM: OnceLock<Regex> = OnceLock::new();

    let rating_attr =
        RATING_ATTR.get_or_init(|| Regex::new(r#"xmp:Rating\s*=\s*"(-?\d+)""#).unwrap());
    let rating_elem =
        RATING_ELEM.get_or_init(|| Regex::new(r"<xmp:Rating>\s*(-?\d+)\s*</xmp:Rating>").unwrap());
    let subject_block = SUBJECT_BLOCK.get_or_init(|| {
        Regex::new(r"(?s)<(dc:subject|lr:hierarchicalSubject)>(.*?)</(dc:subject|lr:hierarchicalSubject)>")
            .unwrap()
    });
    let list_item = LIST_ITEM.get_or_init(|| Regex::new(r"<rdf:li[^>]*>([^<]+)</rdf:li>").unwrap());

    let rating = rating_attr
        .captures(content)
        .or_else(|| rating_elem.captures(content))
        .and_then(|c| c[1].parse::<i64>().ok())
        .map(|r| r.clamp(0, 5) as u32);

    let mut keywords = Vec::new();
    for block in subject_block.captures_iter(content) {
        for item in list_item.captures_iter(&block[2]) {
            let keyword = item[1].trim().to_string();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }

    SidecarMetadata { rating, keywords }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description xmp:Rating="4">
   <dc:subject>
    <rdf:Bag>
     <rdf:li>holiday</rdf:li>
     <rdf:li>Places|Italy|Rome</rdf:li>
    </rdf:Bag>
   </dc:subject>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;

    #[test]
    fn test_parse_rating_and_keywords() {
        let meta = parse_xmp(SAMPLE);
        assert_eq!(meta.rating, Some(4));
        assert_eq!(meta.keywords, vec!["holiday", "Places|Italy|Rome"]);
    }

    #[test]
    fn test_rating_element_form_and_clamping() {
        let meta = parse_xmp("<xmp:Rating>9</xmp:Rating>");
        assert_eq!(meta.rating, Some(5));
        let meta = parse_xmp("<xmp:Rating>-1</xmp:Rating>");
        assert_eq!(meta.rating, Some(0));
    }

    #[test]
    fn test_empty_xmp_yields_nothing() {
        let meta = parse_xmp("<x:xmpmeta></x:xmpmeta>");
        assert_eq!(meta.rating, None);
        assert!(meta.keywords.is_empty());
    }

    #[test]
    fn test_read_sidecar_next_to_image() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("img001.jpg");
        std::fs::write(&image, b"pixels").unwrap();
        std::fs::write(dir.path().join("img001.xmp"), SAMPLE).unwrap();

        let meta = read_sidecar(&image).unwrap();
        assert_eq!(meta.rating, Some(4));

        let lonely = dir.path().join("other.jpg");
        std::fs::write(&lonely, b"pixels").unwrap();
        assert!(read_sidecar(&lonely).is_none());
    }

    #[test]
    fn test_read_time_falls_back_on_non_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.jpg");
        std::fs::write(&path, b"not a real jpeg").unwrap();
        assert!(read_time(&path).is_none());
    }
}
