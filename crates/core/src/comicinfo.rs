//! ComicInfo.xml generation.
//!
//! The document follows the ComicInfo schema read by comic library managers.
//! Elements are written in a fixed order (identity, dates, credits,
//! description, publisher, web link, notes) and only when the record has a
//! value for them. Catalog fields with no schema slot are packed into
//! `Notes` as `Label: value` lines.
//!
//! The XML is written by hand: the schema is flat and the output must be
//! byte-stable for a given record.

use crate::model::IssueRecord;
use crate::normalize::fold;

/// Name of the metadata entry inside a comic archive.
pub const COMICINFO_ENTRY: &str = "ComicInfo.xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const NAMESPACES: &str =
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#;

/// Options for the generated document.
#[derive(Debug, Clone)]
pub struct ComicInfoConfig {
    /// Value of `LanguageISO`; `None` omits the element.
    pub language_iso: Option<String>,
    /// Whether the root element declares the `xsi`/`xsd` namespaces.
    pub include_namespaces: bool,
}

impl Default for ComicInfoConfig {
    fn default() -> Self {
        Self { language_iso: Some("es".to_string()), include_namespaces: true }
    }
}

/// Generates a ComicInfo document with the default options.
///
/// # Example
///
/// ```rust
/// use tebeo_core::{IssueRecord, generate_comicinfo};
///
/// let mut record = IssueRecord::new("VALERIAN (1978, GRIJALBO)", "1");
/// record.isbn = Some("978-84-19949-45-5".to_string());
///
/// let xml = generate_comicinfo(&record);
/// assert!(xml.contains("<Number>1</Number>"));
/// assert!(xml.contains("ISBN: 978-84-19949-45-5"));
/// assert!(!xml.contains("<Writer>"));
/// ```
pub fn generate_comicinfo(record: &IssueRecord) -> String {
    generate_comicinfo_with_config(record, &ComicInfoConfig::default())
}

/// Generates a ComicInfo document.
///
/// Identical inputs always produce identical bytes.
pub fn generate_comicinfo_with_config(record: &IssueRecord, config: &ComicInfoConfig) -> String {
    let mut xml = XmlWriter::new();

    xml.line(XML_DECLARATION);
    let namespaces = if config.include_namespaces { NAMESPACES } else { "" };
    xml.line(&format!("<ComicInfo{namespaces}>"));

    xml.opt("Title", record.title.as_deref());
    xml.element("Series", &record.series);
    xml.element("Number", &record.number);
    xml.opt("Count", record.series_issue_count);
    xml.opt("Volume", record.volume);

    xml.opt("Year", record.year);
    xml.opt("Month", record.month);
    xml.opt("Day", record.day);

    xml.list("Writer", &record.writers);
    xml.list("Penciller", &record.pencillers);
    xml.list("Inker", &record.inkers);
    xml.list("Colorist", &record.colorists);
    xml.list("Letterer", &record.letterers);
    xml.list("CoverArtist", &record.cover_artists);
    xml.list("Editor", &record.editors);

    xml.opt("Summary", record.summary.as_deref());
    xml.list("Genre", &record.genres);
    xml.opt("PageCount", record.page_count);
    xml.opt("Format", record.format.as_deref());
    xml.opt("BlackAndWhite", record.color_info.as_deref().map(black_and_white));
    xml.opt("LanguageISO", config.language_iso.as_deref());

    xml.opt("Publisher", record.publisher.as_deref());
    xml.opt("SeriesGroup", record.collection_name.as_deref());

    xml.opt("Web", record.url.as_deref());

    xml.opt("Notes", comicinfo_notes(record).as_deref());

    xml.line("</ComicInfo>");
    xml.finish()
}

/// Packs the catalog fields without a schema element into note lines.
///
/// Lines appear in a fixed order and only for populated fields. Returns
/// `None` when none are populated.
///
/// ```rust
/// use tebeo_core::IssueRecord;
/// use tebeo_core::comicinfo::comicinfo_notes;
///
/// let mut record = IssueRecord::new("VALERIAN", "1");
/// record.price = Some(18.0);
/// record.currency = Some("EUR".to_string());
/// record.binding = Some("CARTONÉ".to_string());
///
/// assert_eq!(comicinfo_notes(&record).unwrap(), "Precio: 18.00 EUR\nEncuadernación: CARTONÉ");
/// ```
pub fn comicinfo_notes(record: &IssueRecord) -> Option<String> {
    let price = record.price.map(|price| match &record.currency {
        Some(currency) => format!("{price:.2} {currency}"),
        None => format!("{price:.2}"),
    });

    let lines: Vec<String> = [
        ("ISBN", record.isbn.clone()),
        ("Depósito Legal", record.legal_deposit.clone()),
        ("Precio", price),
        ("Título Original", record.original_title.clone()),
        ("Editorial Original", record.original_publisher.clone()),
        ("País Original", record.original_country.clone()),
        ("Encuadernación", record.binding.clone()),
        ("Dimensiones", record.dimensions.clone()),
        ("Traductores", joined(&record.translators)),
        ("Lengua", record.language_note.clone()),
        ("Adaptación de", joined(&record.adapted_authors)),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|value| format!("{label}: {value}")))
    .collect();

    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

fn black_and_white(color: &str) -> &'static str {
    let color = fold(color);
    if color.contains("b/n") || color.contains("blanco y negro") { "Yes" } else { "No" }
}

fn joined(names: &[String]) -> Option<String> {
    if names.is_empty() { None } else { Some(names.join(", ")) }
}

/// Escapes text for element content.
///
/// Characters XML 1.0 cannot carry (most C0 controls) are dropped.
fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if c.is_control() && (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn line(&mut self, raw: &str) {
        self.buf.push_str(raw);
        self.buf.push('\n');
    }

    fn element(&mut self, tag: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.buf.push_str(&format!("  <{tag}>{}</{tag}>\n", xml_escape(value)));
    }

    fn opt<T: ToString>(&mut self, tag: &str, value: Option<T>) {
        if let Some(value) = value {
            self.element(tag, &value.to_string());
        }
    }

    fn list(&mut self, tag: &str, values: &[String]) {
        self.opt(tag, joined(values));
    }

    fn finish(self) -> String {
        self.buf
    }
}
