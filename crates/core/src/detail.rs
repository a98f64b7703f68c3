//! Issue detail page parsing.
//!
//! The detail page is assembled from a handful of independent blocks:
//!
//! - the heading (`div#titulo_ficha div.titulo`): series in a `span`, issue
//!   title after the line break
//! - the numbering line: `<strong>Nº</strong> 1 de <a href="/colecciones/…">…</a> [de 24]`
//! - the publisher link (`/entidades/`) with its location and country flag
//! - labelled rows (`div.row-fluid` holding an `etiqueta` and a `dato`)
//! - the credits list (`span.tab_subtitulo` role labels followed by links)
//! - the genre tab, the synopsis and the cover images
//!
//! Only the series and the number are required. Every other block degrades
//! to an unknown value on its own when it is missing or malformed.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::date::find_spanish_date;
use crate::fetch::DEFAULT_BASE_URL;
use crate::model::{IssueRecord, Role};
use crate::normalize::{clean_multiline, clean_text, fold};
use crate::parse::{ChildNode, Document, Element};
use crate::results::absolutize;
use crate::{Result, TebeoError};

static DEFAULT_BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(DEFAULT_BASE_URL).unwrap());

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)N[º°o]\.?\s*(\d+)").unwrap());
static COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[de\s+(\d+)\]").unwrap());
static VOLUME_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d{4})").unwrap());
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d.,]*)\s*(€|euros?\b|\$|ptas\b\.?|pesetas\b)").unwrap());
static PAGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*p").unwrap());
static ISBN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)ISBN:?\s*([\dXx][\dXx\-]*)").unwrap());
static LEGAL_DEPOSIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:dep(?:[óo]sito)?\.?\s*legal|d\.\s?l\.)\s*[:.]?\s*(\S+)").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const SYNOPSIS_MARKERS: [&str; 4] = [
    "comentario de la editorial",
    "información de la editorial",
    "promoción editorial",
    "argumento",
];
const MAX_SYNOPSIS_PARAGRAPHS: usize = 10;
const SKIP_WORDS: [&str; 8] = ["isbn", "depósito", "precio", "páginas", "formato", "tamaño", "color", "lengua"];
const STORY_WORDS: [&str; 8] = ["historia", "personaje", "aventura", "narra", "cuenta", "viaje", "muerte", "vida"];

/// Parses an issue detail page against the public site address.
///
/// See [`parse_issue_with_base`].
pub fn parse_issue(html: &str) -> Result<IssueRecord> {
    parse_issue_with_base(html, &DEFAULT_BASE)
}

/// Parses an issue detail page into a full record.
///
/// Link and image URLs are made absolute against `base`. The returned
/// record leaves `slug` and `url` unset. The series comes from the heading
/// `span` when present, otherwise from the collection link text.
///
/// # Errors
///
/// Returns [`TebeoError::UnparsableDetail`] naming the first missing
/// identity field (`series` or `number`).
///
/// # Example
///
/// ```rust
/// use tebeo_core::parse_issue;
///
/// let html = r#"
///     <div id="titulo_ficha"><div class="titulo"><span>VALERIAN (1978, GRIJALBO)</span><br>LA CIUDAD</div></div>
///     <p><strong>Nº</strong> 1 de <a href="/colecciones/valerian_1978_grijalbo.html">VALERIAN</a> [de 21]</p>
/// "#;
///
/// let record = parse_issue(html).unwrap();
/// assert_eq!(record.series, "VALERIAN (1978, GRIJALBO)");
/// assert_eq!(record.number, "1");
/// assert_eq!(record.series_issue_count, Some(21));
/// assert_eq!(record.volume, Some(1978));
/// assert!(record.isbn.is_none());
/// ```
pub fn parse_issue_with_base(html: &str, base: &Url) -> Result<IssueRecord> {
    let doc = Document::parse_with_preprocessing(html);
    let mut record = IssueRecord::default();

    let (series, title) = extract_heading(&doc)?;
    record.title = title;

    let numbering = extract_numbering(&doc, base)?;
    record.series_issue_count = numbering.count;
    record.collection_url = numbering.collection_url;
    record.collection_name = numbering.collection_name.clone();

    record.series = series
        .or(numbering.collection_name)
        .ok_or_else(|| TebeoError::UnparsableDetail("series".to_string()))?;
    record.number = numbering
        .number
        .ok_or_else(|| TebeoError::UnparsableDetail("number".to_string()))?;

    extract_publisher(&doc, &mut record)?;
    extract_field_rows(&doc, &mut record)?;
    extract_credits(&doc, &mut record)?;

    record.genres = doc
        .select("div.tab-pane.active#tab1 a")?
        .iter()
        .map(Element::clean_text)
        .filter(|genre| !genre.is_empty())
        .collect();

    record.summary = extract_synopsis(&doc)?;
    extract_images(&doc, base, &mut record)?;

    record.volume = VOLUME_YEAR
        .captures(&record.series)
        .and_then(|caps| caps[1].parse().ok());

    tracing::debug!(series = %record.series, number = %record.number, "parsed issue page");
    Ok(record)
}

/// Series and issue title from the page heading.
fn extract_heading(doc: &Document) -> Result<(Option<String>, Option<String>)> {
    let heading = match doc.select_first("div#titulo_ficha div.titulo")? {
        Some(heading) => heading,
        None => {
            let title = doc.select_first("div.titulo")?.map(|el| el.clean_text());
            return Ok((None, title.and_then(non_empty)));
        }
    };

    let Some(span) = heading.select_first("span")? else {
        return Ok((None, non_empty(heading.clean_text())));
    };

    let mut after_span = String::new();
    let mut seen_span = false;
    for child in heading.children() {
        match child {
            ChildNode::Element(el) if el.tag_name() == "span" && !seen_span => seen_span = true,
            ChildNode::Element(el) if el.tag_name() == "br" => {}
            ChildNode::Element(el) if seen_span => after_span.push_str(&el.text()),
            ChildNode::Text(text) if seen_span => after_span.push_str(text),
            _ => {}
        }
    }

    Ok((non_empty(span.clean_text()), non_empty(clean_text(&after_span))))
}

#[derive(Debug, Default)]
struct Numbering {
    number: Option<String>,
    count: Option<u32>,
    collection_name: Option<String>,
    collection_url: Option<String>,
}

/// The "Nº 1 de SERIE [de 21]" line.
fn extract_numbering(doc: &Document, base: &Url) -> Result<Numbering> {
    let mut numbering = Numbering::default();

    let marker = doc.select("strong")?.into_iter().find(|strong| {
        let text = strong.clean_text();
        text.contains('º') || text.contains('°')
    });
    let Some(line) = marker.and_then(|strong| strong.parent()) else {
        return Ok(numbering);
    };

    let text = clean_text(&line.text());
    numbering.number = NUMBER.captures(&text).map(|caps| caps[1].to_string());
    numbering.count = COUNT.captures(&text).and_then(|caps| caps[1].parse().ok());

    if let Some(link) = line.select_first("a[href*='/colecciones/']")? {
        numbering.collection_name = non_empty(link.clean_text());
        numbering.collection_url = link.attr("href").map(|href| absolutize(base, href));
    }

    Ok(numbering)
}

/// Publisher name with the location and country that follow its link.
///
/// Links inside data rows belong to the original edition and are skipped.
fn extract_publisher(doc: &Document, record: &mut IssueRecord) -> Result<()> {
    let link = doc.select("a[href*='/entidades/']")?.into_iter().find(|link| {
        !link.clean_text().is_empty() && !link.has_ancestor(|el| el.has_class("dato"))
    });
    let Some(link) = link else {
        return Ok(());
    };

    record.publisher = non_empty(link.clean_text());
    record.publisher_location = link
        .next_elements()
        .find(|el| el.tag_name() == "span")
        .and_then(|span| non_empty(span.clean_text()));
    record.publisher_country = link
        .next_elements()
        .find(|el| el.tag_name() == "img")
        .and_then(|img| img.attr("alt"))
        .and_then(|alt| non_empty(clean_text(alt)));

    Ok(())
}

/// Dispatches every labelled `etiqueta`/`dato` row by its folded label.
fn extract_field_rows(doc: &Document, record: &mut IssueRecord) -> Result<()> {
    for row in doc.select("div.row-fluid")? {
        let (Some(label), Some(value)) = (
            row.select_first("div[class*='etiqueta']")?,
            row.select_first("div.dato")?,
        ) else {
            continue;
        };

        let label = fold(&label.clean_text());
        let text = value.clean_text();
        tracing::debug!(label = %label, "field row");

        if label.contains("distribuci") {
            match find_spanish_date(&text) {
                Some(date) => record.set_date(date),
                None => tracing::warn!(value = %text, "no date in distribution row"),
            }
            if let Some((price, currency)) = parse_price(&text) {
                record.price = Some(price);
                record.currency = Some(currency.to_string());
            }
            record.distribution_countries = image_alts(&value)?;
        } else if label.contains("edici") {
            let links = link_texts(&value)?;
            record.edition = links.first().cloned();
            record.publication_type = links.get(1).cloned();
            record.format = links.get(2).cloned();
        } else if label.contains("origen") {
            record.original_title = leading_text(&value).or_else(|| non_empty(text.clone()));
            record.original_publisher = value
                .select_first("a[href*='/entidades/']")?
                .and_then(|link| non_empty(link.clean_text()));
            record.original_country = image_alts(&value)?.into_iter().next();
        } else if label.contains("lengua") {
            record.language_note = non_empty(text);
        } else if label.contains("formato") {
            let links = link_texts(&value)?;
            if record.format.is_none() {
                record.format = links.first().cloned();
            }
            if let Some(binding) = links.get(1) {
                record.binding = Some(binding.clone());
            }
        } else if label.contains("tama") {
            record.dimensions = non_empty(text);
        } else if label.contains("paginaci") {
            record.page_count = PAGES.captures(&text).and_then(|caps| caps[1].parse().ok());
        } else if label.contains("color") {
            record.color_info = non_empty(text);
        } else if label.contains("registros") {
            record.isbn = ISBN.captures(&text).map(|caps| caps[1].trim_end_matches('-').to_string());
            record.legal_deposit = LEGAL_DEPOSIT
                .captures(&text)
                .map(|caps| caps[1].trim_end_matches(['.', ',', ';']).to_string());
        }
    }

    Ok(())
}

/// Maps a credit label to the roles it fills.
///
/// Labels are compared folded and with any counter digits removed.
/// Unknown labels map to nothing.
pub fn roles_for_label(label: &str) -> &'static [Role] {
    let label = DIGITS.replace_all(label, "");
    let label = fold(label.trim().trim_end_matches(':').trim_end());
    if label.contains("historietista") {
        &[Role::Writer, Role::Penciller]
    } else if label.contains("guion") {
        &[Role::Writer]
    } else if label.contains("dibuj") {
        &[Role::Penciller]
    } else if label.contains("tint") {
        &[Role::Inker]
    } else if label.contains("color") {
        &[Role::Colorist]
    } else if label.contains("letr") || label.contains("rotul") {
        &[Role::Letterer]
    } else if label.contains("portad") || label.contains("cubierta") {
        &[Role::CoverArtist]
    } else if label.contains("editor") || label == "edicion" {
        &[Role::Editor]
    } else if label.contains("traduc") {
        &[Role::Translator]
    } else if label.contains("adapt") {
        &[Role::Adapter]
    } else {
        &[]
    }
}

/// Credits: each `span.tab_subtitulo` is followed by the links of that role,
/// up to the next role label or block element.
fn extract_credits(doc: &Document, record: &mut IssueRecord) -> Result<()> {
    for label in doc.select("span.tab_subtitulo")? {
        let label_text = label.clean_text();
        let roles = roles_for_label(&label_text);
        if roles.is_empty() {
            tracing::debug!(role = %label_text, "ignoring unknown credit role");
            continue;
        }

        for sibling in label.next_elements() {
            let tag = sibling.tag_name();
            if tag == "div" || tag == "p" || sibling.has_class("tab_subtitulo") {
                break;
            }
            if tag != "a" {
                continue;
            }
            let name = sibling.clean_text();
            for role in roles {
                record.add_credit(*role, &name);
            }
        }
    }

    Ok(())
}

/// Synopsis, from the most to the least reliable source:
/// paragraphs after an editorial marker, `p.texto` paragraphs, then the
/// best-scoring long paragraph on the page.
fn extract_synopsis(doc: &Document) -> Result<Option<String>> {
    for marker in SYNOPSIS_MARKERS {
        for (text, parent) in doc.text_nodes() {
            if !text.to_lowercase().contains(marker) {
                continue;
            }
            let paragraphs: Vec<String> = parent
                .next_elements()
                .take_while(|el| !matches!(el.tag_name().as_str(), "h2" | "h3" | "h4" | "div"))
                .filter(|el| el.tag_name() == "p")
                .map(|p| clean_multiline(&p.inner_html()))
                .filter(|text| text.chars().count() > 20)
                .take(MAX_SYNOPSIS_PARAGRAPHS)
                .collect();

            let combined = paragraphs.join("\n\n");
            if combined.chars().count() > 50 {
                return Ok(Some(combined));
            }
        }
    }

    let texto: Vec<String> = doc
        .select("p.texto")?
        .iter()
        .map(|p| clean_multiline(&p.inner_html()))
        .filter(|text| text.chars().count() > 10)
        .collect();
    let combined = texto.join("\n\n");
    if combined.chars().count() > 50 {
        return Ok(Some(combined));
    }

    let best = doc
        .select("p")?
        .iter()
        .map(|p| clean_multiline(&p.inner_html()))
        .filter_map(|text| paragraph_score(&text).map(|score| (score, text)))
        .fold(None::<(i64, String)>, |best, (score, text)| match best {
            Some((top, _)) if top >= score => best,
            _ => Some((score, text)),
        });

    Ok(best.filter(|(score, _)| *score > 0).map(|(_, text)| text))
}

/// Scores a paragraph as synopsis prose. `None` for short paragraphs and for
/// ones that read like a technical data sheet.
fn paragraph_score(text: &str) -> Option<i64> {
    let length = text.chars().count();
    if length <= 50 {
        return None;
    }

    let lower = text.to_lowercase();
    let skip = SKIP_WORDS.iter().filter(|word| lower.contains(*word)).count() as i64;
    let story = STORY_WORDS.iter().filter(|word| lower.contains(*word)).count() as i64;
    let quoted = text.contains(['"', '\u{201c}', '\u{201d}']);

    if skip >= 2 && story == 0 && !quoted {
        return None;
    }

    let mut score = length as i64;
    if story > 0 || quoted {
        score += 500 * story;
        if quoted {
            score += 300;
        }
        score -= 50 * skip;
    } else {
        score -= 150 * skip;
    }
    Some(score)
}

fn extract_images(doc: &Document, base: &Url, record: &mut IssueRecord) -> Result<()> {
    if let Some(src) = doc.select_first("img#img_principal")?.and_then(|img| img.attr("src")) {
        let cover = absolutize(base, src);
        record.image_urls.push(cover.clone());
        record.cover_url = Some(cover);
    }

    for img in doc.select("img[src*='T3_numeros']")? {
        let Some(src) = img.attr("src") else { continue };
        let url = absolutize(base, src);
        if !record.image_urls.contains(&url) {
            record.image_urls.push(url);
        }
    }

    Ok(())
}

/// Reads a price such as "18,00 €", "1.500 ptas" or "12.99 $".
///
/// Returns the amount with its ISO currency code.
pub fn parse_price(text: &str) -> Option<(f64, &'static str)> {
    let caps = PRICE.captures(text)?;
    let unit = caps[2].to_lowercase();
    let currency = if unit == "€" || unit.starts_with("euro") {
        "EUR"
    } else if unit == "$" {
        "USD"
    } else {
        "ESP"
    };
    parse_amount(&caps[1]).map(|amount| (amount, currency))
}

/// Handles decimal comma or point and thousand separators.
fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim_end_matches(['.', ',']);
    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(_), None) if raw.matches(',').count() == 1 => raw.replace(',', "."),
        (Some(_), None) => raw.replace(',', ""),
        (None, Some(dot)) if raw.matches('.').count() > 1 || raw.len() - dot - 1 == 3 => raw.replace('.', ""),
        _ => raw.to_string(),
    };
    normalized.parse().ok()
}

fn link_texts(value: &Element) -> Result<Vec<String>> {
    Ok(value
        .select("a")?
        .iter()
        .map(Element::clean_text)
        .filter(|text| !text.is_empty())
        .collect())
}

fn image_alts(value: &Element) -> Result<Vec<String>> {
    Ok(value
        .select("img[alt]")?
        .iter()
        .filter_map(|img| img.attr("alt"))
        .filter_map(|alt| non_empty(clean_text(alt)))
        .collect())
}

/// Text of a value cell up to its first nested element.
fn leading_text(value: &Element) -> Option<String> {
    let mut text = String::new();
    for child in value.children() {
        match child {
            ChildNode::Text(run) => text.push_str(run),
            ChildNode::Element(el) if el.tag_name() == "a" || el.tag_name() == "img" => break,
            ChildNode::Element(el) => text.push_str(&el.text()),
        }
    }
    let text = clean_text(&text);
    non_empty(text.trim_end_matches(['·', ',', '-', ':', ' ']).to_string())
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
