//! Plain-text rendering for terminals.

use crate::date::PartialDate;
use crate::model::{IssueRecord, Role, SearchHit, SearchKind};

/// Configuration for plain text output
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Append the similarity score to each hit
    pub show_scores: bool,
    /// Wrap the summary at this width (0 = no wrapping)
    pub line_width: usize,
    /// Include the underlined series/number header
    pub include_header: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { show_scores: true, line_width: 80, include_header: true }
    }
}

/// Plain text formatter with configurable options
pub struct TextFormatter {
    config: TextConfig,
}

impl TextFormatter {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    pub fn hits(&self, hits: &[SearchHit]) -> String {
        hits_to_text(hits, &self.config)
    }

    pub fn record(&self, record: &IssueRecord) -> String {
        record_to_text(record, &self.config)
    }
}

/// Renders hits grouped under one heading per kind.
///
/// Groups keep the order of `hits`; each line is `slug  title`.
pub fn hits_to_text(hits: &[SearchHit], config: &TextConfig) -> String {
    let mut out = String::new();

    for kind in SearchKind::ALL {
        let group: Vec<&SearchHit> = hits.iter().filter(|hit| hit.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{} ({})\n", kind.label(), group.len()));

        for hit in group {
            out.push_str(&format!("  {}  {}", hit.slug, hit.title));
            if let (true, Some(score)) = (config.show_scores, hit.similarity_score) {
                out.push_str(&format!("  [{score:.1}]"));
            }
            out.push('\n');
        }
    }

    out
}

/// Renders a record as a header followed by `Label: value` rows.
///
/// Unknown fields are skipped; the summary goes last, wrapped at
/// `line_width`.
pub fn record_to_text(record: &IssueRecord, config: &TextConfig) -> String {
    let mut out = String::new();

    if config.include_header {
        out.push_str(&generate_header(record));
        out.push('\n');
    }

    let date = format_date(record.date());
    let price = record.price.map(|price| match &record.currency {
        Some(currency) => format!("{price:.2} {currency}"),
        None => format!("{price:.2}"),
    });

    let mut rows: Vec<(&str, Option<String>)> = vec![
        ("Title", record.title.clone()),
        ("Count", record.series_issue_count.map(|n| n.to_string())),
        ("Date", date),
        ("Publisher", publisher_line(record)),
        ("Collection", record.collection_name.clone()),
    ];

    for (label, role) in [
        ("Writer", Role::Writer),
        ("Penciller", Role::Penciller),
        ("Inker", Role::Inker),
        ("Colorist", Role::Colorist),
        ("Letterer", Role::Letterer),
        ("Cover", Role::CoverArtist),
        ("Editor", Role::Editor),
        ("Translator", Role::Translator),
    ] {
        rows.push((label, joined(record.credits(role))));
    }

    rows.extend([
        ("Genres", joined(&record.genres)),
        ("Format", record.format.clone()),
        ("Binding", record.binding.clone()),
        ("Pages", record.page_count.map(|n| n.to_string())),
        ("Size", record.dimensions.clone()),
        ("Color", record.color_info.clone()),
        ("Price", price),
        ("ISBN", record.isbn.clone()),
        ("Legal deposit", record.legal_deposit.clone()),
        ("Original", record.original_title.clone()),
        ("URL", record.url.clone()),
        ("Cover image", record.cover_url.clone()),
    ]);

    let width = rows
        .iter()
        .filter(|(_, value)| value.is_some())
        .map(|(label, _)| label.chars().count() + 1)
        .max()
        .unwrap_or(0);

    for (label, value) in rows {
        if let Some(value) = value {
            out.push_str(&format!("{:<width$}  {value}\n", format!("{label}:")));
        }
    }

    if let Some(summary) = &record.summary {
        out.push('\n');
        for paragraph in summary.split("\n\n") {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let text = if config.line_width > 0 { wrap_words(&words, config.line_width) } else { words.join(" ") };
            out.push_str(&text);
            out.push_str("\n\n");
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }

    out
}

fn generate_header(record: &IssueRecord) -> String {
    let heading = format!("{} #{}", record.series, record.number);
    format!("{heading}\n{}\n", "=".repeat(heading.chars().count()))
}

fn format_date(date: PartialDate) -> Option<String> {
    if date.is_empty() {
        return None;
    }
    match (date.year, date.month, date.day) {
        (Some(y), Some(m), Some(d)) => Some(format!("{y:04}-{m:02}-{d:02}")),
        (Some(y), Some(m), None) => Some(format!("{y:04}-{m:02}")),
        (Some(y), None, _) => Some(y.to_string()),
        _ => None,
    }
}

fn publisher_line(record: &IssueRecord) -> Option<String> {
    let publisher = record.publisher.as_ref()?;
    let place: Vec<&str> = [&record.publisher_location, &record.publisher_country]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .collect();
    if place.is_empty() { Some(publisher.clone()) } else { Some(format!("{publisher} ({})", place.join(", "))) }
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() { None } else { Some(values.join(", ")) }
}

/// Greedy word wrap; a word longer than `width` gets a line of its own.
fn wrap_words(words: &[&str], width: usize) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();

    for &word in words {
        if line.is_empty() {
            line.push_str(word);
        } else if line.chars().count() + 1 + word.chars().count() <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}
