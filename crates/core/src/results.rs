//! Results page parsing.
//!
//! A results page is split into sections by `div.help-block` markers
//! ("Colecciones (2)", "Sagas (1)", "Números (3)", "Autores (2)"). The
//! `div.linea_resultados` fragments that follow a marker, up to the next
//! marker, belong to that section. Author sections are skipped.
//!
//! Collection pages and older result layouts have no markers. When the
//! marker path yields nothing, every fragment on the page is scanned
//! instead, with the kind taken from each link. Both paths go through
//! [`parse_fragment`].
//!
//! A fragment usually holds two anchors to the same URL: the first wraps the
//! thumbnail and has no text, the second carries the title. The first anchor
//! whose cleaned text is non-empty provides the title.

use std::collections::HashSet;
use std::sync::LazyLock;

use url::Url;

use crate::Result;
use crate::fetch::DEFAULT_BASE_URL;
use crate::model::{SearchHit, SearchKind};
use crate::normalize::fold;
use crate::parse::{Document, Element};
use crate::similarity::similarity;

static DEFAULT_BASE: LazyLock<Url> = LazyLock::new(|| Url::parse(DEFAULT_BASE_URL).unwrap());

const SECTION_MARKER: &str = "help-block";
const FRAGMENT_CLASS: &str = "linea_resultados";

/// What a section marker announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Catalog(SearchKind),
    Authors,
    Unknown,
}

fn classify_marker(label: &str) -> Section {
    let label = fold(label);
    if label.contains("coleccion") {
        Section::Catalog(SearchKind::Collection)
    } else if label.contains("saga") {
        Section::Catalog(SearchKind::Saga)
    } else if label.contains("numero") {
        Section::Catalog(SearchKind::Issue)
    } else if label.contains("autor") {
        Section::Authors
    } else {
        Section::Unknown
    }
}

/// Parses a results page against the public site address.
///
/// See [`parse_search_results_with_base`].
///
/// # Example
///
/// ```rust
/// use tebeo_core::{SearchKind, parse_search_results};
///
/// let html = r#"
///     <div class="help-block">Colecciones (1)</div>
///     <div class="linea_resultados">
///       <a href="/colecciones/valerian_1978_grijalbo.html"><img src="/T3_colecciones/v.jpg"></a>
///       <a href="/colecciones/valerian_1978_grijalbo.html">VALERIAN (1978, GRIJALBO)</a>
///     </div>
/// "#;
///
/// let hits = parse_search_results(html, Some("valerian")).unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].kind, SearchKind::Collection);
/// assert_eq!(hits[0].title, "VALERIAN (1978, GRIJALBO)");
/// ```
pub fn parse_search_results(html: &str, query: Option<&str>) -> Result<Vec<SearchHit>> {
    parse_search_results_with_base(html, query, &DEFAULT_BASE)
}

/// Parses a results or collection page into hits.
///
/// Hits are grouped Issue, Collection, Saga. With a non-blank `query`
/// every hit gets a similarity score and each group is ordered by
/// descending score; ties keep page order. Fragments without a titled link
/// are dropped silently, and a slug seen twice within a kind keeps its
/// first occurrence.
///
/// # Errors
///
/// Only [`TebeoError::HtmlParseError`](crate::TebeoError::HtmlParseError),
/// which the fixed selectors used here do not trigger in practice.
pub fn parse_search_results_with_base(html: &str, query: Option<&str>, base: &Url) -> Result<Vec<SearchHit>> {
    let doc = Document::parse_with_preprocessing(html);

    let mut hits = parse_sections(&doc, base)?;
    if hits.is_empty() {
        tracing::debug!("no sectioned results, scanning all fragments");
        for fragment in doc.select(&format!("div[class*={FRAGMENT_CLASS}]"))? {
            hits.extend(parse_fragment(&fragment, None, base)?);
        }
    }

    let mut hits = dedup_slugs(hits);

    let query = query.map(str::trim).filter(|q| !q.is_empty());
    if let Some(query) = query {
        for hit in &mut hits {
            hit.similarity_score = Some(similarity(query, &hit.title));
        }
    }

    hits.sort_by(|a, b| {
        a.kind.cmp(&b.kind).then_with(|| {
            let a = a.similarity_score.unwrap_or(0.0);
            let b = b.similarity_score.unwrap_or(0.0);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    tracing::debug!(count = hits.len(), "parsed results page");
    Ok(hits)
}

fn parse_sections(doc: &Document, base: &Url) -> Result<Vec<SearchHit>> {
    let mut hits = Vec::new();

    for marker in doc.select(&format!("div.{SECTION_MARKER}"))? {
        let label = marker.clean_text();
        let kind = match classify_marker(&label) {
            Section::Catalog(kind) => kind,
            Section::Authors => {
                tracing::debug!(section = %label, "skipping author section");
                continue;
            }
            Section::Unknown => {
                tracing::debug!(section = %label, "skipping unknown section");
                continue;
            }
        };

        let before = hits.len();
        for sibling in marker.next_elements() {
            if sibling.has_class(SECTION_MARKER) {
                break;
            }
            if sibling.has_class_containing(FRAGMENT_CLASS) {
                hits.extend(parse_fragment(&sibling, Some(kind), base)?);
            } else {
                for nested in sibling.select(&format!("div[class*={FRAGMENT_CLASS}]"))? {
                    hits.extend(parse_fragment(&nested, Some(kind), base)?);
                }
            }
        }
        tracing::debug!(section = %label, found = hits.len() - before, "parsed section");
    }

    Ok(hits)
}

/// Extracts one hit from a result fragment.
///
/// Anchors are visited in document order. Only links to catalog pages are
/// considered, and when `kind` is given only links of that kind. The first
/// such anchor with non-empty cleaned text supplies the title, slug and URL.
/// Returns `None` when no anchor qualifies.
pub fn parse_fragment(fragment: &Element, kind: Option<SearchKind>, base: &Url) -> Result<Option<SearchHit>> {
    let titled = fragment.select("a[href]")?.into_iter().find_map(|anchor| {
        let href = anchor.attr("href")?;
        let (link_kind, slug) = SearchKind::from_href(href)?;
        if kind.is_some_and(|wanted| wanted != link_kind) {
            return None;
        }
        let title = anchor.clean_text();
        if title.is_empty() {
            return None;
        }
        Some((link_kind, slug, title, href))
    });

    let Some((kind, slug, title, href)) = titled else {
        tracing::debug!("dropping result fragment without a titled link");
        return Ok(None);
    };

    let thumbnail_url = fragment
        .select_first("img[src]")?
        .and_then(|img| img.attr("src"))
        .map(|src| absolutize(base, src));

    let (series_name, issue_number, issue_title) = match kind {
        SearchKind::Issue => (series_prefix(&title), trailing_number(&slug), issue_title(&title)),
        SearchKind::Collection | SearchKind::Saga => (Some(title.clone()), None, None),
    };

    Ok(Some(SearchHit {
        kind,
        url: absolutize(base, href),
        slug,
        title,
        similarity_score: None,
        thumbnail_url,
        series_name,
        issue_number,
        issue_title,
    }))
}

fn dedup_slugs(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| {
            let fresh = seen.insert((hit.kind, hit.slug.clone()));
            if !fresh {
                tracing::warn!(slug = %hit.slug, kind = %hit.kind, "dropping duplicate result");
            }
            fresh
        })
        .collect()
}

pub(crate) fn absolutize(base: &Url, href: &str) -> String {
    base.join(href).map(String::from).unwrap_or_else(|_| href.to_string())
}

/// "VALERIAN (1978, GRIJALBO) 1 : LA CIUDAD" gives "VALERIAN".
fn series_prefix(title: &str) -> Option<String> {
    let (prefix, _) = title.split_once('(')?;
    let prefix = prefix.trim();
    (!prefix.is_empty()).then(|| prefix.to_string())
}

/// "VALERIAN (1978, GRIJALBO) 2 : EL IMPERIO" gives "EL IMPERIO".
fn issue_title(title: &str) -> Option<String> {
    let (_, after_group) = title.split_once(')')?;
    let (_, name) = after_group.split_once(':')?;
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// "valerian_1978_grijalbo_12" gives "12".
fn trailing_number(slug: &str) -> Option<String> {
    let (_, tail) = slug.rsplit_once('_')?;
    (!tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit())).then(|| tail.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED_PAGE: &str = r#"
        <div class="help-block">Sagas (1)</div>
        <div class="linea_resultados">
          <a href="/sagas/laureline.html"><img src="/T3_sagas/laureline.jpg"></a>
          <a href="/sagas/laureline.html">LAURELINE</a>
        </div>
        <div class="help-block">Números (2)</div>
        <div class="linea_resultados">
          <a href="/numeros/valerian_1978_grijalbo_2.html"><img src="/T3_numeros/v2.jpg"></a>
          <a href="/numeros/valerian_1978_grijalbo_2.html">VALERIAN (1978, GRIJALBO) 2 : EL IMPERIO</a>
        </div>
        <div class="linea_resultados">
          <a href="/numeros/valerian_1978_grijalbo_1.html"><img src="/T3_numeros/v1.jpg"></a>
        </div>
        <div class="help-block">Autores (1)</div>
        <div class="linea_resultados">
          <a href="/autores/christin.html">CHRISTIN, PIERRE</a>
        </div>
    "#;

    #[test]
    fn test_classify_marker() {
        assert_eq!(classify_marker("Colecciones (2)"), Section::Catalog(SearchKind::Collection));
        assert_eq!(classify_marker("Sagas (1)"), Section::Catalog(SearchKind::Saga));
        assert_eq!(classify_marker("NÚMEROS (3)"), Section::Catalog(SearchKind::Issue));
        assert_eq!(classify_marker("Autores (4)"), Section::Authors);
        assert_eq!(classify_marker("Entidades (1)"), Section::Unknown);
    }

    #[test]
    fn test_issues_first_and_textless_fragment_dropped() {
        let hits = parse_search_results(MIXED_PAGE, None).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].kind, SearchKind::Issue);
        assert_eq!(hits[0].slug, "valerian_1978_grijalbo_2");
        assert_eq!(hits[0].series_name.as_deref(), Some("VALERIAN"));
        assert_eq!(hits[0].issue_number.as_deref(), Some("2"));
        assert_eq!(hits[0].issue_title.as_deref(), Some("EL IMPERIO"));
        assert_eq!(hits[1].kind, SearchKind::Saga);
        assert_eq!(hits[1].series_name.as_deref(), Some("LAURELINE"));
        assert!(hits[1].issue_title.is_none());
        assert!(hits.iter().all(|hit| hit.similarity_score.is_none()));
    }

    #[test]
    fn test_urls_are_absolute() {
        let base = Url::parse("http://localhost:8080").unwrap();
        let hits = parse_search_results_with_base(MIXED_PAGE, None, &base).unwrap();

        assert_eq!(hits[0].url, "http://localhost:8080/numeros/valerian_1978_grijalbo_2.html");
        assert_eq!(hits[0].thumbnail_url.as_deref(), Some("http://localhost:8080/T3_numeros/v2.jpg"));
    }

    #[test]
    fn test_fallback_without_markers() {
        let html = r#"
            <div class="linea_resultados">
              <a href="/numeros/thorgal_1977_rosinski_12.html"><img src="/t.jpg"></a>
              <a href="/numeros/thorgal_1977_rosinski_12.html">THORGAL (1977, ROSINSKI) 12</a>
            </div>
            <div class="linea_resultados">
              <a href="/autores/rosinski.html">ROSINSKI</a>
            </div>
        "#;
        let hits = parse_search_results(html, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].issue_number.as_deref(), Some("12"));
    }

    #[test]
    fn test_section_kind_filters_links() {
        let html = r#"
            <div class="help-block">Colecciones (1)</div>
            <div class="linea_resultados">
              <a href="/sagas/otra.html">OTRA SAGA</a>
              <a href="/colecciones/buena.html">BUENA</a>
            </div>
        "#;
        let hits = parse_search_results(html, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, SearchKind::Collection);
        assert_eq!(hits[0].title, "BUENA");
    }

    #[test]
    fn test_duplicate_slugs_keep_first() {
        let html = r#"
            <div class="help-block">Colecciones (2)</div>
            <div class="linea_resultados"><a href="/colecciones/x.html">PRIMERA</a></div>
            <div class="linea_resultados"><a href="/colecciones/x.html">SEGUNDA</a></div>
        "#;
        let hits = parse_search_results(html, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "PRIMERA");
    }

    #[test]
    fn test_scores_order_within_kind_ties_keep_page_order() {
        let html = r#"
            <div class="help-block">Colecciones (3)</div>
            <div class="linea_resultados"><a href="/colecciones/a.html">ZIPI Y ZAPE</a></div>
            <div class="linea_resultados"><a href="/colecciones/b.html">VALERIAN (2010, NORMA)</a></div>
            <div class="linea_resultados"><a href="/colecciones/c.html">VALERIAN (2010, NORMA)</a></div>
        "#;
        let hits = parse_search_results(html, Some("valerian")).unwrap();
        let slugs: Vec<&str> = hits.iter().map(|hit| hit.slug.as_str()).collect();

        assert_eq!(slugs, vec!["b", "c", "a"]);
        assert!(hits[0].similarity_score.unwrap() > hits[2].similarity_score.unwrap());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(series_prefix("VALERIAN (1978, GRIJALBO) 1"), Some("VALERIAN".to_string()));
        assert_eq!(series_prefix("(1978)"), None);
        assert_eq!(series_prefix("SIN PARENTESIS"), None);
        assert_eq!(trailing_number("valerian_1978_grijalbo_1"), Some("1".to_string()));
        assert_eq!(trailing_number("valerian_saga"), None);
    }
}
