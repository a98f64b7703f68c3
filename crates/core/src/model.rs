//! Typed records produced by the page parsers.
//!
//! A [`SearchHit`] is the lightweight row from a results or collection page;
//! its `slug` is what gets passed to the next fetch. An [`IssueRecord`] is the
//! full metadata for one issue. Every attribute a page may omit is an
//! `Option` or a list, so a missing value is a typed absence rather than an
//! empty string.

use serde::Serialize;

use crate::date::PartialDate;

/// Catalog entry kinds recognized on results pages.
///
/// The declaration order is the presentation order of a results list.
/// Author sections exist on the site but are not part of the catalog and
/// have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Issue,
    Collection,
    Saga,
}

impl SearchKind {
    pub const ALL: [SearchKind; 3] = [SearchKind::Issue, SearchKind::Collection, SearchKind::Saga];

    /// The URL path prefix that identifies this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            SearchKind::Issue => "/numeros/",
            SearchKind::Collection => "/colecciones/",
            SearchKind::Saga => "/sagas/",
        }
    }

    /// Human-readable label used by the text formatter.
    pub fn label(&self) -> &'static str {
        match self {
            SearchKind::Issue => "Issue",
            SearchKind::Collection => "Collection",
            SearchKind::Saga => "Saga",
        }
    }

    /// Splits an href into its kind and slug.
    ///
    /// Accepts site-relative paths and absolute URLs. The slug is the
    /// segment between the prefix and the `.html` suffix; anything else
    /// (author pages, nested paths, empty slugs) yields `None`.
    ///
    /// ```rust
    /// use tebeo_core::SearchKind;
    ///
    /// let (kind, slug) = SearchKind::from_href("/sagas/valerian.html").unwrap();
    /// assert_eq!(kind, SearchKind::Saga);
    /// assert_eq!(slug, "valerian");
    /// assert!(SearchKind::from_href("/autores/jean_claude_mezieres.html").is_none());
    /// ```
    pub fn from_href(href: &str) -> Option<(SearchKind, String)> {
        let path = href.split(['?', '#']).next().unwrap_or(href);
        Self::ALL.into_iter().find_map(|kind| {
            let start = path.find(kind.prefix())? + kind.prefix().len();
            let slug = path[start..].strip_suffix(".html")?;
            if slug.is_empty() || slug.contains('/') {
                return None;
            }
            Some((kind, slug.to_string()))
        })
    }
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One catalog entry found on a results or collection page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub kind: SearchKind,
    pub slug: String,
    /// Visible title. Never empty.
    pub title: String,
    pub url: String,
    /// Relevance to the query on a 0–100 scale, when a query was given.
    pub similarity_score: Option<f64>,
    pub thumbnail_url: Option<String>,
    /// For issues, the title up to its first parenthesised group. For
    /// collections and sagas, the title itself.
    pub series_name: Option<String>,
    /// For issues, the trailing number of the slug.
    pub issue_number: Option<String>,
    /// For issues, the text after the `:` that follows the series group.
    pub issue_title: Option<String>,
}

/// Contributor roles the detail page lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Writer,
    Penciller,
    Inker,
    Colorist,
    Letterer,
    CoverArtist,
    Editor,
    Translator,
    Adapter,
}

/// Full metadata for one issue.
///
/// Built by [`parse_issue`](crate::parse_issue); `slug` and `url` are filled
/// in by the database adapter, which knows what it requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueRecord {
    pub slug: Option<String>,
    pub url: Option<String>,
    pub series: String,
    pub number: String,
    pub series_issue_count: Option<u32>,
    pub title: Option<String>,
    pub volume: Option<u16>,

    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,

    pub summary: Option<String>,
    pub genres: Vec<String>,
    pub page_count: Option<u32>,
    pub color_info: Option<String>,

    pub publisher: Option<String>,
    pub publisher_location: Option<String>,
    pub publisher_country: Option<String>,
    pub collection_name: Option<String>,
    pub collection_url: Option<String>,

    pub isbn: Option<String>,
    pub legal_deposit: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub format: Option<String>,
    pub binding: Option<String>,
    pub dimensions: Option<String>,
    pub edition: Option<String>,
    pub publication_type: Option<String>,
    pub original_title: Option<String>,
    pub original_publisher: Option<String>,
    pub original_country: Option<String>,
    pub language_note: Option<String>,
    pub distribution_countries: Vec<String>,
    pub translators: Vec<String>,
    pub adapted_authors: Vec<String>,

    pub writers: Vec<String>,
    pub pencillers: Vec<String>,
    pub inkers: Vec<String>,
    pub colorists: Vec<String>,
    pub letterers: Vec<String>,
    pub cover_artists: Vec<String>,
    pub editors: Vec<String>,

    pub cover_url: Option<String>,
    pub image_urls: Vec<String>,
}

impl IssueRecord {
    /// Creates a record with only its identity set.
    pub fn new(series: impl Into<String>, number: impl Into<String>) -> Self {
        Self { series: series.into(), number: number.into(), ..Default::default() }
    }

    /// The publication date as a single value.
    pub fn date(&self) -> PartialDate {
        PartialDate { year: self.year, month: self.month, day: self.day }
    }

    /// Replaces all three date components.
    pub fn set_date(&mut self, date: PartialDate) {
        self.year = date.year;
        self.month = date.month;
        self.day = date.day;
    }

    /// The name list for a role.
    pub fn credits(&self, role: Role) -> &[String] {
        match role {
            Role::Writer => &self.writers,
            Role::Penciller => &self.pencillers,
            Role::Inker => &self.inkers,
            Role::Colorist => &self.colorists,
            Role::Letterer => &self.letterers,
            Role::CoverArtist => &self.cover_artists,
            Role::Editor => &self.editors,
            Role::Translator => &self.translators,
            Role::Adapter => &self.adapted_authors,
        }
    }

    /// Appends `name` to a role's list unless it is already there.
    ///
    /// Lists keep first-seen order.
    pub fn add_credit(&mut self, role: Role, name: &str) {
        let list = match role {
            Role::Writer => &mut self.writers,
            Role::Penciller => &mut self.pencillers,
            Role::Inker => &mut self.inkers,
            Role::Colorist => &mut self.colorists,
            Role::Letterer => &mut self.letterers,
            Role::CoverArtist => &mut self.cover_artists,
            Role::Editor => &mut self.editors,
            Role::Translator => &mut self.translators,
            Role::Adapter => &mut self.adapted_authors,
        };
        if !name.is_empty() && !list.iter().any(|existing| existing == name) {
            list.push(name.to_string());
        }
    }
}
