//! Catalog operations over a page source.
//!
//! [`Tebeosfera`] turns a [`Fetcher`] into the three lookups the front ends
//! need: search, the issues of one collection, and one issue in full.
//! Every call fetches and parses afresh; nothing is cached.

use url::Url;

use crate::detail::parse_issue_with_base;
use crate::fetch::{DEFAULT_BASE_URL, Fetcher};
use crate::model::{IssueRecord, SearchHit, SearchKind};
use crate::results::parse_search_results_with_base;
use crate::{Result, TebeoError};

#[cfg(feature = "fetch")]
use crate::fetch::{ConnectionConfig, HttpFetcher};

/// Database adapter for the tebeosfera.com catalog.
///
/// # Example
///
/// ```rust,no_run
/// use tebeo_core::{ConnectionConfig, Tebeosfera};
///
/// # async fn run() -> tebeo_core::Result<()> {
/// let db = Tebeosfera::connect(&ConnectionConfig::default())?;
/// let hits = db.search("valerian").await?;
/// let issue = db.get_issue(&hits[0].slug).await?;
/// println!("{} #{}", issue.series, issue.number);
/// # Ok(())
/// # }
/// ```
pub struct Tebeosfera<F> {
    fetcher: F,
    base: Url,
}

#[cfg(feature = "fetch")]
impl Tebeosfera<HttpFetcher> {
    /// Creates an adapter that talks to the site over HTTP.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config)?;
        let base = fetcher.base_url().clone();
        Ok(Self { fetcher, base })
    }
}

impl<F: Fetcher> Tebeosfera<F> {
    /// Creates an adapter over any page source, resolving links against the
    /// public site address.
    pub fn with_fetcher(fetcher: F) -> Result<Self> {
        Self::with_fetcher_and_base(fetcher, DEFAULT_BASE_URL)
    }

    /// Creates an adapter over any page source with a custom site root.
    pub fn with_fetcher_and_base(fetcher: F, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| TebeoError::InvalidUrl(e.to_string()))?;
        Ok(Self { fetcher, base })
    }

    /// Searches the catalog.
    ///
    /// Hits come grouped Issue, Collection, Saga and scored against `query`.
    ///
    /// # Errors
    ///
    /// [`TebeoError::NotFound`] when the page has no catalog hits; fetch
    /// failures are passed through.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let path = search_path(query)?;
        let html = self.fetcher.fetch(&path).await?;

        let hits = parse_search_results_with_base(&html, Some(query), &self.base)?;
        if hits.is_empty() {
            return Err(TebeoError::NotFound(format!("search {query:?}")));
        }

        tracing::info!(query, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Lists the issues of one collection, in page order.
    pub async fn list_issues(&self, collection_slug: &str) -> Result<Vec<SearchHit>> {
        validate_slug(collection_slug)?;
        let path = format!("{}{collection_slug}.html", SearchKind::Collection.prefix());
        let html = self.fetcher.fetch(&path).await?;

        let issues: Vec<SearchHit> = parse_search_results_with_base(&html, None, &self.base)?
            .into_iter()
            .filter(|hit| hit.kind == SearchKind::Issue)
            .collect();
        if issues.is_empty() {
            return Err(TebeoError::NotFound(format!("issues of collection {collection_slug}")));
        }

        tracing::info!(collection = collection_slug, issues = issues.len(), "list issues");
        Ok(issues)
    }

    /// Fetches and parses one issue.
    ///
    /// The record's `slug` and `url` are set from the request.
    ///
    /// # Errors
    ///
    /// [`TebeoError::NotFound`] for an empty page,
    /// [`TebeoError::UnparsableDetail`] for a page without series or number.
    pub async fn get_issue(&self, issue_slug: &str) -> Result<IssueRecord> {
        validate_slug(issue_slug)?;
        let path = format!("{}{issue_slug}.html", SearchKind::Issue.prefix());
        let html = self.fetcher.fetch(&path).await?;

        if html.trim().is_empty() {
            return Err(TebeoError::NotFound(format!("issue {issue_slug}")));
        }

        let mut record = parse_issue_with_base(&html, &self.base)?;
        record.slug = Some(issue_slug.to_string());
        record.url = self.base.join(&path).ok().map(String::from);

        tracing::info!(issue = issue_slug, series = %record.series, number = %record.number, "get issue");
        Ok(record)
    }
}

/// `/buscador/<query with spaces as underscores>/`
fn search_path(query: &str) -> Result<String> {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|word| word.replace(['/', '?', '#', '%'], ""))
        .filter(|word| !word.is_empty())
        .collect();

    if words.is_empty() {
        return Err(TebeoError::InvalidUrl(format!("empty search query {query:?}")));
    }
    Ok(format!("/buscador/{}/", words.join("_")))
}

fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.contains(['/', '?', '#']) || slug.chars().any(char::is_whitespace) {
        return Err(TebeoError::InvalidUrl(format!("bad slug {slug:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned pages and records requested paths.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with_page(mut self, path: &str, html: &str) -> Self {
            self.pages.insert(path.to_string(), html.to_string());
            self
        }
    }

    impl Fetcher for StubFetcher {
        async fn fetch(&self, path: &str) -> Result<String> {
            self.requests.lock().unwrap().push(path.to_string());
            self.pages.get(path).cloned().ok_or_else(|| TebeoError::UnreachableSource {
                url: path.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn block_on<T>(future: impl std::future::Future<Output = T>) -> T {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    const RESULTS: &str = r#"
        <div class="help-block">Colecciones (1)</div>
        <div class="linea_resultados"><a href="/colecciones/valerian_1978_grijalbo.html">VALERIAN (1978, GRIJALBO)</a></div>
        <div class="help-block">Números (1)</div>
        <div class="linea_resultados"><a href="/numeros/valerian_1978_grijalbo_1.html">VALERIAN (1978, GRIJALBO) 1</a></div>
    "#;

    const ISSUE: &str = r#"
        <div id="titulo_ficha"><div class="titulo"><span>VALERIAN (1978, GRIJALBO)</span><br>LA CIUDAD</div></div>
        <p><strong>Nº</strong> 1 de <a href="/colecciones/valerian_1978_grijalbo.html">VALERIAN</a></p>
    "#;

    #[test]
    fn test_search_path() {
        assert_eq!(search_path("  valerian  agente ").unwrap(), "/buscador/valerian_agente/");
        assert_eq!(search_path("a/b?c").unwrap(), "/buscador/abc/");
        assert!(matches!(search_path("  "), Err(TebeoError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("valerian_1978_grijalbo_1").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("../etc").is_err());
        assert!(validate_slug("a b").is_err());
        assert!(validate_slug("a?b").is_err());
    }

    #[test]
    fn test_search() {
        let stub = StubFetcher::default().with_page("/buscador/valerian/", RESULTS);
        let db = Tebeosfera::with_fetcher(stub).unwrap();

        let hits = block_on(db.search("valerian")).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].kind, SearchKind::Issue);
        assert!(hits.iter().all(|hit| hit.similarity_score.is_some()));
    }

    #[test]
    fn test_search_no_hits_is_not_found() {
        let stub = StubFetcher::default().with_page("/buscador/nada/", "<html><body>Sin resultados</body></html>");
        let db = Tebeosfera::with_fetcher(stub).unwrap();

        let err = block_on(db.search("nada")).unwrap_err();
        assert!(matches!(err, TebeoError::NotFound(_)));
    }

    #[test]
    fn test_fetch_failure_propagates_without_retry() {
        let db = Tebeosfera::with_fetcher(StubFetcher::default()).unwrap();

        let err = block_on(db.get_issue("valerian_1978_grijalbo_1")).unwrap_err();

        assert!(matches!(err, TebeoError::UnreachableSource { .. }));
        assert_eq!(db.fetcher.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_list_issues_keeps_only_issues() {
        let stub = StubFetcher::default().with_page("/colecciones/valerian_1978_grijalbo.html", RESULTS);
        let db = Tebeosfera::with_fetcher(stub).unwrap();

        let issues = block_on(db.list_issues("valerian_1978_grijalbo")).unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].slug, "valerian_1978_grijalbo_1");
        assert!(issues[0].similarity_score.is_none());
    }

    #[test]
    fn test_get_issue_fills_identity() {
        let stub = StubFetcher::default().with_page("/numeros/valerian_1978_grijalbo_1.html", ISSUE);
        let db = Tebeosfera::with_fetcher_and_base(stub, "http://localhost:8080").unwrap();

        let record = block_on(db.get_issue("valerian_1978_grijalbo_1")).unwrap();

        assert_eq!(record.slug.as_deref(), Some("valerian_1978_grijalbo_1"));
        assert_eq!(record.url.as_deref(), Some("http://localhost:8080/numeros/valerian_1978_grijalbo_1.html"));
        assert_eq!(
            record.collection_url.as_deref(),
            Some("http://localhost:8080/colecciones/valerian_1978_grijalbo.html")
        );
    }

    #[test]
    fn test_get_issue_empty_page_is_not_found() {
        let stub = StubFetcher::default().with_page("/numeros/x.html", "  \n");
        let db = Tebeosfera::with_fetcher(stub).unwrap();

        assert!(matches!(block_on(db.get_issue("x")), Err(TebeoError::NotFound(_))));
    }

    #[test]
    fn test_bad_slug_never_fetches() {
        let db = Tebeosfera::with_fetcher(StubFetcher::default()).unwrap();

        assert!(matches!(block_on(db.get_issue("a/b")), Err(TebeoError::InvalidUrl(_))));
        assert!(db.fetcher.requests.lock().unwrap().is_empty());
    }
}
