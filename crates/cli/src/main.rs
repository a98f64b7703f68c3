use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tebeo_core::{
    ComicInfoConfig, ConnectionConfig, DEFAULT_BASE_URL, HttpFetcher, IssueRecord, JsonConfig, JsonFormatter, SearchHit,
    SearchKind, Tebeosfera, TextConfig, TextFormatter, fetch_file, generate_comicinfo_with_config, inject_comicinfo,
    parse_issue_with_base, parse_search_results_with_base,
};
use url::Url;

mod echo;
mod logging;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Search tebeosfera.com and tag comic archives with ComicInfo.xml
#[derive(Parser, Debug)]
#[command(name = "tebeo")]
#[command(version)]
#[command(about = "Search tebeosfera.com and tag comic archives with ComicInfo.xml", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Site root to query
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    base_url: String,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum delay between requests in milliseconds
    #[arg(long, global = true, default_value = "1500", value_name = "MS")]
    delay_ms: u64,
}

impl ConnectionArgs {
    fn to_config(&self) -> ConnectionConfig {
        let mut builder = ConnectionConfig::builder()
            .base_url(&self.base_url)
            .timeout(self.timeout)
            .query_delay_ms(self.delay_ms);
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        builder.build()
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog for issues, collections and sagas
    Search {
        /// Words to search for
        #[arg(required = true, value_name = "QUERY")]
        query: Vec<String>,

        #[command(flatten)]
        page: PageArgs,
    },
    /// List the issues of a collection
    Series {
        /// Collection slug, e.g. valerian_1978_grijalbo
        #[arg(required_unless_present = "html", value_name = "SLUG")]
        slug: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Show the full record of one issue
    Issue {
        /// Issue slug, e.g. valerian_1978_grijalbo_1
        #[arg(required_unless_present = "html", value_name = "SLUG")]
        slug: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Print the ComicInfo.xml document for one issue
    Xml {
        /// Issue slug, e.g. valerian_1978_grijalbo_1
        #[arg(required_unless_present = "html", value_name = "SLUG")]
        slug: Option<String>,

        /// Parse a saved issue page instead of fetching
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Leave out the LanguageISO element
        #[arg(long)]
        no_language: bool,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Write ComicInfo.xml into a zip-based comic archive (.cbz)
    Inject {
        /// Archive to tag
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Issue slug to fetch metadata for
        #[arg(value_name = "SLUG")]
        slug: Option<String>,

        /// Parse a saved issue page instead of fetching
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Inject an existing ComicInfo.xml document as is
        #[arg(long, value_name = "FILE", conflicts_with_all = ["slug", "html"])]
        xml: Option<PathBuf>,

        /// Leave out the LanguageISO element
        #[arg(long)]
        no_language: bool,
    },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// Parse a saved page instead of fetching
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

struct App {
    config: ConnectionConfig,
    verbose: bool,
}

impl App {
    fn base(&self) -> anyhow::Result<Url> {
        Url::parse(&self.config.base_url).with_context(|| format!("Invalid base URL: {}", self.config.base_url))
    }

    fn connect(&self) -> anyhow::Result<Tebeosfera<HttpFetcher>> {
        if self.verbose {
            echo::print_step(&format!("Querying {}", self.config.base_url.bright_white().underline()));
        }
        Tebeosfera::connect(&self.config).context("Failed to set up the HTTP client")
    }

    fn read_page(&self, path: &Path) -> anyhow::Result<String> {
        if self.verbose {
            echo::print_step(&format!("Reading saved page {}", path.display().bright_white()));
        }
        let html = fetch_file(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
        if self.verbose {
            echo::print_detail("Size", &echo::format_size(html.len() as u64));
        }
        Ok(html)
    }

    async fn search(&self, query: &str, page: &PageArgs) -> anyhow::Result<()> {
        let hits = match &page.html {
            Some(path) => {
                let html = self.read_page(path)?;
                let hits = parse_search_results_with_base(&html, Some(query), &self.base()?)
                    .context("Failed to parse results page")?;
                if hits.is_empty() {
                    bail!("No results for {query:?} in {}", path.display());
                }
                hits
            }
            None => self
                .connect()?
                .search(query)
                .await
                .with_context(|| format!("Search for {query:?} failed"))?,
        };

        if self.verbose {
            echo::print_detail("Results", &hits.len().to_string());
        }
        emit(page.output.as_deref(), &Renderer::new(page.json).hits(&hits)?)
    }

    async fn series(&self, slug: Option<&str>, page: &PageArgs) -> anyhow::Result<()> {
        let issues = match (&page.html, slug) {
            (Some(path), _) => {
                let html = self.read_page(path)?;
                let issues: Vec<SearchHit> = parse_search_results_with_base(&html, None, &self.base()?)
                    .context("Failed to parse collection page")?
                    .into_iter()
                    .filter(|hit| hit.kind == SearchKind::Issue)
                    .collect();
                if issues.is_empty() {
                    bail!("No issues listed in {}", path.display());
                }
                issues
            }
            (None, Some(slug)) => self
                .connect()?
                .list_issues(slug)
                .await
                .with_context(|| format!("Failed to list issues of {slug}"))?,
            (None, None) => bail!("a collection slug or --html FILE is required"),
        };

        emit(page.output.as_deref(), &Renderer::new(page.json).hits(&issues)?)
    }

    async fn record(&self, slug: Option<&str>, html: Option<&Path>) -> anyhow::Result<IssueRecord> {
        match (html, slug) {
            (Some(path), slug) => {
                let page = self.read_page(path)?;
                let base = self.base()?;
                let mut record = parse_issue_with_base(&page, &base)
                    .with_context(|| format!("Failed to parse issue page {}", path.display()))?;
                if let Some(slug) = slug {
                    let issue_path = format!("{}{slug}.html", SearchKind::Issue.prefix());
                    record.url = base.join(&issue_path).ok().map(String::from);
                    record.slug = Some(slug.to_string());
                }
                Ok(record)
            }
            (None, Some(slug)) => self
                .connect()?
                .get_issue(slug)
                .await
                .with_context(|| format!("Failed to get issue {slug}")),
            (None, None) => bail!("an issue slug or --html FILE is required"),
        }
    }

    async fn issue(&self, slug: Option<&str>, page: &PageArgs) -> anyhow::Result<()> {
        let record = self.record(slug, page.html.as_deref()).await?;
        emit(page.output.as_deref(), &Renderer::new(page.json).record(&record)?)
    }

    async fn xml(
        &self, slug: Option<&str>, html: Option<&Path>, no_language: bool, output: Option<&Path>,
    ) -> anyhow::Result<()> {
        let record = self.record(slug, html).await?;
        let xml = generate_comicinfo_with_config(&record, &comicinfo_config(no_language));
        emit(output, &xml)
    }

    async fn inject(
        &self, archive: &Path, slug: Option<&str>, html: Option<&Path>, xml: Option<&Path>, no_language: bool,
    ) -> anyhow::Result<()> {
        let document = match xml {
            Some(path) => fetch_file(path).with_context(|| format!("Failed to read file: {}", path.display()))?,
            None => {
                let record = self.record(slug, html).await?;
                generate_comicinfo_with_config(&record, &comicinfo_config(no_language))
            }
        };

        if self.verbose {
            echo::print_step(&format!("Writing ComicInfo.xml into {}", archive.display().bright_white()));
        }
        let injection = inject_comicinfo(archive, &document)
            .with_context(|| format!("Failed to write metadata into {}", archive.display()))?;

        if injection.replaced {
            echo::print_warning("Replaced the existing ComicInfo.xml");
        }
        let size = fs::metadata(archive).map(|meta| meta.len()).unwrap_or(0);
        echo::print_success(&format!(
            "Tagged {} ({} entries, {})",
            archive.display().bright_white(),
            injection.entries,
            echo::format_size(size)
        ));
        Ok(())
    }
}

fn comicinfo_config(no_language: bool) -> ComicInfoConfig {
    let mut config = ComicInfoConfig::default();
    if no_language {
        config.language_iso = None;
    }
    config
}

/// Output format picked by `--json`.
enum Renderer {
    Json(JsonFormatter),
    Text(TextFormatter),
}

impl Renderer {
    fn new(json: bool) -> Self {
        if json {
            Self::Json(JsonFormatter::new(JsonConfig { pretty: true }))
        } else {
            Self::Text(TextFormatter::new(TextConfig::default()))
        }
    }

    fn hits(&self, hits: &[SearchHit]) -> anyhow::Result<String> {
        match self {
            Self::Json(formatter) => Ok(formatter.hits(hits)? + "\n"),
            Self::Text(formatter) => Ok(formatter.hits(hits)),
        }
    }

    fn record(&self, record: &IssueRecord) -> anyhow::Result<String> {
        match self {
            Self::Json(formatter) => Ok(formatter.record(record)? + "\n"),
            Self::Text(formatter) => Ok(formatter.record(record)),
        }
    }
}

fn emit(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
    }

    let app = App { config: cli.connection.to_config(), verbose: cli.verbose };

    match cli.command {
        Command::Search { query, page } => app.search(&query.join(" "), &page).await,
        Command::Series { slug, page } => app.series(slug.as_deref(), &page).await,
        Command::Issue { slug, page } => app.issue(slug.as_deref(), &page).await,
        Command::Xml { slug, html, no_language, output } => {
            app.xml(slug.as_deref(), html.as_deref(), no_language, output.as_deref())
                .await
        }
        Command::Inject { archive, slug, html, xml, no_language } => {
            app.inject(&archive, slug.as_deref(), html.as_deref(), xml.as_deref(), no_language)
                .await
        }
    }
}
