//! Markup cleanup applied before the page parsers see a document.
//!
//! Catalog pages embed analytics scripts, inline styles and commented-out
//! blocks of old layout. None of those carry metadata, and the synopsis
//! fallback would otherwise score script text as prose.

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script tags
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript tags
    pub remove_noscript: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_scripts: true, remove_styles: true, remove_noscript: true, remove_comments: true }
    }
}

/// Strips the configured tags and comments from `html`.
///
/// The rewrite is best effort: if the streaming rewriter rejects the input,
/// the original markup is returned unchanged.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut output = String::new();

    let tags: Vec<&str> = [
        (config.remove_scripts, "script"),
        (config.remove_styles, "style"),
        (config.remove_noscript, "noscript"),
    ]
    .into_iter()
    .filter_map(|(enabled, tag)| enabled.then_some(tag))
    .collect();

    let element_content_handlers = tags
        .into_iter()
        .map(|tag| {
            lol_html::element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    let document_content_handlers = if config.remove_comments {
        vec![lol_html::doc_comments!(|c| {
            c.remove();
            Ok(())
        })]
    } else {
        Vec::new()
    };

    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers, document_content_handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        tracing::debug!("markup rewrite failed, parsing page as received");
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}
