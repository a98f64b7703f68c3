//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types the page
//! parsers query. They wrap `scraper` with the few structural operations the
//! catalog markup needs beyond CSS selectors: walking following siblings,
//! walking direct child nodes and testing ancestry.
//!
//! # Example
//!
//! ```rust
//! use tebeo_core::parse::Document;
//!
//! let html = r#"
//!     <div class="help-block">Sagas (1)</div>
//!     <div class="linea_resultados"><a href="/sagas/x.html">X</a></div>
//! "#;
//!
//! let doc = Document::parse(html);
//! let header = doc.select_first("div.help-block").unwrap().unwrap();
//! let next = header.next_elements().next().unwrap();
//! assert!(next.has_class("linea_resultados"));
//! ```

use scraper::{ElementRef, Html, Node, Selector};

use crate::normalize::clean_text;
use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::{Result, TebeoError};

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses HTML after removing scripts, styles and comments.
    ///
    /// The page parsers use this so that inline scripts never leak into
    /// fallback text heuristics.
    pub fn parse_with_preprocessing(html: &str) -> Self {
        let cleaned = preprocess_html(html, &PreprocessConfig::default());
        Self::parse(&cleaned)
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`TebeoError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tebeo_core::parse::Document;
    ///
    /// let html = r#"<p class="texto">First</p><p class="texto">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.texto").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).map(Element::from).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).next().map(Element::from))
    }

    /// Iterates every text node in document order together with the
    /// element that directly contains it.
    pub fn text_nodes(&'_ self) -> impl Iterator<Item = (&'_ str, Element<'_>)> {
        self.html.root_element().descendants().filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            Some((&**text, Element::from(parent)))
        })
    }
}

/// A wrapper around scraper's ElementRef for easier DOM navigation.
///
/// # Example
///
/// ```rust
/// use tebeo_core::parse::Document;
///
/// let html = r#"<a href="/numeros/x_1.html"> X <b>1</b> </a>"#;
/// let doc = Document::parse(html);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.clean_text(), "X 1");
/// assert_eq!(link.attr("href"), Some("/numeros/x_1.html"));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> From<ElementRef<'a>> for Element<'a> {
    fn from(element: ElementRef<'a>) -> Self {
        Self { element }
    }
}

/// A direct child of an element: either a nested element or a text run.
#[derive(Clone, Copy, Debug)]
pub enum ChildNode<'a> {
    Element(Element<'a>),
    Text(&'a str),
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the raw text content of this element (all descendant text nodes).
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the text content with entities decoded and whitespace collapsed.
    ///
    /// An anchor that only wraps an image yields an empty string.
    pub fn clean_text(&self) -> String {
        clean_text(&self.text())
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Checks the `class` attribute for an exact class token.
    pub fn has_class(&self, class: &str) -> bool {
        self.element.value().classes().any(|c| c == class)
    }

    /// Checks whether any class token contains `fragment`.
    pub fn has_class_containing(&self, fragment: &str) -> bool {
        self.element.value().classes().any(|c| c.contains(fragment))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`TebeoError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile(selector)?;
        Ok(self.element.select(&sel).map(Element::from).collect())
    }

    /// Selects the first descendant matching a CSS selector.
    pub fn select_first(&self, selector: &str) -> Result<Option<Element<'a>>> {
        let sel = compile(selector)?;
        Ok(self.element.select(&sel).next().map(Element::from))
    }

    /// Iterates the following sibling elements, skipping text and comments.
    pub fn next_elements(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        self.element
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .map(Element::from)
    }

    /// Iterates the direct children in order, elements and text runs alike.
    pub fn children(&self) -> impl Iterator<Item = ChildNode<'a>> + use<'a> {
        self.element.children().filter_map(|node| match node.value() {
            Node::Text(text) => Some(ChildNode::Text(&**text)),
            Node::Element(_) => ElementRef::wrap(node).map(|el| ChildNode::Element(Element::from(el))),
            _ => None,
        })
    }

    /// Gets the parent element, if any.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::from)
    }

    /// True if some ancestor satisfies `predicate`.
    pub fn has_ancestor(&self, predicate: impl Fn(&Element<'a>) -> bool) -> bool {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .map(Element::from)
            .any(|el| predicate(&el))
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| TebeoError::HtmlParseError(format!("Invalid selector: {}", e)))
}
