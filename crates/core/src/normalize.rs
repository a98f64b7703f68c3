//! Text normalization for scraped markup.
//!
//! Everything the parsers read from the page passes through here: entity
//! decoding, tag stripping and whitespace collapsing. The site double-encodes
//! some entities (`&amp;aacute;`), so decoding is applied on top of whatever
//! the HTML parser already resolved.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::Html;

static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d{1,7});").unwrap());
static HEX_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#[xX]([0-9a-fA-F]{1,6});").unwrap());
static NAMED_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&([a-zA-Z]{2,8});").unwrap());
static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>").unwrap());
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static EXTRA_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Named entities that show up on Spanish catalog pages.
const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("aacute", 'á'),
    ("eacute", 'é'),
    ("iacute", 'í'),
    ("oacute", 'ó'),
    ("uacute", 'ú'),
    ("Aacute", 'Á'),
    ("Eacute", 'É'),
    ("Iacute", 'Í'),
    ("Oacute", 'Ó'),
    ("Uacute", 'Ú'),
    ("ntilde", 'ñ'),
    ("Ntilde", 'Ñ'),
    ("uuml", 'ü'),
    ("Uuml", 'Ü'),
    ("ccedil", 'ç'),
    ("Ccedil", 'Ç'),
    ("agrave", 'à'),
    ("egrave", 'è'),
    ("ograve", 'ò'),
    ("ordm", 'º'),
    ("ordf", 'ª'),
    ("deg", '°'),
    ("iexcl", '¡'),
    ("iquest", '¿'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("middot", '·'),
    ("euro", '€'),
    ("copy", '©'),
    ("reg", '®'),
    ("ndash", '–'),
    ("mdash", '—'),
    ("hellip", '…'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("times", '×'),
];

/// Decodes numeric (`&#233;`, `&#xE9;`) and named (`&eacute;`) entities.
///
/// Unknown named entities and invalid code points are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    let text = HEX_ENTITY.replace_all(&text, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    NAMED_ENTITY
        .replace_all(&text, |caps: &Captures| {
            NAMED_ENTITIES
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, ch)| ch.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Collapses every whitespace run (including non-breaking spaces) to one
/// space and trims both ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '\u{a0}' {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Removes markup from an HTML fragment, keeping only its text nodes.
///
/// Escaped text (`&lt;&lt;`) comes back decoded, not parsed as markup.
pub fn strip_tags(html: &str) -> String {
    if !html.contains(['<', '&']) {
        return html.to_string();
    }
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect()
}

/// Single-line cleanup used for titles, names and field values.
///
/// Decodes entities, then collapses whitespace. An empty result means the
/// source carried no visible text.
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

/// Multi-line cleanup used for synopses.
///
/// `<br>` and `</p>` become line breaks and tags are stripped. Entities are
/// decoded only after stripping, so escaped angle brackets stay text. Spaces
/// inside a line are collapsed and runs of more than one blank line are
/// squeezed.
pub fn clean_multiline(text: &str) -> String {
    let text = BREAK_TAG.replace_all(text, "\n");
    let text = decode_entities(&strip_tags(&text));

    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned())
        .collect();

    EXTRA_BLANK_LINES.replace_all(&lines.join("\n"), "\n\n").trim().to_string()
}

/// Lowercases and strips Spanish diacritics so labels such as "GUIÓN" and
/// "guion" compare equal.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("Gui&#243;n"), "Guión");
        assert_eq!(decode_entities("Gui&#xF3;n"), "Guión");
    }

    #[test]
    fn test_decode_named_entities() {
        assert_eq!(decode_entities("N&ordm; 5 &amp; m&aacute;s"), "Nº 5 & más");
    }

    #[test]
    fn test_decode_leaves_unknown_entities() {
        assert_eq!(decode_entities("&bogus; &#99999999;"), "&bogus; &#99999999;");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  VALERIAN \n\t (1978,\u{a0}GRIJALBO) "), "VALERIAN (1978, GRIJALBO)");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Hola</b> <i>mundo</i>"), "Hola mundo");
        assert_eq!(strip_tags("<img src=\"x.jpg\">"), "");
        assert_eq!(strip_tags("sin marcas"), "sin marcas");
    }

    #[test]
    fn test_clean_text_double_encoded() {
        assert_eq!(clean_text("  CARTON&Eacute;  "), "CARTONÉ");
    }

    #[test]
    fn test_clean_multiline_keeps_paragraphs() {
        let html = "Primera   línea<br>segunda línea</p>\n\n\n\n<p>Otro    párrafo</p>";
        assert_eq!(clean_multiline(html), "Primera línea\nsegunda línea\n\nOtro párrafo");
    }

    #[test]
    fn test_strip_tags_keeps_escaped_text() {
        assert_eq!(strip_tags("a &lt;b entonces"), "a <b entonces");
        assert_eq!(strip_tags("<i>&lt;&lt;Hola&gt;&gt;</i>"), "<<Hola>>");
    }

    #[test]
    fn test_clean_multiline_keeps_escaped_brackets() {
        assert_eq!(
            clean_multiline("Le dijo &lt;&lt;Vuelve pronto&gt;&gt;<br>y se fue"),
            "Le dijo <<Vuelve pronto>>\ny se fue"
        );
        assert_eq!(clean_multiline("Si a &lt;b entonces c"), "Si a <b entonces c");
    }

    #[test]
    fn test_clean_multiline_double_encoded() {
        assert_eq!(clean_multiline("<b>Cartón</b> y m&amp;aacute;s"), "Cartón y más");
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold("GUIÓN"), "guion");
        assert_eq!(fold("Rotulación"), "rotulacion");
        assert_eq!(fold("Tamaño"), "tamano");
    }
}
