use std::collections::{HashMap, HashSet};

use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "u", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "code",
    "pre", "hr", "div", "span", "ul", "ol", "li", "dd", "dt", "dl", "a", "img", "table", "thead",
    "tbody", "tr", "th", "td",
];

const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "rel"]),
    ("img", &["src", "alt", "title"]),
    ("code", &["class"]),
    ("pre", &["class"]),
    ("div", &["class"]),
    ("span", &["class"]),
];

/// Markdown to HTML, restricted to the tags a devlog needs.
///
/// Fenced code keeps its `language-*` class for client side highlighting.
/// Anything outside the allow-list is stripped, and `script`/`style` lose
/// their contents too.
pub fn to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);

    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);

    sanitizer().clean(&rendered).to_string()
}

fn sanitizer() -> Builder<'static> {
    let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();

    let attributes: HashMap<&str, HashSet<&str>> = ALLOWED_ATTRIBUTES
        .iter()
        .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
        .collect();

    let mut builder = Builder::default();
    builder
        .tags(tags)
        .tag_attributes(attributes)
        .generic_attributes(HashSet::new())
        .link_rel(None);

    builder
}

#[cfg(test)]
mod tests {
    use super::to_html;

    #[test]
    fn test_empty() {
        assert_eq!(to_html(""), "");
        assert_eq!(to_html("   \n"), "");
    }

    #[test]
    fn test_headings_and_emphasis() {
        let html = to_html("# Title\n\nSome **bold** and *italic* text.");

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn test_fenced_code_keeps_language_class() {
        let html = to_html("```rust\nfn main() {}\n```");

        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("fn main() {}"));
    }

    #[test]
    fn test_tables() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |");

        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_strikethrough_markers_are_consumed() {
        let html = to_html("keep ~~gone~~ text");

        assert_eq!(html.trim(), "<p>keep gone text</p>");
    }

    #[test]
    fn test_scripts_are_removed() {
        let html = to_html("Hello <script>alert('xss')</script> world");

        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
        assert!(html.contains("Hello"));
    }

    #[test]
    fn test_disallowed_attributes_are_removed() {
        let html = to_html("<a href=\"https://example.com\" onclick=\"steal()\">link</a>");

        assert!(html.contains("href=\"https://example.com\""));
        assert!(!html.contains("onclick"));

        let html = to_html("[x](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }
}
