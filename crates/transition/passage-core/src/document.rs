//! Content swap primitive: extracts the content container and document-level
//! metadata from fetched markup without touching the live page.
//!
//! Parsing goes through html5ever, so scripts in the destination are never
//! executed; the container is re-serialized as inner HTML for the host to
//! insert.

use std::fmt;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, Attribute, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use serde::{Deserialize, Serialize};

use crate::error::{PassageError, Result};
use crate::theme::ThemeValue;

/// The subset of CSS selectors used to locate the content container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    Id(String),
    Class(String),
    Attribute(String),
    Tag(String),
}

impl Selector {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || PassageError::InvalidSelector {
            selector: s.to_string(),
        };
        let ident_ok = |v: &str| {
            !v.is_empty()
                && v
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        let sel = if let Some(id) = s.strip_prefix('#') {
            Self::Id(id.to_string())
        } else if let Some(class) = s.strip_prefix('.') {
            Self::Class(class.to_string())
        } else if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            Self::Attribute(inner.trim().to_string())
        } else {
            Self::Tag(s.to_ascii_lowercase())
        };
        let ok = match &sel {
            Self::Id(v) | Self::Class(v) | Self::Attribute(v) | Self::Tag(v) => ident_ok(v),
        };
        if ok {
            Ok(sel)
        } else {
            Err(invalid())
        }
    }

    /// Whether an element with this tag name and attributes matches.
    pub fn matches(&self, tag: &str, attrs: &[Attribute]) -> bool {
        match self {
            Self::Tag(t) => tag.eq_ignore_ascii_case(t),
            Self::Id(id) => attr_value(attrs, "id").is_some_and(|v| v == id.as_str()),
            Self::Class(class) => attr_value(attrs, "class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == class.as_str())),
            Self::Attribute(name) => attr_value(attrs, name).is_some(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "#{v}"),
            Self::Class(v) => write!(f, ".{v}"),
            Self::Attribute(v) => write!(f, "[{v}]"),
            Self::Tag(v) => f.write_str(v),
        }
    }
}

/// A parsed destination: the container to insert plus document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationDocument {
    pub url: String,
    pub title: Option<String>,
    /// `lang` of the root element.
    pub language: Option<String>,
    /// `data-theme` of the root element.
    pub theme: Option<ThemeValue>,
    pub container_html: String,
}

fn attr_value<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| (*a.name.local).eq_ignore_ascii_case(name))
        .map(|a| &*a.value)
}

/// First element in document order matching `pred`. Walks with an explicit
/// stack so arbitrarily deep markup cannot exhaust the call stack.
fn find_element<F>(root: &Handle, pred: &F) -> Option<Handle>
where
    F: Fn(&str, &[Attribute]) -> bool,
{
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        {
            if pred(&name.local, &attrs.borrow()) {
                return Some(node);
            }
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    None
}

fn text_content(root: &Handle, out: &mut String) {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Text { ref contents } = node.data {
            out.push_str(&contents.borrow());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
}

fn inner_html(node: &Handle, url: &str) -> Result<String> {
    let mut buf = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut buf, &handle, opts)
        .map_err(|e| PassageError::network(url, format!("serialize container: {e}")))?;
    String::from_utf8(buf)
        .map_err(|e| PassageError::network(url, format!("container is not utf-8: {e}")))
}

/// Parse fetched markup into a [`DestinationDocument`].
///
/// A document without a matching container is reported as
/// [`PassageError::MissingContainer`], which callers treat like a network
/// failure.
pub fn parse_destination(
    url: &str,
    markup: &str,
    selector: &Selector,
) -> Result<DestinationDocument> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(markup);

    let is_container = |tag: &str, attrs: &[Attribute]| selector.matches(tag, attrs);
    let container = find_element(&dom.document, &is_container).ok_or_else(|| {
        PassageError::MissingContainer {
            url: url.to_string(),
            selector: selector.to_string(),
        }
    })?;

    let is_title = |tag: &str, _: &[Attribute]| tag == "title";
    let title = find_element(&dom.document, &is_title).and_then(|t| {
        let mut s = String::new();
        text_content(&t, &mut s);
        let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
        (!s.is_empty()).then_some(s)
    });

    let is_root = |tag: &str, _: &[Attribute]| tag == "html";
    let (language, theme) = match find_element(&dom.document, &is_root) {
        Some(root) => match root.data {
            NodeData::Element { ref attrs, .. } => {
                let attrs = attrs.borrow();
                (
                    attr_value(&attrs, "lang")
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    attr_value(&attrs, "data-theme").and_then(ThemeValue::parse),
                )
            }
            _ => (None, None),
        },
        None => (None, None),
    };

    Ok(DestinationDocument {
        url: url.to_string(),
        title,
        language,
        theme,
        container_html: inner_html(&container, url)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html lang="fr" data-theme="dark">
  <head><title>  Atelier
     céramique </title><script>window.boom = 1;</script></head>
  <body>
    <header>chrome</header>
    <main id="swup" class="page transition-fade"><h1>Bonjour</h1><p>Texte</p></main>
  </body>
</html>"#;

    #[test]
    fn selector_forms() {
        assert_eq!(Selector::parse("#swup").unwrap(), Selector::Id("swup".into()));
        assert_eq!(Selector::parse(".page").unwrap(), Selector::Class("page".into()));
        assert_eq!(
            Selector::parse("[data-container]").unwrap(),
            Selector::Attribute("data-container".into())
        );
        assert_eq!(Selector::parse("MAIN").unwrap(), Selector::Tag("main".into()));
        assert!(Selector::parse("#").is_err());
        assert!(Selector::parse("main > p").is_err());
        assert_eq!(Selector::parse("[data-container]").unwrap().to_string(), "[data-container]");
    }

    #[test]
    fn extracts_container_and_metadata() {
        let doc = parse_destination("https://site.test/fr/", PAGE, &Selector::Id("swup".into()))
            .expect("parse");
        assert_eq!(doc.title.as_deref(), Some("Atelier céramique"));
        assert_eq!(doc.language.as_deref(), Some("fr"));
        assert_eq!(doc.theme, Some(ThemeValue::Dark));
        assert_eq!(doc.container_html, "<h1>Bonjour</h1><p>Texte</p>");
        assert!(!doc.container_html.contains("chrome"));
    }

    #[test]
    fn class_and_tag_selectors_find_the_same_container() {
        let by_class = parse_destination("u", PAGE, &Selector::Class("page".into())).unwrap();
        let by_tag = parse_destination("u", PAGE, &Selector::Tag("main".into())).unwrap();
        assert_eq!(by_class.container_html, by_tag.container_html);
    }

    #[test]
    fn missing_container_is_reported() {
        let err = parse_destination(
            "https://site.test/empty",
            "<html><body><p>nothing</p></body></html>",
            &Selector::Id("swup".into()),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PassageError::MissingContainer { ref selector, .. } if selector == "#swup"
        ));
    }

    #[test]
    fn absent_metadata_is_none() {
        let doc = parse_destination(
            "u",
            r#"<html><body><div id="swup">x</div></body></html>"#,
            &Selector::Id("swup".into()),
        )
        .unwrap();
        assert_eq!(doc.title, None);
        assert_eq!(doc.language, None);
        assert_eq!(doc.theme, None);
    }

    #[test]
    fn deeply_nested_markup_is_walked_without_recursion() {
        let depth = 50_000;
        let mut markup = String::from("<html><head><title>Deep</title></head><body>");
        markup.push_str(&"<div>".repeat(depth));
        markup.push_str(r#"<section id="swup">bottom</section>"#);
        markup.push_str(&"</div>".repeat(depth));
        markup.push_str("</body></html>");

        match parse_destination("u", &markup, &Selector::Id("swup".into())) {
            Ok(doc) => {
                assert_eq!(doc.container_html, "bottom");
                assert_eq!(doc.title.as_deref(), Some("Deep"));
            }
            Err(err) => assert!(matches!(err, PassageError::MissingContainer { .. })),
        }
    }

    #[test]
    fn first_match_in_document_order_wins() {
        let page = Selector::Class("page".into());
        let doc = parse_destination(
            "u",
            r#"<html><body><div class="page"><p class="page">inner</p></div><p class="page">later</p></body></html>"#,
            &page,
        )
        .unwrap();
        assert_eq!(doc.container_html, r#"<p class="page">inner</p>"#);

        let doc = parse_destination(
            "u",
            r#"<html><body><p class="page">one</p><p class="page">two</p></body></html>"#,
            &page,
        )
        .unwrap();
        assert_eq!(doc.container_html, "one");
    }
}
