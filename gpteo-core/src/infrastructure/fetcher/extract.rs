// gpteo-core/src/infrastructure/fetcher/extract.rs
//
// Tolerant, regex-based extraction of the handful of HTML constructs the
// checks read. Malformed markup degrades to missing values, never errors.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use url::Url;

use crate::domain::scan::Page;
use crate::infrastructure::error::InfrastructureError;

pub const MAX_LINKS: usize = 500;

pub struct HtmlExtractor {
    json_ld: Regex,
    title: Regex,
    meta: Regex,
    link: Regex,
    anchor: Regex,
    h1: Regex,
    attribute: Regex,
    tag: Regex,
    whitespace: Regex,
}

fn build(pattern: &str) -> Result<Regex, InfrastructureError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| InfrastructureError::ConfigError(format!("extractor pattern: {}", e)))
}

impl HtmlExtractor {
    pub fn new() -> Result<Self, InfrastructureError> {
        Ok(Self {
            json_ld: build(
                r#"<script[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script>"#,
            )?,
            title: build(r"<title[^>]*>(.*?)</title>")?,
            meta: build(r"<meta\s[^>]*>")?,
            link: build(r"<link\s[^>]*>")?,
            anchor: build(r"<a\s[^>]*>")?,
            h1: build(r"<h1(?:\s[^>]*)?>(.*?)</h1>")?,
            attribute: build(r#"([a-z_:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)?,
            tag: build(r"<[^>]+>")?,
            whitespace: build(r"\s+")?,
        })
    }

    /// Fills the content-derived fields of `page` from `html`. Relative
    /// hrefs resolve against `base`.
    pub fn extract(&self, html: &str, base: &Url, page: &mut Page) {
        self.extract_json_ld(html, page);
        page.meta_tags = self.meta_tags(html, base);
        page.h1 = self
            .h1
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| self.text(m.as_str()))
            .filter(|t| !t.is_empty())
            .collect();
        page.links = self.links(html, base);
    }

    fn extract_json_ld(&self, html: &str, page: &mut Page) {
        for caps in self.json_ld.captures_iter(html) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim();
            let raw = raw
                .strip_prefix("<![CDATA[")
                .and_then(|r| r.strip_suffix("]]>"))
                .unwrap_or(raw);
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(value) => page.json_ld.push(value),
                Err(_) => page.invalid_json_ld += 1,
            }
        }
    }

    fn meta_tags(&self, html: &str, base: &Url) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();

        if let Some(title) = self.title.captures(html).and_then(|c| c.get(1)) {
            tags.insert("title".to_string(), self.text(title.as_str()));
        }

        for tag in self.meta.find_iter(html) {
            let attrs = self.attributes(tag.as_str());
            let name = attrs
                .get("name")
                .or_else(|| attrs.get("property"))
                .or_else(|| attrs.get("http-equiv"));
            if let (Some(name), Some(content)) = (name, attrs.get("content")) {
                tags.entry(name.to_lowercase())
                    .or_insert_with(|| decode_entities(content.trim()));
            }
        }

        for tag in self.link.find_iter(html) {
            let attrs = self.attributes(tag.as_str());
            let (Some(rel), Some(href)) = (attrs.get("rel"), attrs.get("href")) else {
                continue;
            };
            for rel in rel.split_whitespace().map(str::to_lowercase) {
                if rel == "canonical" || rel == "license" {
                    let resolved = base
                        .join(href.trim())
                        .map(String::from)
                        .unwrap_or_else(|_| href.trim().to_string());
                    tags.entry(rel).or_insert(resolved);
                }
            }
        }
        tags
    }

    fn links(&self, html: &str, base: &Url) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut links = Vec::new();
        for tag in self.anchor.find_iter(html) {
            let attrs = self.attributes(tag.as_str());
            let Some(href) = attrs.get("href").map(|h| h.trim()) else {
                continue;
            };
            if href.is_empty() || href.starts_with('#') {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            let resolved = String::from(resolved);
            if seen.insert(resolved.clone()) {
                links.push(resolved);
                if links.len() == MAX_LINKS {
                    break;
                }
            }
        }
        links
    }

    fn attributes(&self, tag: &str) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        for caps in self.attribute.captures_iter(tag) {
            let Some(name) = caps.get(1) else { continue };
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            attrs
                .entry(name.as_str().to_lowercase())
                .or_insert_with(|| value.to_string());
        }
        attrs
    }

    /// Visible text of an element: tags stripped, entities decoded,
    /// whitespace collapsed.
    fn text(&self, inner: &str) -> String {
        let stripped = self.tag.replace_all(inner, " ");
        let decoded = decode_entities(&stripped);
        self.whitespace
            .replace_all(decoded.trim(), " ")
            .into_owned()
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Utc;

    const HTML: &str = r##"<!doctype html>
<html><head>
  <title>  Acme Mugs &amp; Cups | Acme </title>
  <meta name="description" content="Hand-made ceramic mugs.">
  <meta property="og:site_name" content='Acme'>
  <meta name="Robots" content="index, follow">
  <meta name="description" content="second description is ignored">
  <link rel="canonical" href="/products/mug">
  <script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "Product", "name": "Mug"}
  </script>
  <script type="application/ld+json">{ not json }</script>
</head><body>
  <h1 class="hero">The <em>Best</em>
     Mug</h1>
  <a href="/pages/shipping">Shipping</a>
  <a href="https://example.com/pages/returns">Returns</a>
  <a href="/pages/shipping">Shipping again</a>
  <a href="mailto:hi@example.com">Mail</a>
  <a href="#top">Top</a>
</body></html>"##;

    fn extract(html: &str) -> Result<Page> {
        let extractor = HtmlExtractor::new()?;
        let base = Url::parse("https://example.com/products/mug?ref=x")?;
        let mut page = Page::new(base.as_str(), Utc::now());
        extractor.extract(html, &base, &mut page);
        Ok(page)
    }

    #[test]
    fn test_meta_tags() -> Result<()> {
        let page = extract(HTML)?;
        assert_eq!(page.meta("title"), Some("Acme Mugs & Cups | Acme"));
        assert_eq!(page.meta("description"), Some("Hand-made ceramic mugs."));
        assert_eq!(page.meta("og:site_name"), Some("Acme"));
        assert_eq!(page.meta("robots"), Some("index, follow"));
        assert_eq!(page.meta("canonical"), Some("https://example.com/products/mug"));
        Ok(())
    }

    #[test]
    fn test_invalid_json_ld_is_dropped_individually() -> Result<()> {
        let page = extract(HTML)?;
        assert_eq!(page.json_ld.len(), 1);
        assert_eq!(page.json_ld[0]["@type"], "Product");
        assert_eq!(page.invalid_json_ld, 1);
        Ok(())
    }

    #[test]
    fn test_headings_and_links() -> Result<()> {
        let page = extract(HTML)?;
        assert_eq!(page.h1, vec!["The Best Mug".to_string()]);
        assert_eq!(
            page.links,
            vec![
                "https://example.com/pages/shipping".to_string(),
                "https://example.com/pages/returns".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_links_are_capped() -> Result<()> {
        let html: String = (0..600)
            .map(|i| format!(r#"<a href="/p/{}">x</a>"#, i))
            .collect();
        assert_eq!(extract(&html)?.links.len(), MAX_LINKS);
        Ok(())
    }

    #[test]
    fn test_garbage_yields_empty_page() -> Result<()> {
        let page = extract("<<<>>> not html at all <h1")?;
        assert!(page.meta_tags.is_empty());
        assert!(page.h1.is_empty());
        assert!(page.json_ld.is_empty());
        Ok(())
    }
}
