// gpteo-core/src/infrastructure/fetcher/classify.rs

use serde_json::Value;
use url::Url;

use crate::domain::evaluation::jsonld;
use crate::domain::scan::PageType;

const PRODUCT_SEGMENTS: [&str; 3] = ["product", "products", "p"];
const CATEGORY_SEGMENTS: [&str; 5] = ["collections", "category", "categories", "c", "shop"];
const POLICY_KEYWORDS: [&str; 6] = ["return", "refund", "shipping", "privacy", "terms", "policy"];

/// Advisory page type, used only to filter check applicability.
///
/// Precedence: site root, Product schema, product path, policy keyword,
/// category path.
pub fn classify(url: &Url, json_ld: &[Value]) -> PageType {
    let path = url.path().trim_end_matches('/').to_lowercase();
    if path.is_empty() {
        return PageType::Homepage;
    }
    if jsonld::find_typed_node(json_ld, "Product").is_some() {
        return PageType::Product;
    }

    // A segment only counts as a directory when something follows it.
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let directory = |names: &[&str]| {
        segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .any(|s| names.contains(s))
    };

    if directory(&PRODUCT_SEGMENTS) {
        PageType::Product
    } else if POLICY_KEYWORDS.iter().any(|k| path.contains(k)) {
        PageType::Policy
    } else if directory(&CATEGORY_SEGMENTS) {
        PageType::Category
    } else {
        PageType::Other
    }
}
