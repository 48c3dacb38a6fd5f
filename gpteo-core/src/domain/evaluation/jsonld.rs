// gpteo-core/src/domain/evaluation/jsonld.rs
//
// Read-only navigation over extracted JSON-LD blocks. Traversal is
// depth-first in document order so lookups are deterministic.

use serde_json::Value;

/// True when `node["@type"]` names `schema_type` (plain, `schema:` prefixed,
/// or as a full schema.org IRI), either directly or inside a type array.
pub fn has_type(node: &Value, schema_type: &str) -> bool {
    let matches = |t: &str| {
        let short = t
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(t);
        short.eq_ignore_ascii_case(schema_type)
    };
    match node.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// First object node of the given `@type`, searching arrays, `@graph`
/// containers and nested entities.
pub fn find_typed_node<'a>(blocks: &'a [Value], schema_type: &str) -> Option<&'a Value> {
    blocks.iter().find_map(|b| find_typed_in(b, schema_type))
}

fn find_typed_in<'a>(value: &'a Value, schema_type: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if has_type(value, schema_type) {
                return Some(value);
            }
            map.values().find_map(|v| find_typed_in(v, schema_type))
        }
        Value::Array(items) => items.iter().find_map(|v| find_typed_in(v, schema_type)),
        _ => None,
    }
}

/// First non-empty value stored under `property` anywhere in the blocks.
pub fn find_property<'a>(blocks: &'a [Value], property: &str) -> Option<&'a Value> {
    blocks.iter().find_map(|b| find_property_in(b, property))
}

fn find_property_in<'a>(value: &'a Value, property: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(property).filter(|v| is_present(v)) {
                return Some(v);
            }
            map.values().find_map(|v| find_property_in(v, property))
        }
        Value::Array(items) => items.iter().find_map(|v| find_property_in(v, property)),
        _ => None,
    }
}

/// Null, blank strings and empty containers count as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

/// Scalar values as plain text, containers as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Brand name from `Product.brand` (string or entity), falling back to an
/// `Organization` or `Brand` node's `name`.
pub fn brand_name(blocks: &[Value]) -> Option<String> {
    let from_product = find_typed_node(blocks, "Product")
        .and_then(|p| p.get("brand"))
        .and_then(|b| match b {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => b.get("name").and_then(Value::as_str).map(str::to_string),
            Value::Array(items) => items.first().and_then(|first| match first {
                Value::String(s) => Some(s.clone()),
                _ => first.get("name").and_then(Value::as_str).map(str::to_string),
            }),
            _ => None,
        });

    from_product
        .or_else(|| {
            ["Organization", "Brand"].iter().find_map(|t| {
                find_typed_node(blocks, t)
                    .and_then(|n| n.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
