//! Entity extraction from tool results
//!
//! Pulls referenceable records (id, doctype, label) out of tool result
//! payloads so the UI can offer navigation chips next to an answer. Extraction
//! is table-driven and best-effort: unknown tools and unexpected shapes yield
//! an empty list, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cap on entities extracted from a single tool call
pub const MAX_ENTITIES_PER_CALL: usize = 10;

/// A record referenced by a tool result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedEntity {
    pub id: String,
    pub doctype: String,
    pub label: String,
}

/// Where the doctype for an extracted entity comes from
enum DoctypeSource {
    /// Fixed doctype for every entity the tool returns
    Literal(&'static str),
    /// Read from the named field of the result itself (lookup_entity)
    FromResultField(&'static str),
}

/// How to pull entities out of one tool's result payload
struct ExtractionRule {
    /// Key holding the candidate data; `None` means the whole result
    result_key: Option<&'static str>,
    doctype: DoctypeSource,
    id_field: &'static str,
    label_field: &'static str,
    /// Tool returns a single object rather than a list
    single_object: bool,
}

fn rule_for(tool_name: &str) -> Option<ExtractionRule> {
    use DoctypeSource::*;

    let rule = match tool_name {
        "get_sales_invoices" | "get_sales_invoice" => ExtractionRule {
            result_key: None,
            doctype: Literal("Sales Invoice"),
            id_field: "name",
            label_field: "customer_name",
            single_object: false,
        },
        "get_outstanding_invoices" => ExtractionRule {
            result_key: Some("invoices"),
            doctype: Literal("Sales Invoice"),
            id_field: "name",
            label_field: "customer_name",
            single_object: false,
        },
        "get_purchase_orders" => ExtractionRule {
            result_key: None,
            doctype: Literal("Purchase Order"),
            id_field: "name",
            label_field: "supplier",
            single_object: false,
        },
        "get_customers" => ExtractionRule {
            result_key: None,
            doctype: Literal("Customer"),
            id_field: "name",
            label_field: "customer_name",
            single_object: false,
        },
        "get_employees" => ExtractionRule {
            result_key: None,
            doctype: Literal("Employee"),
            id_field: "name",
            label_field: "employee_name",
            single_object: false,
        },
        "get_stock_levels" => ExtractionRule {
            result_key: None,
            doctype: Literal("Item"),
            id_field: "item_code",
            label_field: "item_code",
            single_object: false,
        },
        "get_company_info" => ExtractionRule {
            result_key: None,
            doctype: Literal("Company"),
            id_field: "name",
            label_field: "company_name",
            single_object: true,
        },
        // The one dynamic mapping: the result names its own doctype and
        // carries a single best_match object.
        "lookup_entity" => ExtractionRule {
            result_key: Some("best_match"),
            doctype: FromResultField("doctype"),
            id_field: "name",
            label_field: "title",
            single_object: true,
        },
        _ => return None,
    };
    Some(rule)
}

/// Extract referenceable entities from a tool's decoded result.
///
/// Unknown tools, missing keys, and malformed items all degrade to an empty
/// list. Never returns more than [`MAX_ENTITIES_PER_CALL`] entities.
pub fn extract_entities(tool_name: &str, result: &Value) -> Vec<FetchedEntity> {
    let Some(rule) = rule_for(tool_name) else {
        return Vec::new();
    };

    let doctype = match rule.doctype {
        DoctypeSource::Literal(dt) => dt.to_string(),
        DoctypeSource::FromResultField(field) => {
            match result.get(field).and_then(|v| v.as_str()) {
                Some(dt) if !dt.is_empty() => dt.to_string(),
                _ => return Vec::new(),
            }
        }
    };

    let candidate = match rule.result_key {
        Some(key) => match result.get(key) {
            Some(v) => v,
            None => return Vec::new(),
        },
        None => result,
    };

    // Normalize to a list: wrap a bare object, treat null as empty.
    let items: Vec<&Value> = match candidate {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(_) => vec![candidate],
        _ => Vec::new(),
    };

    let cap = if rule.single_object { 1 } else { MAX_ENTITIES_PER_CALL };

    items
        .into_iter()
        .take(MAX_ENTITIES_PER_CALL)
        .filter_map(|item| {
            let obj = item.as_object()?;
            let id = field_text(obj.get(rule.id_field)?)?;
            let label = obj
                .get(rule.label_field)
                .and_then(field_text)
                .unwrap_or_else(|| id.clone());
            Some(FetchedEntity {
                id,
                doctype: doctype.clone(),
                label,
            })
        })
        .take(cap)
        .collect()
}

/// Render a scalar field as non-empty text
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
