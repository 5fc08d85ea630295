//! Lobby listing spec. A lobby is the unit a host opens for a draft: it
//! carries a pick/ban algorithm reference, a slot count and a status that
//! moves open -> drafting -> closed.

use std::collections::HashMap;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::filter::{FieldSpec, FieldType, FilterSpec, Operator, RangeOp, RowPredicate};
use crate::identity::Subject;
use crate::store::Row;

pub const LOBBIES_TABLE: &str = "app.lobbies";

/// Listing defaults to open lobbies; pass an explicit null status to see
/// everything. `algorithm_name` only applies while `algorithm_id` is absent,
/// and `search` spans name and description through the hook.
pub static LOBBY_FILTERS: Lazy<FilterSpec> = Lazy::new(|| FilterSpec {
    entity: "lobby",
    table: LOBBIES_TABLE,
    fields: vec![
        FieldSpec::new("id", FieldType::Id, Operator::Exact),
        FieldSpec::new("host_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("status", FieldType::Str, Operator::Exact).with_default(json!("open")),
        FieldSpec::new("visibility", FieldType::Str, Operator::Exact),
        FieldSpec::new("ranked", FieldType::Bool, Operator::Exact),
        FieldSpec::new("algorithm_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("algorithm_name", FieldType::Str, Operator::Substring).with_dependency("algorithm_id"),
        FieldSpec::new("min_slots", FieldType::Int, Operator::Range(RangeOp::Gte)).with_column("slots"),
        FieldSpec::new("joinable", FieldType::Bool, Operator::Custom),
        FieldSpec::new("search", FieldType::Str, Operator::Substring).ignored(),
    ],
    sortable: &["created_at", "name", "slots", "status"],
    hook: Some(lobby_hook),
});

fn is_joinable(row: &Row) -> bool {
    let open = row.get("status").and_then(|v| v.as_str()) == Some("open");
    let free = row.get("slots").and_then(|v| v.as_i64()).unwrap_or(0)
        > row.get("filled").and_then(|v| v.as_i64()).unwrap_or(0);
    open && free
}

fn lobby_hook(fields: &HashMap<String, Value>) -> Vec<RowPredicate> {
    let mut preds: Vec<RowPredicate> = Vec::new();
    if let Some(q) = fields.get("search").and_then(|v| v.as_str()) {
        let q = q.to_lowercase();
        // OR across name and description; the engine only ANDs top-level fields
        preds.push(Box::new(move |row: &Row| {
            ["name", "description"].iter().any(|col| {
                row.get(*col)
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_lowercase().contains(&q))
                    .unwrap_or(false)
            })
        }));
    }
    if let Some(want) = fields.get("joinable").and_then(|v| v.as_bool()) {
        preds.push(Box::new(move |row: &Row| is_joinable(row) == want));
    }
    preds
}

/// Build a fresh lobby row hosted by the given subject.
pub fn new_row(
    host: &Subject,
    name: &str,
    description: &str,
    slots: i64,
    visibility: &str,
    ranked: bool,
    algorithm_id: Option<&str>,
) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(Uuid::new_v4().to_string()));
    row.insert("host_id".into(), json!(host.user_id));
    row.insert("name".into(), json!(name));
    row.insert("description".into(), json!(description));
    row.insert("status".into(), json!("open"));
    row.insert("visibility".into(), json!(visibility));
    row.insert("ranked".into(), json!(ranked));
    row.insert("slots".into(), json!(slots));
    row.insert("filled".into(), json!(0));
    row.insert("algorithm_id".into(), json!(algorithm_id));
    row.insert("created_at".into(), json!(Utc::now().timestamp_millis()));
    row
}
