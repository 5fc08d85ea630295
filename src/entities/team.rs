//! Team listing spec. Teams belong to one lobby and carry a captain.

use once_cell::sync::Lazy;

use crate::filter::{FieldSpec, FieldType, FilterSpec, Operator};

pub const TEAMS_TABLE: &str = "app.teams";

pub static TEAM_FILTERS: Lazy<FilterSpec> = Lazy::new(|| FilterSpec {
    entity: "team",
    table: TEAMS_TABLE,
    fields: vec![
        FieldSpec::new("id", FieldType::Id, Operator::Exact),
        FieldSpec::new("lobby_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("captain_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("name", FieldType::Str, Operator::Substring),
        FieldSpec::new("open", FieldType::Bool, Operator::Exact),
    ],
    sortable: &["created_at", "name"],
    hook: None,
});
