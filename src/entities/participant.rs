//! Participant listing spec. A participant joins one lobby and may sit on a
//! team inside it; `team_name` is a convenience key that only applies while
//! `team_id` is absent.

use once_cell::sync::Lazy;

use crate::filter::{FieldSpec, FieldType, FilterSpec, Operator};

pub const PARTICIPANTS_TABLE: &str = "app.participants";

pub static PARTICIPANT_FILTERS: Lazy<FilterSpec> = Lazy::new(|| FilterSpec {
    entity: "participant",
    table: PARTICIPANTS_TABLE,
    fields: vec![
        FieldSpec::new("id", FieldType::Id, Operator::Exact),
        FieldSpec::new("lobby_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("user_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("team_id", FieldType::Id, Operator::Exact),
        FieldSpec::new("team_name", FieldType::Str, Operator::Substring).with_dependency("team_id"),
        FieldSpec::new("ready", FieldType::Bool, Operator::Exact),
    ],
    sortable: &["created_at"],
    hook: None,
});
