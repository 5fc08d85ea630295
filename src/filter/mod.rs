//! Filter Specification types consumed by the generic list/count engine.
//!
//! Every listable entity declares a static table mapping filter-key names to
//! field descriptors. Handlers translate raw query parameters into a
//! `HashMap<String, serde_json::Value>` keyed by these names and hand it to
//! the engine unmodified. Key presence in that map is the optionality
//! wrapper: `false` and `0` are real filter values, and an explicit JSON
//! null marks a key as intentionally supplied-but-empty (it suppresses the
//! field's default while contributing no predicate).

use std::collections::HashMap;

use serde_json::Value;

use crate::store::Row;

mod engine;
pub use engine::{count, list, run, ListQuery, QueryOutcome};

/// Semantic type of a filter field, used when coercing raw query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Bool,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

/// How a field value turns into a predicate. Dispatch is a `match` over this
/// tag; `Custom` fields carry no inline closure and are routed to the
/// entity's composite hook together with the `ignore`d fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Strict equality on the column value.
    Exact,
    /// Case-insensitive substring match on a string column.
    Substring,
    /// Numeric comparison against the column value.
    Range(RangeOp),
    /// Entity-specific; resolved by the composite hook.
    Custom,
}

/// Descriptor for one filter key.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Filter-key name as supplied by callers.
    pub field: &'static str,
    /// Column the predicate applies to; defaults to the filter-key name.
    pub column: &'static str,
    pub ty: FieldType,
    /// Applied only when the key is absent from the caller's filter map.
    pub default: Option<Value>,
    pub op: Operator,
    /// When the named field is present in the active filter set, this field
    /// is skipped entirely.
    pub depends_on: Option<&'static str>,
    /// Never contributes a direct column predicate; read by the hook only.
    pub ignore: bool,
}

impl FieldSpec {
    pub fn new(field: &'static str, ty: FieldType, op: Operator) -> Self {
        Self { field, column: field, ty, default: None, op, depends_on: None, ignore: false }
    }

    pub fn with_default(mut self, v: Value) -> Self {
        self.default = Some(v);
        self
    }

    pub fn with_column(mut self, column: &'static str) -> Self {
        self.column = column;
        self
    }

    pub fn with_dependency(mut self, field: &'static str) -> Self {
        self.depends_on = Some(field);
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }
}

/// Predicate over one row, produced by the engine or an entity hook.
pub type RowPredicate = Box<dyn Fn(&Row) -> bool>;

/// Entity-specific composite-predicate hook. Receives exactly the retained
/// (`ignore`d and `Custom`) fields of the active filter set; OR semantics
/// across columns live here, never in the engine's top-level conjunction.
pub type CompositeHook = fn(&HashMap<String, Value>) -> Vec<RowPredicate>;

/// Static per-entity filter table.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub entity: &'static str,
    /// Store table the entity's rows live in.
    pub table: &'static str,
    pub fields: Vec<FieldSpec>,
    /// Columns list/sort may order by; anything else is silently ignored.
    pub sortable: &'static [&'static str],
    pub hook: Option<CompositeHook>,
}

impl FilterSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.field == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(s: &str) -> SortDir {
        if s.eq_ignore_ascii_case("desc") { SortDir::Desc } else { SortDir::Asc }
    }
}
