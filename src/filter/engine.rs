//! Generic filtered list/count engine.
//!
//! One code path builds the predicate set shared by both listing and
//! counting: merge declared defaults into the caller's filter map, skip
//! dependent fields whose governing field is active, route `ignore`d and
//! `Custom` fields to the entity hook, and compile everything else into one
//! column predicate per field. The predicates are AND-conjoined. The count
//! path executes over the filtered set only; sort and pagination never apply
//! there.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::store::{Row, Store};

use super::{FilterSpec, Operator, RangeOp, RowPredicate, SortDir};

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: HashMap<String, Value>,
    pub sort_by: Option<String>,
    pub sort_dir: SortDir,
    pub limit: Option<usize>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Count(usize),
}

/// Merge spec defaults for keys the caller did not supply. An explicit
/// caller value always wins, including an explicit null.
fn merged_filters(spec: &FilterSpec, filters: &HashMap<String, Value>) -> HashMap<String, Value> {
    let mut merged = filters.clone();
    for f in &spec.fields {
        if let Some(d) = &f.default {
            merged.entry(f.field.to_string()).or_insert_with(|| d.clone());
        }
    }
    merged
}

fn values_equal(have: &Value, want: &Value) -> bool {
    match (have.as_f64(), want.as_f64()) {
        // Numeric columns compare numerically so 4 matches 4.0
        (Some(a), Some(b)) => a == b,
        _ => have == want,
    }
}

fn exact_predicate(column: String, want: Value) -> RowPredicate {
    Box::new(move |row: &Row| row.get(&column).map(|have| values_equal(have, &want)).unwrap_or(false))
}

fn substring_predicate(column: String, needle: String) -> RowPredicate {
    let needle = needle.to_lowercase();
    Box::new(move |row: &Row| {
        row.get(&column)
            .and_then(|v| v.as_str())
            .map(|s| s.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

fn range_predicate(column: String, op: RangeOp, bound: f64) -> RowPredicate {
    Box::new(move |row: &Row| {
        let Some(have) = row.get(&column).and_then(|v| v.as_f64()) else { return false };
        match op {
            RangeOp::Gt => have > bound,
            RangeOp::Gte => have >= bound,
            RangeOp::Lt => have < bound,
            RangeOp::Lte => have <= bound,
        }
    })
}

/// Compile the active filter set into the members of the conjunction.
fn build_predicates(spec: &FilterSpec, merged: &HashMap<String, Value>) -> Vec<RowPredicate> {
    let mut preds: Vec<RowPredicate> = Vec::new();
    let mut hook_fields: HashMap<String, Value> = HashMap::new();

    for (name, value) in merged {
        let Some(fs) = spec.field(name) else { continue };
        // Present-but-null carries no predicate (and already blocked the default)
        if value.is_null() { continue; }
        // A field governed by a present dependency never co-applies with it
        if let Some(dep) = fs.depends_on {
            if merged.get(dep).map(|v| !v.is_null()).unwrap_or(false) { continue; }
        }
        if fs.ignore {
            hook_fields.insert(name.clone(), value.clone());
            continue;
        }
        match fs.op {
            Operator::Exact => preds.push(exact_predicate(fs.column.to_string(), value.clone())),
            Operator::Substring => {
                let needle = match value.as_str() {
                    Some(s) => s.to_string(),
                    None => value.to_string(),
                };
                preds.push(substring_predicate(fs.column.to_string(), needle));
            }
            Operator::Range(op) => {
                if let Some(bound) = value.as_f64() {
                    preds.push(range_predicate(fs.column.to_string(), op, bound));
                }
            }
            Operator::Custom => {
                hook_fields.insert(name.clone(), value.clone());
            }
        }
    }

    if let Some(hook) = spec.hook {
        preds.extend(hook(&hook_fields));
    }
    preds
}

fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Rows missing the sort column order last
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            if let (Some(fx), Some(fy)) = (x.as_f64(), y.as_f64()) {
                return fx.partial_cmp(&fy).unwrap_or(Ordering::Equal);
            }
            if let (Some(sx), Some(sy)) = (x.as_str(), y.as_str()) {
                return sx.cmp(sy);
            }
            if let (Some(bx), Some(by)) = (x.as_bool(), y.as_bool()) {
                return bx.cmp(&by);
            }
            x.to_string().cmp(&y.to_string())
        }
    }
}

fn apply_filters(store: &Store, spec: &FilterSpec, filters: &HashMap<String, Value>) -> AppResult<Vec<Row>> {
    let merged = merged_filters(spec, filters);
    let preds = build_predicates(spec, &merged);
    let rows = store.scan(spec.table).map_err(AppError::from)?;
    Ok(rows.into_iter().filter(|row| preds.iter().all(|p| p(row))).collect())
}

/// List rows: filter, sort by a validated column (unknown sort keys are
/// silently ignored), then page with offset/limit.
pub fn list(store: &Store, spec: &FilterSpec, query: &ListQuery) -> AppResult<Vec<Row>> {
    let mut rows = apply_filters(store, spec, &query.filters)?;
    if let Some(key) = query.sort_by.as_deref() {
        if spec.sortable.contains(&key) {
            rows.sort_by(|a, b| {
                let ord = cmp_values(a.get(key), b.get(key));
                match query.sort_dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            });
        }
    }
    let rows = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    Ok(rows)
}

/// Count the filtered set. Sort and pagination never apply on this path.
pub fn count(store: &Store, spec: &FilterSpec, filters: &HashMap<String, Value>) -> AppResult<usize> {
    Ok(apply_filters(store, spec, filters)?.len())
}

/// Single entry point mirroring the list/count contract.
pub fn run(store: &Store, spec: &FilterSpec, query: &ListQuery, count_only: bool) -> AppResult<QueryOutcome> {
    if count_only {
        Ok(QueryOutcome::Count(count(store, spec, &query.filters)?))
    } else {
        Ok(QueryOutcome::Rows(list(store, spec, query)?))
    }
}

#[path = "engine_tests.rs"]
#[cfg(test)]
mod engine_tests;
