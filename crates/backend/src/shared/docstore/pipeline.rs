//! Aggregation pipeline evaluator shared by every store implementation.
//!
//! Supported stages: `$match`, `$group`, `$sort`, `$limit`, `$skip`,
//! `$project`, `$count`.

use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::error::{StoreError, StoreResult};
use super::query::{
    expect_object, get_path, is_truthy, matches, sort_documents, total_order, Document,
};

/// Evaluate an expression against a document: `"$field.path"` references,
/// documents of expressions (composite keys) and literals.
pub fn evaluate(doc: &Document, expr: &Value) -> StoreResult<Value> {
    match expr {
        Value::String(s) if s.starts_with('$') => {
            Ok(get_path(doc, &s[1..]).cloned().unwrap_or(Value::Null))
        }
        Value::Object(map) => {
            if let Some(op) = map.keys().find(|k| k.starts_with('$')) {
                return Err(StoreError::UnsupportedOperator(op.clone()));
            }
            let mut out = Map::new();
            for (key, sub) in map {
                out.insert(key.clone(), evaluate(doc, sub)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

#[derive(Debug)]
enum Accumulator {
    Sum {
        int_total: i64,
        float_total: f64,
        is_float: bool,
    },
    Avg {
        total: f64,
        n: u64,
    },
    Min(Option<Value>),
    Max(Option<Value>),
    First(Option<Value>),
    Last(Option<Value>),
    Count(i64),
}

#[derive(Debug, Clone)]
struct AccumulatorSpec {
    field: String,
    op: String,
    expr: Value,
}

impl AccumulatorSpec {
    fn parse(field: &str, spec: &Value) -> StoreResult<Self> {
        let map = expect_object(field, spec)?;
        if map.len() != 1 {
            return Err(StoreError::invalid(format!(
                "accumulator '{}' must have exactly one operator",
                field
            )));
        }
        let (op, expr) = map
            .iter()
            .next()
            .ok_or_else(|| StoreError::invalid(format!("accumulator '{}' is empty", field)))?;
        Ok(Self {
            field: field.to_string(),
            op: op.clone(),
            expr: expr.clone(),
        })
    }

    fn start(&self) -> StoreResult<Accumulator> {
        Ok(match self.op.as_str() {
            "$sum" => Accumulator::Sum {
                int_total: 0,
                float_total: 0.0,
                is_float: false,
            },
            "$avg" => Accumulator::Avg { total: 0.0, n: 0 },
            "$min" => Accumulator::Min(None),
            "$max" => Accumulator::Max(None),
            "$first" => Accumulator::First(None),
            "$last" => Accumulator::Last(None),
            "$count" => Accumulator::Count(0),
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        })
    }
}

impl Accumulator {
    fn feed(&mut self, value: Value) {
        match self {
            Accumulator::Sum {
                int_total,
                float_total,
                is_float,
            } => {
                // non-numeric values are ignored
                if let Value::Number(n) = &value {
                    match (n.as_i64(), *is_float) {
                        (Some(i), false) => match int_total.checked_add(i) {
                            Some(total) => *int_total = total,
                            None => {
                                *is_float = true;
                                *float_total = *int_total as f64 + i as f64;
                            }
                        },
                        _ => {
                            if !*is_float {
                                *is_float = true;
                                *float_total = *int_total as f64;
                            }
                            *float_total += n.as_f64().unwrap_or(0.0);
                        }
                    }
                }
            }
            Accumulator::Avg { total, n } => {
                if let Some(x) = value.as_f64() {
                    *total += x;
                    *n += 1;
                }
            }
            Accumulator::Min(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map_or(true, |c| total_order(Some(&value), Some(c)) == Ordering::Less)
                {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map_or(true, |c| total_order(Some(&value), Some(c)) == Ordering::Greater)
                {
                    *current = Some(value);
                }
            }
            Accumulator::First(current) => {
                if current.is_none() {
                    *current = Some(value);
                }
            }
            Accumulator::Last(current) => *current = Some(value),
            Accumulator::Count(n) => *n += 1,
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Sum {
                int_total,
                float_total,
                is_float,
            } => {
                if is_float {
                    Value::from(float_total)
                } else {
                    Value::from(int_total)
                }
            }
            Accumulator::Avg { total, n } => {
                if n == 0 {
                    Value::Null
                } else {
                    Value::from(total / n as f64)
                }
            }
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) | Accumulator::Last(v) => {
                v.unwrap_or(Value::Null)
            }
            Accumulator::Count(n) => Value::from(n),
        }
    }
}

fn group(docs: Vec<Document>, spec: &Document) -> StoreResult<Vec<Document>> {
    let id_expr = spec
        .get("_id")
        .ok_or_else(|| StoreError::invalid("$group requires an _id expression"))?;
    let accumulators: Vec<AccumulatorSpec> = spec
        .iter()
        .filter(|(field, _)| field.as_str() != "_id")
        .map(|(field, acc)| AccumulatorSpec::parse(field, acc))
        .collect::<StoreResult<_>>()?;
    for acc in &accumulators {
        acc.start()?;
    }

    // groups keep first-seen order
    let mut groups: Vec<(Value, Vec<Accumulator>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for doc in &docs {
        let key = evaluate(doc, id_expr)?;
        let fingerprint = serde_json::to_string(&key)?;
        let index = match positions.get(&fingerprint) {
            Some(&index) => index,
            None => {
                let state = accumulators
                    .iter()
                    .map(|a| a.start())
                    .collect::<StoreResult<Vec<_>>>()?;
                groups.push((key, state));
                positions.insert(fingerprint, groups.len() - 1);
                groups.len() - 1
            }
        };
        for (acc_spec, state) in accumulators.iter().zip(groups[index].1.iter_mut()) {
            let value = if acc_spec.op == "$count" {
                Value::Null
            } else {
                evaluate(doc, &acc_spec.expr)?
            };
            state.feed(value);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, state)| {
            let mut out = Document::new();
            out.insert("_id".to_string(), key);
            for (acc_spec, acc) in accumulators.iter().zip(state) {
                out.insert(acc_spec.field.clone(), acc.finish());
            }
            out
        })
        .collect())
}

fn project_stage(doc: &Document, spec: &Document) -> StoreResult<Document> {
    let mut include_id = true;
    let mut has_inclusion = false;
    let mut exclusions = Vec::new();
    for (field, value) in spec {
        match value {
            Value::Bool(_) | Value::Number(_) if field == "_id" => include_id = is_truthy(value),
            Value::Bool(_) | Value::Number(_) if !is_truthy(value) => exclusions.push(field),
            _ => has_inclusion = true,
        }
    }
    if has_inclusion && !exclusions.is_empty() {
        return Err(StoreError::invalid(
            "cannot mix inclusion and exclusion in $project",
        ));
    }

    if !has_inclusion {
        let mut out = doc.clone();
        for field in exclusions {
            out.shift_remove(field.as_str());
        }
        if !include_id {
            out.shift_remove("_id");
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if include_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }
    for (field, value) in spec {
        if field == "_id" && (value.is_boolean() || value.is_number()) {
            continue;
        }
        match value {
            Value::Bool(_) | Value::Number(_) => {
                if let Some(existing) = get_path(doc, field) {
                    out.insert(field.clone(), existing.clone());
                }
            }
            expr => {
                out.insert(field.clone(), evaluate(doc, expr)?);
            }
        }
    }
    Ok(out)
}

fn stage_count(what: &str, value: &Value) -> StoreResult<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::invalid(format!("{} expects a non-negative integer", what)))
}

/// Run `pipeline` over `docs` in order, one stage at a time
pub fn run_pipeline(mut docs: Vec<Document>, pipeline: &[Value]) -> StoreResult<Vec<Document>> {
    for stage in pipeline {
        let stage = expect_object("pipeline stage", stage)?;
        if stage.len() != 1 {
            return Err(StoreError::invalid(
                "each pipeline stage must have exactly one operator",
            ));
        }
        let (name, spec) = stage
            .iter()
            .next()
            .ok_or_else(|| StoreError::invalid("empty pipeline stage"))?;

        tracing::trace!("pipeline stage {} over {} documents", name, docs.len());

        docs = match name.as_str() {
            "$match" => {
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, spec)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$group" => group(docs, expect_object("$group", spec)?)?,
            "$sort" => {
                sort_documents(&mut docs, spec)?;
                docs
            }
            "$limit" => {
                docs.truncate(stage_count("$limit", spec)?);
                docs
            }
            "$skip" => {
                let n = stage_count("$skip", spec)?.min(docs.len());
                docs.drain(..n);
                docs
            }
            "$project" => {
                let spec = expect_object("$project", spec)?;
                docs.iter()
                    .map(|doc| project_stage(doc, spec))
                    .collect::<StoreResult<_>>()?
            }
            "$count" => {
                let field = spec
                    .as_str()
                    .filter(|f| !f.is_empty() && !f.starts_with('$'))
                    .ok_or_else(|| StoreError::invalid("$count expects a field name"))?;
                let mut out = Document::new();
                out.insert(field.to_string(), Value::from(docs.len() as u64));
                vec![out]
            }
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            json!({"category": "Electronics", "region": "North", "price": 100.0, "qty": 10, "rev": 1000.0, "month": "02"}),
            json!({"category": "Books", "region": "North", "price": 20.0, "qty": 5, "rev": 100.0, "month": "01"}),
            json!({"category": "Electronics", "region": "South", "price": 50.0, "qty": 2, "rev": 100.0, "month": "01"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    #[test]
    fn test_group_count_and_sort() {
        let out = run_pipeline(
            docs(),
            &[
                json!({"$group": {"_id": "$category", "count": {"$sum": 1}}}),
                json!({"$sort": {"count": -1}}),
            ],
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["_id"], "Electronics");
        assert_eq!(out[0]["count"], json!(2));
        assert_eq!(out[1]["count"], json!(1));
    }

    #[test]
    fn test_group_avg_sum_min_max() {
        let out = run_pipeline(
            docs(),
            &[json!({"$group": {
                "_id": "$category",
                "avg_price": {"$avg": "$price"},
                "total": {"$sum": "$rev"},
                "qty": {"$sum": "$qty"},
                "cheapest": {"$min": "$price"},
                "dearest": {"$max": "$price"},
                "n": {"$count": {}}
            }})],
        )
        .unwrap();
        let electronics = &out[0];
        assert_eq!(electronics["avg_price"], json!(75.0));
        assert_eq!(electronics["total"], json!(1100.0));
        assert_eq!(electronics["qty"], json!(12));
        assert_eq!(electronics["cheapest"], json!(50.0));
        assert_eq!(electronics["dearest"], json!(100.0));
        assert_eq!(electronics["n"], json!(2));
    }

    #[test]
    fn test_composite_key_and_limit() {
        let out = run_pipeline(
            docs(),
            &[
                json!({"$group": {
                    "_id": {"category": "$category", "region": "$region"},
                    "total": {"$sum": "$rev"},
                    "avg_qty": {"$avg": "$qty"}
                }}),
                json!({"$sort": {"total": -1}}),
                json!({"$limit": 2}),
            ],
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["_id"], json!({"category": "Electronics", "region": "North"}));
        assert_eq!(out[0]["avg_qty"], json!(10.0));
    }

    #[test]
    fn test_avg_of_nothing_is_null() {
        let out = run_pipeline(
            docs(),
            &[json!({"$group": {"_id": null, "avg": {"$avg": "$missing"}, "sum": {"$sum": "$missing"}}})],
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["avg"], Value::Null);
        assert_eq!(out[0]["sum"], json!(0));
    }

    #[test]
    fn test_match_project_skip_count() {
        let out = run_pipeline(
            docs(),
            &[
                json!({"$match": {"category": "Electronics"}}),
                json!({"$project": {"_id": 0, "name": "$category", "price": 1}}),
            ],
        )
        .unwrap();
        assert_eq!(out[0], json!({"name": "Electronics", "price": 100.0}).as_object().unwrap().clone());

        let out = run_pipeline(docs(), &[json!({"$skip": 1}), json!({"$count": "n"})]).unwrap();
        assert_eq!(out[0]["n"], json!(2));
    }

    #[test]
    fn test_month_sort_ascending() {
        let out = run_pipeline(
            docs(),
            &[
                json!({"$group": {"_id": "$month", "total": {"$sum": "$rev"}}}),
                json!({"$sort": {"_id": 1}}),
            ],
        )
        .unwrap();
        let months: Vec<_> = out.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(months, vec![json!("01"), json!("02")]);
        assert_eq!(out[0]["total"], json!(200.0));
    }

    #[test]
    fn test_invalid_stages() {
        assert!(matches!(
            run_pipeline(docs(), &[json!({"$lookup": {}})]),
            Err(StoreError::UnsupportedOperator(_))
        ));
        assert!(run_pipeline(docs(), &[json!({"$group": {"total": {"$sum": 1}}})]).is_err());
        assert!(run_pipeline(docs(), &[json!({"$limit": -1})]).is_err());
        assert!(run_pipeline(docs(), &[json!({"$match": {}, "$limit": 1})]).is_err());
        assert!(matches!(
            run_pipeline(docs(), &[json!({"$group": {"_id": null, "x": {"$push": "$qty"}}})]),
            Err(StoreError::UnsupportedOperator(_))
        ));
    }
}
