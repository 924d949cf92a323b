use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

use super::error::{StoreError, StoreResult};

/// A stored document: a flat (or nested) JSON object
pub type Document = Map<String, Value>;

/// Options accepted by `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// `{field: 1}` inclusion or `{field: 0}` exclusion
    pub projection: Option<Value>,
    /// `{field: 1 | -1, ...}` applied in key order
    pub sort: Option<Value>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn projection(mut self, projection: Value) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub(crate) fn expect_object<'a>(what: &str, value: &'a Value) -> StoreResult<&'a Document> {
    value
        .as_object()
        .ok_or_else(|| StoreError::invalid(format!("{} must be a document, got {}", what, value)))
}

/// Resolve a dotted field path (`_id.category`, `items.0.sku`)
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => set_path(map, rest, value),
                _ => Err(StoreError::invalid(format!(
                    "cannot create field '{}' inside non-document '{}'",
                    rest, head
                ))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) -> bool {
    match path.split_once('.') {
        None => doc.shift_remove(path).is_some(),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(map)) => remove_path(map, rest),
            _ => false,
        },
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        _ => a == b,
    }
}

/// Equality with document-store semantics: a missing field equals `null`,
/// and an array field matches when any element equals the operand.
fn values_equal(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        None => operand.is_null(),
        Some(v) if json_eq(v, operand) => true,
        Some(Value::Array(items)) if !operand.is_array() => {
            items.iter().any(|item| json_eq(item, operand))
        }
        Some(_) => false,
    }
}

/// Ordering between values of the same type class; `None` across classes
pub fn compare_same_class(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order used by sorts and `$min`/`$max`:
/// missing/null < numbers < strings < documents < arrays < booleans
pub fn total_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(Value::Array(xs)), Some(Value::Array(ys))) => {
            for (x, y) in xs.iter().zip(ys) {
                let ord = total_order(Some(x), Some(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            for ((kx, vx), (ky, vy)) in x.iter().zip(y) {
                let ord = kx.cmp(ky).then_with(|| total_order(Some(vx), Some(vy)));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(x), Some(y)) => compare_same_class(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

fn is_operator_document(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty() && map.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn clauses<'a>(op: &str, value: &'a Value) -> StoreResult<Vec<&'a Document>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| StoreError::invalid(format!("{} expects a non-empty array", op)))?;
    items.iter().map(|item| expect_object(op, item)).collect()
}

fn compare_with(value: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| compare_same_class(v, operand))
        .map(accept)
        .unwrap_or(false)
}

fn matches_field(value: Option<&Value>, condition: &Value) -> StoreResult<bool> {
    let ops = match condition {
        Value::Object(ops) if is_operator_document(condition) => ops,
        _ => return Ok(values_equal(value, condition)),
    };

    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => values_equal(value, operand),
            "$ne" => !values_equal(value, operand),
            "$gt" => compare_with(value, operand, |o| o == Ordering::Greater),
            "$gte" => compare_with(value, operand, |o| o != Ordering::Less),
            "$lt" => compare_with(value, operand, |o| o == Ordering::Less),
            "$lte" => compare_with(value, operand, |o| o != Ordering::Greater),
            "$in" | "$nin" => {
                let list = operand
                    .as_array()
                    .ok_or_else(|| StoreError::invalid(format!("{} expects an array", op)))?;
                let found = list.iter().any(|candidate| values_equal(value, candidate));
                if op == "$in" {
                    found
                } else {
                    !found
                }
            }
            "$exists" => {
                let wanted = operand
                    .as_bool()
                    .ok_or_else(|| StoreError::invalid("$exists expects a boolean"))?;
                value.is_some() == wanted
            }
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluate a filter document (implicit AND over its fields)
pub fn matches_document(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches_document(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches_document(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(op.to_string()))
            }
            field => matches_field(get_path(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn matches(doc: &Document, filter: &Value) -> StoreResult<bool> {
    matches_document(doc, expect_object("filter", filter)?)
}

// ---------------------------------------------------------------------------
// Sort / projection
// ---------------------------------------------------------------------------

fn sort_keys(spec: &Value) -> StoreResult<Vec<(String, bool)>> {
    expect_object("sort", spec)?
        .iter()
        .map(|(field, direction)| match direction.as_i64() {
            Some(1) => Ok((field.clone(), false)),
            Some(-1) => Ok((field.clone(), true)),
            _ => Err(StoreError::invalid(format!(
                "sort direction for '{}' must be 1 or -1",
                field
            ))),
        })
        .collect()
}

/// Stable multi-key sort
pub fn sort_documents(docs: &mut [Document], spec: &Value) -> StoreResult<()> {
    let keys = sort_keys(spec)?;
    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = total_order(get_path(a, field), get_path(b, field));
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Apply an inclusion or exclusion projection
pub fn project(doc: &Document, projection: &Value) -> StoreResult<Document> {
    let spec = expect_object("projection", projection)?;
    if spec.is_empty() {
        return Ok(doc.clone());
    }

    let mut include_id = true;
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for (field, flag) in spec {
        if !(flag.is_boolean() || flag.is_number()) {
            return Err(StoreError::invalid(format!(
                "projection value for '{}' must be 0/1 or a boolean",
                field
            )));
        }
        match (field.as_str(), is_truthy(flag)) {
            ("_id", keep) => include_id = keep,
            (_, true) => included.push(field.as_str()),
            (_, false) => excluded.push(field.as_str()),
        }
    }
    if !included.is_empty() && !excluded.is_empty() {
        return Err(StoreError::invalid(
            "cannot mix inclusion and exclusion in a projection",
        ));
    }

    if included.is_empty() {
        let mut out = doc.clone();
        for field in excluded {
            remove_path(&mut out, field);
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
    for field in included {
        if let Some(value) = get_path(doc, field) {
            set_path(&mut out, field, value.clone())?;
        }
    }
    Ok(out)
}

/// Filter, sort, limit and project an in-memory document sequence
pub fn find_in<'a>(
    docs: impl IntoIterator<Item = &'a Document>,
    filter: &Value,
    options: &FindOptions,
) -> StoreResult<Vec<Document>> {
    let filter = expect_object("filter", filter)?;
    let mut found = Vec::new();
    for doc in docs {
        if matches_document(doc, filter)? {
            found.push(doc.clone());
        }
    }
    if let Some(sort) = &options.sort {
        sort_documents(&mut found, sort)?;
    }
    if let Some(limit) = options.limit {
        found.truncate(limit as usize);
    }
    match &options.projection {
        Some(projection) => found.iter().map(|doc| project(doc, projection)).collect(),
        None => Ok(found),
    }
}

// ---------------------------------------------------------------------------
// Update operators
// ---------------------------------------------------------------------------

fn arithmetic(
    op: &str,
    field: &str,
    current: &Number,
    operand: &Number,
) -> StoreResult<Value> {
    if let (Some(a), Some(b)) = (current.as_i64(), operand.as_i64()) {
        let exact = if op == "$mul" {
            a.checked_mul(b)
        } else {
            a.checked_add(b)
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
    }
    let (a, b) = match (current.as_f64(), operand.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(StoreError::invalid(format!("{} on '{}' overflowed", op, field))),
    };
    let result = if op == "$mul" { a * b } else { a + b };
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| StoreError::invalid(format!("{} on '{}' produced a non-finite value", op, field)))
}

/// Apply `$set`/`$unset`/`$mul`/`$inc` in place; returns whether the document changed
pub fn apply_update(doc: &mut Document, update: &Value) -> StoreResult<bool> {
    let update = expect_object("update", update)?;
    if update.is_empty() {
        return Err(StoreError::invalid("update document is empty"));
    }

    let mut modified = false;
    for (op, fields) in update {
        if !op.starts_with('$') {
            return Err(StoreError::invalid(format!(
                "update must use operators, found plain field '{}'",
                op
            )));
        }
        let fields = expect_object(op, fields)?;
        for (field, operand) in fields {
            if field == "_id" {
                return Err(StoreError::invalid("_id is immutable"));
            }
            match op.as_str() {
                "$set" => {
                    if get_path(doc, field).map_or(true, |current| !json_eq(current, operand)) {
                        set_path(doc, field, operand.clone())?;
                        modified = true;
                    }
                }
                "$unset" => modified |= remove_path(doc, field),
                "$mul" | "$inc" => {
                    let operand = match operand {
                        Value::Number(n) => n,
                        _ => {
                            return Err(StoreError::invalid(format!(
                                "{} operand for '{}' must be numeric",
                                op, field
                            )))
                        }
                    };
                    let next = match get_path(doc, field) {
                        // a missing field is treated as 0
                        None => {
                            if op == "$mul" {
                                if operand.is_f64() {
                                    Value::from(0.0)
                                } else {
                                    Value::from(0)
                                }
                            } else {
                                Value::Number(operand.clone())
                            }
                        }
                        Some(Value::Number(current)) => arithmetic(op, field, current, operand)?,
                        Some(other) => {
                            return Err(StoreError::invalid(format!(
                                "cannot apply {} to non-numeric field '{}' ({})",
                                op, field, other
                            )))
                        }
                    };
                    if get_path(doc, field).map_or(true, |current| current != &next) {
                        set_path(doc, field, next)?;
                        modified = true;
                    }
                }
                other => return Err(StoreError::UnsupportedOperator(other.to_string())),
            }
        }
    }
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    fn sample() -> Document {
        doc(json!({
            "_id": "a1",
            "product_name": "Product 1",
            "category": "Electronics",
            "price": 600.0,
            "quantity_sold": 3,
            "tags": ["new", "promo"],
            "meta": {"source": "seed"}
        }))
    }

    #[test]
    fn test_equality_and_implicit_and() {
        let d = sample();
        assert!(matches(&d, &json!({"category": "Electronics"})).unwrap());
        assert!(matches(&d, &json!({"category": "Electronics", "price": {"$gt": 500}})).unwrap());
        assert!(!matches(&d, &json!({"category": "Electronics", "price": {"$gt": 600}})).unwrap());
        assert!(matches(&d, &json!({"quantity_sold": 3.0})).unwrap());
        assert!(matches(&d, &json!({"meta.source": "seed"})).unwrap());
        assert!(matches(&d, &json!({"tags": "promo"})).unwrap());
        assert!(matches(&d, &json!({"missing": null})).unwrap());
    }

    #[test]
    fn test_comparison_requires_same_type_class() {
        let d = sample();
        assert!(!matches(&d, &json!({"price": {"$gt": "100"}})).unwrap());
        assert!(!matches(&d, &json!({"category": {"$gt": 1}})).unwrap());
        assert!(matches(&d, &json!({"category": {"$gte": "Books"}})).unwrap());
    }

    #[test]
    fn test_logical_and_set_operators() {
        let d = sample();
        assert!(matches(&d, &json!({"$or": [{"category": "Books"}, {"price": {"$lte": 600}}]})).unwrap());
        assert!(!matches(&d, &json!({"$and": [{"category": "Books"}, {"price": 600}]})).unwrap());
        assert!(matches(&d, &json!({"category": {"$in": ["Books", "Electronics"]}})).unwrap());
        assert!(matches(&d, &json!({"category": {"$nin": ["Books"]}})).unwrap());
        assert!(matches(&d, &json!({"region": {"$exists": false}})).unwrap());
        assert!(matches(&d, &json!({"category": {"$ne": "Books"}})).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let d = sample();
        assert!(matches!(
            matches(&d, &json!({"price": {"$regex": "x"}})),
            Err(StoreError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            matches(&d, &json!({"$where": "1"})),
            Err(StoreError::UnsupportedOperator(_))
        ));
        assert!(matches(&d, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_sort_multi_key_and_cross_type() {
        let mut docs = vec![
            doc(json!({"k": "b", "n": 1})),
            doc(json!({"k": "a", "n": 2})),
            doc(json!({"k": "a", "n": 1})),
            doc(json!({"n": 5})),
        ];
        sort_documents(&mut docs, &json!({"k": 1, "n": -1})).unwrap();
        let order: Vec<_> = docs.iter().map(|d| (d.get("k").cloned(), d["n"].clone())).collect();
        assert_eq!(order[0], (None, json!(5)));
        assert_eq!(order[1], (Some(json!("a")), json!(2)));
        assert_eq!(order[2], (Some(json!("a")), json!(1)));
        assert_eq!(order[3], (Some(json!("b")), json!(1)));

        assert!(sort_documents(&mut docs, &json!({"k": 2})).is_err());
    }

    #[test]
    fn test_projection_modes() {
        let d = sample();
        let p = project(&d, &json!({"product_name": 1, "price": 1})).unwrap();
        assert_eq!(
            p.keys().collect::<Vec<_>>(),
            vec!["_id", "product_name", "price"]
        );

        let p = project(&d, &json!({"product_name": 1, "_id": 0})).unwrap();
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["product_name"]);

        let p = project(&d, &json!({"tags": 0, "meta": 0})).unwrap();
        assert!(!p.contains_key("tags"));
        assert!(p.contains_key("price"));

        assert!(project(&d, &json!({"price": 1, "tags": 0})).is_err());
    }

    #[test]
    fn test_mul_and_set() {
        let mut d = sample();
        assert!(apply_update(&mut d, &json!({"$mul": {"price": 0.9}})).unwrap());
        assert!((d["price"].as_f64().unwrap() - 540.0).abs() < 1e-9);

        assert!(apply_update(&mut d, &json!({"$mul": {"quantity_sold": 2}})).unwrap());
        assert_eq!(d["quantity_sold"], json!(6));

        assert!(apply_update(&mut d, &json!({"$mul": {"discount": 0.5}})).unwrap());
        assert_eq!(d["discount"], json!(0.0));

        assert!(apply_update(&mut d, &json!({"$set": {"total_revenue": 3240.0}})).unwrap());
        assert!(!apply_update(&mut d, &json!({"$set": {"total_revenue": 3240.0}})).unwrap());

        assert!(apply_update(&mut d, &json!({"$inc": {"quantity_sold": 1}})).unwrap());
        assert_eq!(d["quantity_sold"], json!(7));

        assert!(apply_update(&mut d, &json!({"$unset": {"meta": ""}})).unwrap());
        assert!(!d.contains_key("meta"));
    }

    #[test]
    fn test_update_rejects_bad_documents() {
        let mut d = sample();
        assert!(apply_update(&mut d, &json!({"price": 1})).is_err());
        assert!(apply_update(&mut d, &json!({})).is_err());
        assert!(apply_update(&mut d, &json!({"$mul": {"category": 2}})).is_err());
        assert!(apply_update(&mut d, &json!({"$mul": {"price": "x"}})).is_err());
        assert!(apply_update(&mut d, &json!({"$set": {"_id": "b"}})).is_err());
        assert!(matches!(
            apply_update(&mut d, &json!({"$rename": {"price": "cost"}})),
            Err(StoreError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn test_find_in_pipeline_of_options() {
        let docs = vec![
            doc(json!({"_id": 1, "name": "a", "rev": 10.0})),
            doc(json!({"_id": 2, "name": "b", "rev": 30.0})),
            doc(json!({"_id": 3, "name": "c", "rev": 20.0})),
        ];
        let options = FindOptions::default()
            .sort(json!({"rev": -1}))
            .limit(2)
            .projection(json!({"name": 1, "_id": 0}));
        let found = find_in(&docs, &json!({}), &options).unwrap();
        assert_eq!(found, vec![doc(json!({"name": "b"})), doc(json!({"name": "c"}))]);
    }
}
