/// Table query description
///
/// A `Query` is a backend-neutral description of a select: table, filter
/// predicates, ordering and limit. `MemoryBackend` evaluates it directly,
/// `RestBackend` renders it as PostgREST query parameters.
///
/// # Example
///
/// ```
/// use schoolhub_shared::backend::query::{Filter, Query};
///
/// let query = Query::table("billing")
///     .filter(Filter::is_in("status", ["Pending", "Overdue"]))
///     .order_asc("due_date");
///
/// assert_eq!(query.table, "billing");
/// ```

use chrono::{DateTime, FixedOffset};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, JsonValue),

    /// `column IN (values)`
    In(String, Vec<JsonValue>),

    /// `col1 ILIKE %needle% OR col2 ILIKE %needle% ...`
    AnyContains(Vec<String>, String),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn is_in<V: Into<JsonValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn any_contains<C: Into<String>>(
        columns: impl IntoIterator<Item = C>,
        needle: impl Into<String>,
    ) -> Self {
        Filter::AnyContains(
            columns.into_iter().map(Into::into).collect(),
            needle.into(),
        )
    }

    /// Evaluates the predicate against a JSON row
    pub fn matches(&self, row: &JsonValue) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column).map_or(false, |v| loose_eq(v, value)),
            Filter::In(column, values) => row
                .get(column)
                .map_or(false, |v| values.iter().any(|candidate| loose_eq(v, candidate))),
            Filter::AnyContains(columns, needle) => {
                let needle = needle.to_lowercase();
                columns.iter().any(|column| {
                    row.get(column)
                        .and_then(JsonValue::as_str)
                        .map_or(false, |s| s.to_lowercase().contains(&needle))
                })
            }
        }
    }

    /// Renders the predicate as a PostgREST `(key, value)` query pair
    pub fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", render_scalar(value))),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(|v| quote(&render_scalar(v))).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
            Filter::AnyContains(columns, needle) => {
                let pattern = quote(&format!("*{}*", escape_like(needle)));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{}.ilike.{}", column, pattern))
                    .collect();
                ("or".to_string(), format!("({})", parts.join(",")))
            }
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn to_param(&self) -> String {
        format!(
            "{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

/// Select description
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Selects every row of `table`
    pub fn table(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every filter matches `row`
    pub fn matches(&self, row: &JsonValue) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Sorts rows in place by the configured order keys
    pub fn sort(&self, rows: &mut [JsonValue]) {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in &self.order {
                let ord = compare_values(
                    a.get(&key.column).unwrap_or(&JsonValue::Null),
                    b.get(&key.column).unwrap_or(&JsonValue::Null),
                );
                let ord = if key.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Query-string pairs for PostgREST
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(Order::to_param).collect();
            params.push(("order".to_string(), order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

// Numbers sent as strings by some backends still compare equal to numbers.
fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (JsonValue::Number(n), JsonValue::String(s)) | (JsonValue::String(s), JsonValue::Number(n)) => {
            n.to_string() == *s
        }
        _ => false,
    }
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

// PostgREST reserves , . : ( ) inside filter values unless double-quoted.
// Wildcards typed by the user match literally, as in `matches`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn quote(raw: &str) -> String {
    if raw.contains([',', '.', ':', '(', ')', '"', '\\', ' ']) {
        let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    } else {
        raw.to_string()
    }
}

/// Orders JSON scalars: nulls first, then numbers, then timestamps/strings
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Less,
        (_, JsonValue::Null) => Ordering::Greater,
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}
