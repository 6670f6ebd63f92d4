//! PostgREST query builder.
//!
//! Builds the `select` / filter / `order` / `limit` query parameters for
//! `/rest/v1/{table}`. Only the operators the storefront uses are supported.

use std::fmt::Display;

use serde_json::Value;

/// A row filter, rendered as `column=op.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Filter {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }

    fn param_value(&self) -> String {
        match self {
            Self::Eq { value, .. } => format!("eq.{value}"),
            Self::In { values, .. } => {
                let list: Vec<String> = values.iter().map(|v| quote_list_item(v)).collect();
                format!("in.({})", list.join(","))
            }
        }
    }

    /// Whether a JSON row satisfies this filter, comparing text forms the
    /// way PostgREST does for `eq` and `in`. Dotted columns
    /// (`category.slug`) address embedded resources.
    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        let cell = self
            .column()
            .split('.')
            .try_fold(row, |value, key| value.get(key))
            .and_then(text_form);
        let Some(cell) = cell else {
            return false;
        };
        match self {
            Self::Eq { value, .. } => cell == *value,
            Self::In { values, .. } => values.contains(&cell),
        }
    }
}

/// Text form of a scalar JSON value; `None` for null, arrays and objects.
fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Items in an `in.(...)` list need double quotes when they contain
/// reserved characters.
fn quote_list_item(value: &str) -> String {
    if value.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_owned()
    }
}

/// Sort key, rendered as `column.asc` / `column.desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A read (or the row selection of an update/delete) against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    columns: String,
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query against `table`, selecting `*`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_owned(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Replace the column list, including embedded resources such as
    /// `*,category:categories(name,slug)`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.split_whitespace().collect();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_owned(),
            value: value.to_string(),
        });
        self
    }

    #[must_use]
    pub fn in_list<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.filters.push(Filter::In {
            column: column.to_owned(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_owned(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &str {
        &self.columns
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    #[must_use]
    pub const fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// An `in` filter over an empty list can never match anything.
    #[must_use]
    pub fn is_empty_selection(&self) -> bool {
        self.filters
            .iter()
            .any(|f| matches!(f, Filter::In { values, .. } if values.is_empty()))
    }

    /// Query parameters for a read.
    #[must_use]
    pub fn read_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_owned(), self.columns.clone())];
        params.extend(self.filter_params());
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_owned(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }
        params
    }

    /// Query parameters for an update or delete (filters only).
    #[must_use]
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| (f.column().to_owned(), f.param_value()))
            .collect()
    }
}
