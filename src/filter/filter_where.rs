use serde_json::Value;

use super::error::FilterError;
use super::types::{find_column, ColumnDef, ColumnKind, FilterOp};

/// Translates the JSON where-language into a parameterised SQL predicate.
///
/// Every column must appear in the collection's allowlist and every value is
/// bound as text and cast to the column's type, so nothing from the request
/// is interpolated into the SQL string.
pub struct FilterWhere<'a> {
    columns: &'a [ColumnDef],
    params: Vec<String>,
    param_offset: usize,
}

impl<'a> FilterWhere<'a> {
    pub fn generate(
        where_data: &Value,
        columns: &'a [ColumnDef],
        param_offset: usize,
    ) -> Result<(String, Vec<String>), FilterError> {
        let mut filter_where = Self {
            columns,
            params: vec![],
            param_offset,
        };
        let sql = filter_where.build_object(where_data)?;
        Ok((sql.unwrap_or_else(|| "1=1".to_string()), filter_where.params))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build_object(&mut self, where_data: &Value) -> Result<Option<String>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(None),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                parts.push(self.build_logical(key, value)?);
            } else {
                parts.extend(self.build_field(key, value)?);
            }
        }

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join(" AND ")))
        }
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!("{} requires at least one clause", op)));
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for clause in arr {
                    let sql = self.build_object(clause)?.unwrap_or_else(|| "1=1".to_string());
                    sql_parts.push(format!("({})", sql));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => {
                let sql = self.build_object(value)?.unwrap_or_else(|| "1=1".to_string());
                Ok(format!("NOT ({})", sql))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn build_field(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        let column = find_column(self.columns, field).ok_or_else(|| FilterError::InvalidColumn(field.to_string()))?;

        match value {
            Value::Object(ops) => ops
                .iter()
                .map(|(op_key, op_val)| {
                    let op = FilterOp::parse(op_key).ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    self.build_condition(column, op, op_val)
                })
                .collect(),
            // Implicit equality: { field: value }
            other => Ok(vec![self.build_condition(column, FilterOp::Eq, other)?]),
        }
    }

    fn build_condition(&mut self, column: ColumnDef, op: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted = format!("\"{}\"", column.name);

        if op == FilterOp::Null {
            return match data {
                Value::Bool(true) => Ok(format!("{} IS NULL", quoted)),
                Value::Bool(false) => Ok(format!("{} IS NOT NULL", quoted)),
                _ => Err(FilterError::InvalidOperatorData("$null requires true or false".to_string())),
            };
        }

        if column.kind == ColumnKind::TextArray {
            // Array columns only support "contains": { channels: "youtube" }
            return match op {
                FilterOp::Eq => Ok(format!("{} = ANY({})", self.param(column, data)?, quoted)),
                _ => Err(FilterError::UnsupportedOperator(format!(
                    "{:?} is not supported on array column {}",
                    op, column.name
                ))),
            };
        }

        match op {
            FilterOp::Eq if data.is_null() => Ok(format!("{} IS NULL", quoted)),
            FilterOp::Ne if data.is_null() => Ok(format!("{} IS NOT NULL", quoted)),
            FilterOp::Like | FilterOp::ILike if column.kind != ColumnKind::Text => Err(
                FilterError::InvalidOperatorData(format!("Pattern match requires a text column, got {}", column.name)),
            ),
            FilterOp::In | FilterOp::NIn => {
                let values = data
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))?;
                if values.is_empty() {
                    // IN () matches nothing, NOT IN () matches everything
                    return Ok(if op == FilterOp::In { "1=0" } else { "1=1" }.to_string());
                }
                let placeholders = values
                    .iter()
                    .map(|v| self.param(column, v))
                    .collect::<Result<Vec<_>, _>>()?;
                let keyword = if op == FilterOp::In { "IN" } else { "NOT IN" };
                Ok(format!("{} {} ({})", quoted, keyword, placeholders.join(", ")))
            }
            FilterOp::Between => match data.as_array().map(|a| a.as_slice()) {
                Some([low, high]) => Ok(format!(
                    "{} BETWEEN {} AND {}",
                    quoted,
                    self.param(column, low)?,
                    self.param(column, high)?
                )),
                _ => Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
            other => {
                let sql_op = other
                    .comparison_sql()
                    .ok_or_else(|| FilterError::UnsupportedOperator(format!("{:?}", other)))?;
                Ok(format!("{} {} {}", quoted, sql_op, self.param(column, data)?))
            }
        }
    }

    fn param(&mut self, column: ColumnDef, value: &Value) -> Result<String, FilterError> {
        let text = Self::value_text(column, value)?;
        self.params.push(text);
        Ok(format!("${}{}", self.param_offset + self.params.len(), column.kind.cast()))
    }

    fn value_text(column: ColumnDef, value: &Value) -> Result<String, FilterError> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "Column '{}' expects a scalar value",
                    column.name
                )))
            }
        };

        let valid = match column.kind {
            ColumnKind::Uuid => text.parse::<uuid::Uuid>().is_ok(),
            ColumnKind::Numeric => text.parse::<rust_decimal::Decimal>().is_ok(),
            ColumnKind::Integer => text.parse::<i64>().is_ok(),
            ColumnKind::Timestamp => chrono::DateTime::parse_from_rfc3339(&text).is_ok(),
            ColumnKind::Text | ColumnKind::TextArray => true,
        };
        if !valid {
            return Err(FilterError::InvalidOperatorData(format!(
                "Invalid value '{}' for column '{}'",
                text, column.name
            )));
        }
        Ok(text)
    }
}
