use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{ColumnDef, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    columns: &'static [ColumnDef],
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: i32,
    offset: i32,
}

impl Filter {
    pub fn new(table_name: impl Into<String>, columns: &'static [ColumnDef]) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            columns,
            where_data: None,
            order_data: vec![],
            limit: crate::config::config().listing.default_limit,
            offset: 0,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        let limit = data.limit.unwrap_or(self.limit);
        self.limit(limit, data.offset)?;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec, self.columns)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }

        let max_limit = crate::config::config().listing.max_limit;
        if limit > max_limit {
            tracing::debug!("Limit {} exceeds max {}, capping to max", limit, max_limit);
        }
        self.limit = limit.min(max_limit);
        self.offset = offset.unwrap_or(0);
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = if self.order_data.is_empty() {
            // Stable default so pagination does not shuffle rows
            "ORDER BY \"created_at\" DESC, \"id\"".to_string()
        } else {
            FilterOrder::generate(&self.order_data)
        };

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            format!("LIMIT {} OFFSET {}", self.limit, self.offset),
        ]
        .join(" ");

        Ok(SqlResult {
            query,
            params: where_result.params,
        })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match &self.where_data {
            Some(where_data) => FilterWhere::generate(where_data, self.columns, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.table_name, where_result.query
            ),
            params: where_result.params,
        })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{col, ColumnKind};
    use serde_json::json;

    static COLUMNS: &[ColumnDef] = &[
        col("id", ColumnKind::Uuid),
        col("name", ColumnKind::Text),
        col("status", ColumnKind::Text),
        col("monthly_fee", ColumnKind::Numeric),
        col("channels", ColumnKind::TextArray),
        col("created_at", ColumnKind::Timestamp),
    ];

    fn filter(data: serde_json::Value) -> Result<SqlResult, FilterError> {
        let mut filter = Filter::new("products", COLUMNS)?;
        filter.assign(serde_json::from_value(data).unwrap())?;
        filter.to_sql()
    }

    #[test]
    fn implicit_equality_binds_parameters() {
        let sql = filter(json!({ "where": { "status": "pending" } })).unwrap();
        assert!(sql.query.contains("WHERE \"status\" = $1"), "{}", sql.query);
        assert_eq!(sql.params, vec!["pending".to_string()]);
    }

    #[test]
    fn typed_columns_are_cast() {
        let id = "11111111-1111-1111-1111-111111111111";
        let sql = filter(json!({ "where": { "id": id, "monthly_fee": { "$gte": 10 } } })).unwrap();
        assert!(sql.query.contains("\"id\" = $1::uuid"), "{}", sql.query);
        assert!(sql.query.contains("\"monthly_fee\" >= $2::numeric"), "{}", sql.query);
        assert_eq!(sql.params, vec![id.to_string(), "10".to_string()]);
    }

    #[test]
    fn logical_operators_share_parameter_numbering() {
        let sql = filter(json!({
            "where": {
                "$or": [ { "status": "pending" }, { "name": { "$ilike": "%crm%" } } ],
                "monthly_fee": { "$lt": 100 }
            }
        }))
        .unwrap();
        assert!(sql.query.contains("((\"status\" = $1) OR (\"name\" ILIKE $2))"), "{}", sql.query);
        assert!(sql.query.contains("\"monthly_fee\" < $3::numeric"), "{}", sql.query);
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn in_and_between_expand_placeholders() {
        let sql = filter(json!({
            "where": { "status": { "$in": ["pending", "rejected"] }, "monthly_fee": { "$between": [1, 5] } }
        }))
        .unwrap();
        assert!(sql.query.contains("\"status\" IN ($1, $2)"), "{}", sql.query);
        assert!(sql.query.contains("BETWEEN $3::numeric AND $4::numeric"), "{}", sql.query);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let sql = filter(json!({ "where": { "status": { "$in": [] } } })).unwrap();
        assert!(sql.query.contains("WHERE 1=0"), "{}", sql.query);
        assert!(sql.params.is_empty());
    }

    #[test]
    fn array_columns_support_contains() {
        let sql = filter(json!({ "where": { "channels": "youtube" } })).unwrap();
        assert!(sql.query.contains("$1 = ANY(\"channels\")"), "{}", sql.query);
        assert!(filter(json!({ "where": { "channels": { "$gt": "a" } } })).is_err());
    }

    #[test]
    fn unknown_columns_are_rejected() {
        assert!(matches!(
            filter(json!({ "where": { "password_hash": "x" } })),
            Err(FilterError::InvalidColumn(c)) if c == "password_hash"
        ));
        assert!(matches!(
            filter(json!({ "order": "password_hash desc" })),
            Err(FilterError::InvalidColumn(_))
        ));
    }

    #[test]
    fn malformed_values_fail_before_reaching_the_database() {
        assert!(filter(json!({ "where": { "id": "not-a-uuid" } })).is_err());
        assert!(filter(json!({ "where": { "monthly_fee": "cheap" } })).is_err());
        assert!(filter(json!({ "where": { "name": { "$regex": ".*" } } })).is_err());
    }

    #[test]
    fn order_and_pagination() {
        let sql = filter(json!({ "order": "name asc, created_at desc", "limit": 5, "offset": 10 })).unwrap();
        assert!(sql.query.ends_with("ORDER BY \"name\" ASC, \"created_at\" DESC LIMIT 5 OFFSET 10"), "{}", sql.query);
    }

    #[test]
    fn limit_is_capped_and_validated() {
        let max = crate::config::config().listing.max_limit;
        let mut f = Filter::new("products", COLUMNS).unwrap();
        f.limit(max + 50, None).unwrap();
        let sql = f.to_sql().unwrap();
        assert!(sql.query.ends_with(&format!("LIMIT {} OFFSET 0", max)), "{}", sql.query);
        assert!(f.limit(-1, None).is_err());
        assert!(f.limit(5, Some(-2)).is_err());
    }

    #[test]
    fn count_sql_ignores_pagination() {
        let mut f = Filter::new("products", COLUMNS).unwrap();
        f.assign(serde_json::from_value(json!({ "where": { "status": "approved" }, "limit": 3 })).unwrap())
            .unwrap();
        let sql = f.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"products\" WHERE \"status\" = $1");
    }

    #[test]
    fn table_names_are_validated() {
        assert!(Filter::new("products; DROP TABLE accounts", COLUMNS).is_err());
        assert!(Filter::new("", COLUMNS).is_err());
    }
}
