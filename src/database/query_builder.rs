use sqlx::{postgres::PgRow, FromRow, PgPool, Row};

use crate::database::manager::DatabaseError;
use crate::filter::types::{ColumnDef, SqlResult};
use crate::filter::{Filter, FilterData};

/// Filtered SELECT over one allowlisted table
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &str, columns: &'static [ColumnDef]) -> Result<Self, DatabaseError> {
        Ok(Self {
            filter: Filter::new(table_name, columns)?,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter.assign(filter_data)?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql = self.filter.to_sql()?;
        tracing::debug!("select_all: {}", sql.query);
        let rows = bind_all_as::<T>(&sql).fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let sql = self.filter.to_sql()?;
        let row = bind_all_as::<T>(&sql).fetch_optional(pool).await?;
        Ok(row)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = q.bind(p.as_str());
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

// Every filter parameter is text; the generated SQL casts per column kind.
fn bind_all_as<'q, T>(
    sql: &'q SqlResult,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, T, sqlx::postgres::PgArguments>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = q.bind(p.as_str());
    }
    q
}
