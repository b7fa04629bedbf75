use serde_json::json;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::types::ColumnDef;
use crate::filter::FilterData;

/// Read access to one table through the filter language
pub struct Repository<T> {
    table_name: &'static str,
    columns: &'static [ColumnDef],
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str, columns: &'static [ColumnDef], pool: PgPool) -> Self {
        Self {
            table_name,
            columns,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    fn builder(&self, filter_data: FilterData) -> Result<QueryBuilder<T>, DatabaseError> {
        QueryBuilder::<T>::new(self.table_name, self.columns)?.filter(filter_data)
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        self.builder(filter_data)?.select_all(&self.pool).await
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        let filter_data = FilterData {
            limit: Some(1),
            ..filter_data
        };
        self.builder(filter_data)?.select_optional(&self.pool).await
    }

    pub async fn select_404(&self, filter_data: FilterData) -> Result<T, DatabaseError> {
        self.select_one(filter_data)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))
    }

    pub async fn select_by_id(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_404(FilterData {
            where_clause: Some(json!({ "id": id.to_string() })),
            ..Default::default()
        })
        .await
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, DatabaseError> {
        self.builder(filter_data)?.count(&self.pool).await
    }
}
