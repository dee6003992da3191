//! Postgres-backed stores. SQL is assembled from catalog identifiers (validated
//! when the catalog loads, quoted here) and every value is a bound parameter.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Postgres, Row as _};
use std::str::FromStr;

use super::manager::{quote_identifier, DatabaseError};
use super::models::{NewPrincipal, Principal, PrincipalRow};
use super::{CredentialStore, RecordStore};
use crate::filter::ListFilter;
use crate::schema::{Association, EntitySchema, FieldType, Row};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `SELECT t.*, <lookup columns> FROM <table> t LEFT JOIN ...`
fn select_with_lookups(schema: &EntitySchema) -> String {
    let mut columns = String::from("t.*");
    let mut joins = String::new();
    for (i, lookup) in schema.lookups.iter().enumerate() {
        let alias = format!("l{}", i);
        columns += &format!(", {}.{} AS {}", alias, quote_identifier(&lookup.column), quote_identifier(&lookup.alias));
        joins += &format!(
            " LEFT JOIN {} {} ON {}.\"id\" = t.{}",
            quote_identifier(&lookup.table),
            alias,
            alias,
            quote_identifier(&lookup.field)
        );
    }
    format!("SELECT {} FROM {} t{}", columns, quote_identifier(&schema.table), joins)
}

fn bind_field<'q>(q: PgQuery<'q>, ty: FieldType, column: &str, value: &Value) -> Result<PgQuery<'q>, DatabaseError> {
    let q = match ty {
        FieldType::Text | FieldType::Timestamp | FieldType::Json | FieldType::List => {
            let text = match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            };
            q.bind(text)
        }
        FieldType::Integer => q.bind(value.as_i64()),
        FieldType::Boolean => q.bind(value.as_bool()),
        FieldType::Decimal => {
            let number = match value {
                Value::Null => None,
                Value::Number(n) => Some(
                    BigDecimal::from_str(&n.to_string())
                        .map_err(|e| DatabaseError::Decode(format!("{}: {}", column, e)))?,
                ),
                other => return Err(DatabaseError::Decode(format!("{}: not a number: {}", column, other))),
            };
            q.bind(number)
        }
    };
    Ok(q)
}

fn json_row(row: &PgRow) -> Result<Row, DatabaseError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Decode(format!("expected a JSON object, got {}", other))),
    }
}

/// Columns of a validated row in descriptor order, skipping anything unknown.
fn columns<'a>(schema: &'a EntitySchema, row: &'a Row) -> Vec<(&'a str, FieldType, &'a Value)> {
    schema
        .fields
        .iter()
        .filter_map(|f| row.get(&f.name).map(|v| (f.name.as_str(), f.ty, v)))
        .collect()
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list(&self, schema: &EntitySchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(r) AS row FROM ({}) r {} {}",
            select_with_lookups(schema),
            filter.order_clause(Some("r")),
            filter.limit_clause()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(|r| json_row(r).map(|row| schema.decode_row(row))).collect()
    }

    async fn count(&self, schema: &EntitySchema) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&schema.table));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn get(&self, schema: &EntitySchema, id: i64) -> Result<Option<Row>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(r) AS row FROM ({} WHERE t.\"id\" = $1) r",
            select_with_lookups(schema)
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| json_row(&r).map(|row| schema.decode_row(row))).transpose()
    }

    async fn insert(&self, schema: &EntitySchema, row: Row) -> Result<i64, DatabaseError> {
        let row = schema.encode_row(row);
        let cols = columns(schema, &row);
        let table = quote_identifier(&schema.table);

        let sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING \"id\"", table)
        } else {
            let names: Vec<String> = cols.iter().map(|(name, _, _)| quote_identifier(name)).collect();
            let params: Vec<String> = (1..=cols.len()).map(|i| format!("${}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING \"id\"",
                table,
                names.join(", "),
                params.join(", ")
            )
        };

        let mut q = sqlx::query(&sql);
        for (name, ty, value) in &cols {
            q = bind_field(q, *ty, name, value)?;
        }
        let inserted = q.fetch_one(&self.pool).await?;
        Ok(inserted.try_get::<i64, _>("id")?)
    }

    async fn replace(&self, schema: &EntitySchema, id: i64, row: Row) -> Result<(), DatabaseError> {
        let row = schema.encode_row(row);
        let cols = columns(schema, &row);
        if cols.is_empty() {
            return match self.get(schema, id).await? {
                Some(_) => Ok(()),
                None => Err(DatabaseError::NotFound(format!("{} {}", schema.name, id))),
            };
        }

        let assignments: Vec<String> = cols
            .iter()
            .enumerate()
            .map(|(i, (name, _, _))| format!("{} = ${}", quote_identifier(name), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ${}",
            quote_identifier(&schema.table),
            assignments.join(", "),
            cols.len() + 1
        );

        let mut q = sqlx::query(&sql);
        for (name, ty, value) in &cols {
            q = bind_field(q, *ty, name, value)?;
        }
        let result = q.bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} {}", schema.name, id)));
        }
        Ok(())
    }

    async fn delete(&self, schema: &EntitySchema, id: i64) -> Result<Row, DatabaseError> {
        let sql = format!(
            "WITH d AS (DELETE FROM {} WHERE \"id\" = $1 RETURNING *) SELECT row_to_json(d) AS row FROM d",
            quote_identifier(&schema.table)
        );
        match sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await? {
            Some(r) => Ok(schema.decode_row(json_row(&r)?)),
            None => Err(DatabaseError::NotFound(format!("{} {}", schema.name, id))),
        }
    }

    async fn link(&self, assoc: &Association, owner_id: i64, member_ids: &[i64]) -> Result<u64, DatabaseError> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            quote_identifier(&assoc.table),
            quote_identifier(&assoc.owner_column),
            quote_identifier(&assoc.member_column)
        );

        let mut tx = self.pool.begin().await?;
        let mut linked = 0;
        for member_id in member_ids {
            let result = sqlx::query(&sql).bind(owner_id).bind(*member_id).execute(&mut *tx).await?;
            linked += result.rows_affected();
        }
        tx.commit().await?;
        Ok(linked)
    }

    async fn linked(
        &self,
        assoc: &Association,
        member: &EntitySchema,
        owner_id: i64,
    ) -> Result<Vec<Row>, DatabaseError> {
        let filter = ListFilter::natural(member);
        let sql = format!(
            "SELECT row_to_json(r) AS row FROM (SELECT m.* FROM {} m JOIN {} j ON j.{} = m.\"id\" WHERE j.{} = $1) r {}",
            quote_identifier(&member.table),
            quote_identifier(&assoc.table),
            quote_identifier(&assoc.member_column),
            quote_identifier(&assoc.owner_column),
            filter.order_clause(Some("r"))
        );
        let rows = sqlx::query(&sql).bind(owner_id).fetch_all(&self.pool).await?;
        rows.iter().map(|r| json_row(r).map(|row| member.decode_row(row))).collect()
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn register(&self, principal: NewPrincipal) -> Result<i64, DatabaseError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO \"users\" (\"name\", \"email\", \"role\", \"api_key\") VALUES ($1, $2, $3, $4) RETURNING \"id\"",
        )
        .bind(&principal.name)
        .bind(&principal.email)
        .bind(principal.role.as_str())
        .bind(&principal.api_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_key(&self, api_key: &str) -> Result<Option<Principal>, DatabaseError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "SELECT \"id\", \"name\", \"email\", \"role\", \"api_key\" FROM \"users\" WHERE \"api_key\" = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Principal::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Principal>, DatabaseError> {
        let rows = sqlx::query_as::<_, PrincipalRow>(
            "SELECT \"id\", \"name\", \"email\", \"role\", \"api_key\" FROM \"users\" ORDER BY \"id\" DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Principal::try_from).collect()
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM \"users\" WHERE \"id\" = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Catalog;

    #[test]
    fn builds_lookup_joins() {
        let catalog = Catalog::builtin();
        let sql = select_with_lookups(catalog.get("support-requests").unwrap());
        assert_eq!(
            sql,
            "SELECT t.*, l0.\"full_name\" AS \"client_name\", l1.\"title\" AS \"project_title\" \
             FROM \"support_requests\" t \
             LEFT JOIN \"contacts\" l0 ON l0.\"id\" = t.\"client_id\" \
             LEFT JOIN \"projects\" l1 ON l1.\"id\" = t.\"project_id\""
        );
    }

    #[test]
    fn plain_entities_select_star() {
        let catalog = Catalog::builtin();
        let sql = select_with_lookups(catalog.get("contacts").unwrap());
        assert_eq!(sql, "SELECT t.* FROM \"contacts\" t");
    }
}
