//! In-process store with the same ordering and uniqueness semantics as
//! [`PgStore`](super::PgStore). Used when no `DATABASE_URL` is configured and
//! by the test suite.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{NewPrincipal, Principal};
use super::{CredentialStore, RecordStore};
use crate::filter::{FilterOrderInfo, ListFilter, SortDirection};
use crate::schema::{Association, EntitySchema, Row};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Table>,
    links: HashMap<String, BTreeSet<(i64, i64)>>,
    principals: BTreeMap<i64, Principal>,
    // Unique indexes over `principals`, kept in step under the same lock.
    principal_keys: HashMap<String, i64>,
    principal_emails: HashMap<String, i64>,
    last_principal_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    /// Stored row plus `id` and lookup columns, as a reader would see it.
    fn materialize(&self, schema: &EntitySchema, id: i64, stored: &Row) -> Row {
        let mut row = stored.clone();
        row.insert("id".to_string(), Value::from(id));
        for lookup in &schema.lookups {
            let value = stored
                .get(&lookup.field)
                .and_then(Value::as_i64)
                .and_then(|fk| self.tables.get(&lookup.table)?.rows.get(&fk))
                .and_then(|target| target.get(&lookup.column).cloned())
                .unwrap_or(Value::Null);
            row.insert(lookup.alias.clone(), value);
        }
        row
    }
}

/// NULLs sort after every value, as Postgres does for ascending order.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn sort_rows(rows: &mut [Row], order: &[FilterOrderInfo]) {
    rows.sort_by(|a, b| {
        for info in order {
            let ord = compare_values(a.get(&info.column), b.get(&info.column));
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn not_found(schema: &EntitySchema, id: i64) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {}", schema.name, id))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, schema: &EntitySchema, filter: &ListFilter) -> Result<Vec<Row>, DatabaseError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Row> = match inner.tables.get(&schema.table) {
            Some(table) => table.rows.iter().map(|(id, row)| inner.materialize(schema, *id, row)).collect(),
            None => Vec::new(),
        };
        sort_rows(&mut rows, &filter.order);

        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let rows = rows.into_iter().skip(offset);
        let rows: Vec<Row> = match filter.limit {
            Some(limit) => rows.take(usize::try_from(limit).unwrap_or(0)).collect(),
            None => rows.collect(),
        };
        Ok(rows.into_iter().map(|row| schema.decode_row(row)).collect())
    }

    async fn count(&self, schema: &EntitySchema) -> Result<i64, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.tables.get(&schema.table).map_or(0, |t| t.rows.len() as i64))
    }

    async fn get(&self, schema: &EntitySchema, id: i64) -> Result<Option<Row>, DatabaseError> {
        let inner = self.inner.read().await;
        let row = inner
            .tables
            .get(&schema.table)
            .and_then(|t| t.rows.get(&id))
            .map(|row| schema.decode_row(inner.materialize(schema, id, row)));
        Ok(row)
    }

    async fn insert(&self, schema: &EntitySchema, row: Row) -> Result<i64, DatabaseError> {
        let mut stored = schema.encode_row(row);
        stored.retain(|k, _| schema.field(k).is_some());

        let mut inner = self.inner.write().await;
        let table = inner.tables.entry(schema.table.clone()).or_default();
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, stored);
        Ok(id)
    }

    async fn replace(&self, schema: &EntitySchema, id: i64, row: Row) -> Result<(), DatabaseError> {
        let mut incoming = schema.encode_row(row);
        incoming.retain(|k, _| schema.writable_fields().any(|f| &f.name == k));

        let mut inner = self.inner.write().await;
        let existing = inner
            .tables
            .get_mut(&schema.table)
            .and_then(|t| t.rows.get_mut(&id))
            .ok_or_else(|| not_found(schema, id))?;
        existing.extend(incoming);
        Ok(())
    }

    async fn delete(&self, schema: &EntitySchema, id: i64) -> Result<Row, DatabaseError> {
        let mut inner = self.inner.write().await;
        let mut removed = inner
            .tables
            .get_mut(&schema.table)
            .and_then(|t| t.rows.remove(&id))
            .ok_or_else(|| not_found(schema, id))?;
        removed.insert("id".to_string(), Value::from(id));
        Ok(schema.decode_row(removed))
    }

    async fn link(&self, assoc: &Association, owner_id: i64, member_ids: &[i64]) -> Result<u64, DatabaseError> {
        let mut inner = self.inner.write().await;
        let links = inner.links.entry(assoc.table.clone()).or_default();
        let linked = member_ids.iter().filter(|m| links.insert((owner_id, **m))).count();
        Ok(linked as u64)
    }

    async fn linked(
        &self,
        assoc: &Association,
        member: &EntitySchema,
        owner_id: i64,
    ) -> Result<Vec<Row>, DatabaseError> {
        let inner = self.inner.read().await;
        let Some(links) = inner.links.get(&assoc.table) else {
            return Ok(Vec::new());
        };
        let Some(table) = inner.tables.get(&member.table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Row> = links
            .range((owner_id, i64::MIN)..=(owner_id, i64::MAX))
            .filter_map(|(_, member_id)| table.rows.get(member_id).map(|row| (*member_id, row)))
            .map(|(id, row)| {
                let mut row = row.clone();
                row.insert("id".to_string(), Value::from(id));
                row
            })
            .collect();
        sort_rows(&mut rows, &ListFilter::natural(member).order);
        Ok(rows.into_iter().map(|row| member.decode_row(row)).collect())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn register(&self, principal: NewPrincipal) -> Result<i64, DatabaseError> {
        let mut inner = self.inner.write().await;
        if inner.principal_emails.contains_key(&principal.email) {
            return Err(DatabaseError::Duplicate("users_email_key".to_string()));
        }
        if inner.principal_keys.contains_key(&principal.api_key) {
            return Err(DatabaseError::Duplicate("users_api_key_key".to_string()));
        }

        inner.last_principal_id += 1;
        let id = inner.last_principal_id;
        inner.principal_emails.insert(principal.email.clone(), id);
        inner.principal_keys.insert(principal.api_key.clone(), id);
        inner.principals.insert(
            id,
            Principal {
                id,
                name: principal.name,
                email: principal.email,
                role: principal.role,
                api_key: principal.api_key,
            },
        );
        Ok(id)
    }

    async fn find_by_key(&self, api_key: &str) -> Result<Option<Principal>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner
            .principal_keys
            .get(api_key)
            .and_then(|id| inner.principals.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Principal>, DatabaseError> {
        let inner = self.inner.read().await;
        Ok(inner.principals.values().rev().cloned().collect())
    }

    async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .principals
            .remove(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        inner.principal_keys.remove(&removed.api_key);
        inner.principal_emails.remove(&removed.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Role;
    use crate::schema::{Catalog, WriteMode};
    use chrono::Utc;
    use serde_json::json;

    fn principal(email: &str, key: &str) -> NewPrincipal {
        NewPrincipal { name: "A".into(), email: email.into(), role: Role::Agent, api_key: key.into() }
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin();
        let contacts = catalog.get("contacts").unwrap();
        let row = contacts.validate(&json!({"full_name": "A"}), WriteMode::Create, Utc::now()).unwrap();

        let first = store.insert(contacts, row.clone()).await.unwrap();
        RecordStore::delete(&store, contacts, first).await.unwrap();
        let second = store.insert(contacts, row).await.unwrap();
        assert_eq!((first, second), (1, 2));
        assert!(matches!(
            RecordStore::delete(&store, contacts, first).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_principals_leave_no_trace() {
        let store = MemoryStore::new();
        store.register(principal("a@x.com", "k1")).await.unwrap();
        assert!(matches!(
            store.register(principal("a@x.com", "k2")).await,
            Err(DatabaseError::Duplicate(_))
        ));
        assert!(matches!(
            store.register(principal("b@x.com", "k1")).await,
            Err(DatabaseError::Duplicate(_))
        ));
        assert_eq!(CredentialStore::list(&store).await.unwrap().len(), 1);
        assert!(store.find_by_key("k2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_principals_free_their_key_and_email() {
        let store = MemoryStore::new();
        let id = store.register(principal("a@x.com", "k1")).await.unwrap();
        assert_eq!(store.find_by_key("k1").await.unwrap().map(|p| p.id), Some(id));

        CredentialStore::delete(&store, id).await.unwrap();
        assert!(store.find_by_key("k1").await.unwrap().is_none());

        let again = store.register(principal("a@x.com", "k1")).await.unwrap();
        assert_ne!(again, id);
        assert_eq!(store.find_by_key("k1").await.unwrap().map(|p| p.id), Some(again));
    }

    #[tokio::test]
    async fn lists_in_descriptor_order_with_nulls_last() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin();
        let payments = catalog.get("payments").unwrap();
        for due in [json!("2024-03-01"), Value::Null, json!("2024-01-01")] {
            let row = payments.validate(&json!({"due_date": due}), WriteMode::Create, Utc::now()).unwrap();
            store.insert(payments, row).await.unwrap();
        }
        let rows = RecordStore::list(&store, payments, &ListFilter::natural(payments)).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn lookups_follow_foreign_keys() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin();
        let campaigns = catalog.get("marketing-campaigns").unwrap();
        let tests = catalog.get("campaign-tests").unwrap();

        let row = campaigns.validate(&json!({"name": "Spring"}), WriteMode::Create, Utc::now()).unwrap();
        let campaign_id = store.insert(campaigns, row).await.unwrap();
        for fk in [json!(campaign_id), json!(999)] {
            let row = tests.validate(&json!({"campaign_id": fk}), WriteMode::Create, Utc::now()).unwrap();
            store.insert(tests, row).await.unwrap();
        }

        assert_eq!(store.get(tests, 1).await.unwrap().unwrap()["campaign_name"], json!("Spring"));
        assert_eq!(store.get(tests, 2).await.unwrap().unwrap()["campaign_name"], Value::Null);
    }

    #[tokio::test]
    async fn link_is_insert_or_ignore() {
        let store = MemoryStore::new();
        let catalog = Catalog::builtin();
        let assoc = catalog.association("campaigns", "personas").unwrap();
        let personas = catalog.get("persona-library").unwrap();
        let row = personas.validate(&json!({"name": "Founder"}), WriteMode::Create, Utc::now()).unwrap();
        let persona_id = store.insert(personas, row).await.unwrap();

        assert_eq!(store.link(assoc, 1, &[persona_id, persona_id]).await.unwrap(), 1);
        assert_eq!(store.link(assoc, 1, &[persona_id]).await.unwrap(), 0);
        let linked = store.linked(assoc, personas, 1).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0]["name"], json!("Founder"));
        assert!(store.linked(assoc, personas, 2).await.unwrap().is_empty());
    }
}
