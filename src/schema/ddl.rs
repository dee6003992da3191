// CREATE TABLE statements generated from entity descriptors
use serde_json::Value;

use super::{Association, Catalog, EntitySchema, FieldDef, FieldDefault, FieldType};

pub const USERS_DDL: &str = "CREATE TABLE IF NOT EXISTS \"users\" (\n    \"id\" BIGSERIAL PRIMARY KEY,\n    \"name\" TEXT NOT NULL,\n    \"email\" TEXT NOT NULL UNIQUE,\n    \"role\" TEXT NOT NULL,\n    \"api_key\" TEXT NOT NULL UNIQUE,\n    \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now()\n);";

/// Every statement needed to bootstrap an empty database, in dependency order.
pub fn catalog_ddl(catalog: &Catalog) -> Vec<String> {
    let mut statements = vec![USERS_DDL.to_string()];
    statements.extend(catalog.entities.iter().map(create_table_ddl));
    statements.extend(catalog.associations.iter().map(association_ddl));
    statements
}

pub fn create_table_ddl(schema: &EntitySchema) -> String {
    let mut ddl = format!("CREATE TABLE IF NOT EXISTS \"{}\" (\n", schema.table);
    ddl += "    \"id\" BIGSERIAL PRIMARY KEY";

    for field in &schema.fields {
        ddl += &format!(",\n    {}", column_ddl(field));
    }

    ddl += "\n);";
    ddl
}

pub fn association_ddl(assoc: &Association) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\n    \"{owner}\" BIGINT NOT NULL,\n    \"{member}\" BIGINT NOT NULL,\n    PRIMARY KEY (\"{owner}\", \"{member}\")\n);",
        table = assoc.table,
        owner = assoc.owner_column,
        member = assoc.member_column,
    )
}

fn column_ddl(field: &FieldDef) -> String {
    let nullable = if field.required { " NOT NULL" } else { "" };
    let default = match &field.default {
        Some(FieldDefault::Value(v)) => literal(v).map(|l| format!(" DEFAULT {}", l)).unwrap_or_default(),
        _ => String::new(),
    };
    format!("\"{}\" {}{}{}", field.name, postgres_type(field.ty), nullable, default)
}

/// Timestamps stay TEXT so values come back exactly as they were written;
/// json and list columns hold their serialised form.
pub fn postgres_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text | FieldType::Timestamp | FieldType::Json | FieldType::List => "TEXT",
        FieldType::Integer => "BIGINT",
        FieldType::Decimal => "NUMERIC",
        FieldType::Boolean => "BOOLEAN",
    }
}

fn literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(format!("'{}'", value.to_string().replace('\'', "''"))),
        Value::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_table_for_descriptor() {
        let catalog = Catalog::builtin();
        let ddl = create_table_ddl(catalog.get("leads").unwrap());
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"leads\" ("));
        assert!(ddl.contains("\"id\" BIGSERIAL PRIMARY KEY"));
        assert!(ddl.contains("\"title\" TEXT NOT NULL"));
        assert!(ddl.contains("\"contact_id\" BIGINT NOT NULL"));
        assert!(ddl.contains("\"channel\" TEXT,"));

        let projects = create_table_ddl(catalog.get("projects").unwrap());
        assert!(projects.contains("\"stage\" TEXT DEFAULT 'intake'"));
        assert!(projects.contains("\"tags\" TEXT DEFAULT '[]'"));
    }

    #[test]
    fn catalog_ddl_covers_users_entities_and_links() {
        let catalog = Catalog::builtin();
        let statements = catalog_ddl(&catalog);
        assert_eq!(statements.len(), 1 + 25 + 1);
        assert!(statements[0].contains("\"api_key\" TEXT NOT NULL UNIQUE"));
        let last = statements.last().unwrap();
        assert!(last.contains("PRIMARY KEY (\"campaign_id\", \"persona_id\")"));
    }

    #[test]
    fn quotes_literals() {
        assert_eq!(literal(&Value::from("it's")), Some("'it''s'".to_string()));
        assert_eq!(literal(&Value::Null), None);
    }
}
