use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Association, EntitySchema, FieldDef, SchemaError};
use crate::filter::filter_order::is_identifier;
use crate::filter::FilterOrderInfo;

/// Route segments owned by dedicated handlers.
const RESERVED_ROUTES: &[&str] = &["users", "status", "uploads", "campaigns"];

static BUILTIN: Lazy<Catalog> = Lazy::new(builtin_catalog);

/// The set of entities served by the generic resource controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub entities: Vec<EntitySchema>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl Catalog {
    pub fn builtin() -> Catalog {
        BUILTIN.clone()
    }

    pub fn from_yaml_str(source: &str) -> Result<Catalog, SchemaError> {
        let catalog: Catalog = serde_yaml::from_str(source)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Catalog, SchemaError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&source)
    }

    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn by_table(&self, table: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.table == table)
    }

    /// Association served at `/<owner_path>/:id/<member_path>`.
    pub fn association(&self, owner_path: &str, member_path: &str) -> Option<&Association> {
        self.associations
            .iter()
            .find(|a| a.owner_path == owner_path && a.member_path == member_path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }

    /// Every name that ends up in SQL must be a plain identifier, and route
    /// segments must not shadow the dedicated routes.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        let mut tables = HashSet::new();

        for entity in &self.entities {
            if !is_route_segment(&entity.name) {
                return Err(SchemaError::InvalidRouteName(entity.name.clone()));
            }
            if RESERVED_ROUTES.contains(&entity.name.as_str()) {
                return Err(SchemaError::ReservedRouteName(entity.name.clone()));
            }
            if !names.insert(entity.name.as_str()) || !tables.insert(entity.table.as_str()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
            check_identifier(&entity.table)?;

            let mut fields = HashSet::new();
            for field in &entity.fields {
                check_identifier(&field.name)?;
                if field.name == "id" || !fields.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            for order in &entity.order {
                if order.column != "id" && entity.field(&order.column).is_none() {
                    return Err(SchemaError::UnknownField {
                        entity: entity.name.clone(),
                        field: order.column.clone(),
                    });
                }
            }

            if let Some(attachment) = &entity.attachment {
                if entity.field(&attachment.field).is_none() {
                    return Err(SchemaError::UnknownField {
                        entity: entity.name.clone(),
                        field: attachment.field.clone(),
                    });
                }
                if !is_route_segment(&attachment.subdir) {
                    return Err(SchemaError::InvalidIdentifier(attachment.subdir.clone()));
                }
            }

            for lookup in &entity.lookups {
                check_identifier(&lookup.table)?;
                check_identifier(&lookup.column)?;
                check_identifier(&lookup.alias)?;
                if entity.field(&lookup.field).is_none() {
                    return Err(SchemaError::UnknownField {
                        entity: entity.name.clone(),
                        field: lookup.field.clone(),
                    });
                }
                let target_known = self
                    .by_table(&lookup.table)
                    .map(|target| lookup.column == "id" || target.field(&lookup.column).is_some())
                    .unwrap_or(false);
                if !target_known {
                    return Err(SchemaError::UnknownLookupTarget {
                        entity: entity.name.clone(),
                        target: format!("{}.{}", lookup.table, lookup.column),
                    });
                }
            }
        }

        for assoc in &self.associations {
            check_identifier(&assoc.table)?;
            check_identifier(&assoc.owner_column)?;
            check_identifier(&assoc.member_column)?;
            if self.get(&assoc.owner).is_none() || self.get(&assoc.member).is_none() {
                return Err(SchemaError::UnknownAssociationEntity(assoc.table.clone()));
            }
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

fn is_route_segment(name: &str) -> bool {
    !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn builtin_catalog() -> Catalog {
    use FieldDef as F;

    let entities = vec![
        EntitySchema::new("contacts", "contacts", vec![
            F::text("full_name").required(),
            F::text("phone"),
            F::text("email"),
            F::text("status"),
            F::text("notes"),
        ]),
        EntitySchema::new("leads", "leads", vec![
            F::text("title").required(),
            F::text("description"),
            F::integer("contact_id").required(),
            F::text("channel"),
            F::text("funnel_stage"),
            F::text("status"),
        ]),
        EntitySchema::new("tasks", "tasks", vec![
            F::text("title").required(),
            F::text("description"),
            F::text("type"),
            F::text("assigned_to"),
            F::timestamp("due_date"),
            F::text("status"),
            F::text("priority"),
            F::text("related_to"),
            F::integer("related_id"),
            F::timestamp("created_at").created(),
            F::timestamp("updated_at").default_now(),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("created_at")),
        EntitySchema::new("meetings", "meetings", vec![
            F::integer("contact_id"),
            F::text("title"),
            F::timestamp("datetime"),
            F::text("location"),
            F::text("status"),
        ]),
        EntitySchema::new("quotes", "quotes", vec![
            F::integer("contact_id"),
            F::decimal("amount"),
            F::text("status"),
            F::text("file_url"),
        ])
        .with_attachment("file_url", "quotes"),
        EntitySchema::new("payments", "payments", vec![
            F::integer("quote_id"),
            F::decimal("amount"),
            F::text("status"),
            F::timestamp("due_date"),
            F::timestamp("paid_at"),
            F::text("invoice_link"),
            F::integer("reminder_count").default_value(json!(0)),
            F::timestamp("last_reminder_at"),
            F::text("client_email"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::asc("due_date"))
        .with_attachment("invoice_link", "invoices"),
        EntitySchema::new("agent-requests", "agent_requests", vec![
            F::text("agent_name"),
            F::text("action"),
            F::text("target_table"),
            F::integer("target_id"),
            F::text("input_prompt"),
            F::text("output"),
            F::text("status"),
            F::timestamp("timestamp").created(),
        ])
        .order_by(FilterOrderInfo::desc("timestamp")),
        EntitySchema::new("freelancers", "freelancers", vec![
            F::text("name"),
            F::text("skill"),
            F::text("contact_email"),
            F::text("whatsapp"),
            F::boolean("is_available").default_value(json!(true)),
            F::integer("current_load").default_value(json!(0)),
            F::decimal("rating").default_value(json!(0)),
            F::text("notes"),
            F::timestamp("created_at").created(),
        ])
        .order_by(FilterOrderInfo::desc("created_at")),
        EntitySchema::new("projects", "projects", vec![
            F::integer("contact_id"),
            F::text("title"),
            F::text("description"),
            F::text("status").default_value(json!("new")),
            F::text("stage").default_value(json!("intake")),
            F::text("current_agent"),
            F::text("next_action"),
            F::timestamp("start_date").default_now(),
            F::timestamp("last_update").default_now(),
            F::text("full_spec"),
            F::text("admin_notes"),
            F::list("tags").default_value(json!([])),
        ])
        .order_by(FilterOrderInfo::desc("start_date")),
        EntitySchema::new("project-assignments", "project_assignments", vec![
            F::integer("project_id"),
            F::integer("freelancer_id"),
            F::timestamp("assigned_at").default_now(),
            F::timestamp("due_date"),
            F::text("status").default_value(json!("assigned")),
            F::text("delivery_link"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("assigned_at")),
        EntitySchema::new("qa-reviews", "qa_reviews", vec![
            F::integer("project_id"),
            F::text("reviewer"),
            F::text("status"),
            F::text("notes"),
            F::timestamp("approved_at"),
            F::timestamp("created_at").created(),
        ])
        .order_by(FilterOrderInfo::desc("created_at")),
        EntitySchema::new("deliveries", "deliveries", vec![
            F::integer("project_id"),
            F::text("delivery_link"),
            F::timestamp("delivered_at").default_now(),
            F::text("delivered_by"),
            F::text("followup_status"),
            F::text("feedback"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("delivered_at")),
        EntitySchema::new("support-articles", "support_articles", vec![
            F::text("question_keywords"),
            F::text("answer_text"),
            F::text("related_agent"),
            F::text("category"),
            F::text("media_link"),
            F::timestamp("last_updated").default_now(),
            F::integer("times_used").default_value(json!(0)),
        ])
        .order_by(FilterOrderInfo::desc("last_updated")),
        EntitySchema::new("growth-opportunities", "growth_opportunities", vec![
            F::integer("client_id"),
            F::integer("project_id"),
            F::text("suggested_offer"),
            F::text("status").default_value(json!("sent")),
            F::timestamp("response_date"),
            F::text("next_step"),
            F::text("sent_by"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("response_date")),
        EntitySchema::new("marketing-insights", "marketing_insights", vec![
            F::timestamp("date").default_now(),
            F::text("client_segment"),
            F::text("insight_type"),
            F::text("insight_text"),
            F::text("source_type"),
            F::integer("source_id"),
            F::decimal("impact_score"),
            F::text("recommendation"),
            F::boolean("used_in_strategy").default_value(json!(false)),
            F::text("used_by_agent"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("date")),
        EntitySchema::new("system-changes", "system_changes", vec![
            F::text("reason"),
            F::list("affected_agents").default_value(json!([])),
            F::text("proposed_structure"),
            F::text("impact_risks"),
            F::text("testing_plan"),
            F::text("status").default_value(json!("draft")),
            F::text("approved_by"),
            F::text("version"),
            F::timestamp("created_at").created(),
            F::timestamp("updated_at").default_now(),
        ])
        .order_by(FilterOrderInfo::desc("updated_at")),
        EntitySchema::new("content-posts", "content_posts", vec![
            F::text("platform"),
            F::text("post_type"),
            F::text("title"),
            F::text("content_text"),
            F::text("media_link"),
            F::text("cta_text"),
            F::timestamp("posted_at"),
            F::text("created_by"),
            F::integer("related_campaign_id"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("posted_at")),
        EntitySchema::new("content-feedback", "content_feedback", vec![
            F::integer("post_id"),
            F::integer("client_id"),
            F::text("feedback_text"),
            F::integer("rating"),
            F::timestamp("created_at").default_now(),
        ])
        .order_by(FilterOrderInfo::desc("created_at")),
        EntitySchema::new("content-ideas", "content_ideas", vec![
            F::text("idea_text").required(),
            F::text("source"),
            F::text("status"),
            F::text("intended_platform"),
            F::text("created_by"),
            F::integer("used_in_post_id"),
            F::timestamp("created_at").default_now(),
        ])
        .order_by(FilterOrderInfo::desc("created_at")),
        EntitySchema::new("marketing-campaigns", "marketing_campaigns", vec![
            F::text("name"),
            F::text("goal"),
            F::text("platform"),
            F::timestamp("start_date"),
            F::timestamp("end_date"),
            F::decimal("budget"),
            F::text("status"),
            F::text("owner_agent"),
            F::text("summary"),
            F::json("results_json").default_value(json!({})),
        ])
        .order_by(FilterOrderInfo::desc("start_date")),
        EntitySchema::new("persona-library", "persona_library", vec![
            F::text("name"),
            F::text("pain_points"),
            F::text("goals"),
            F::text("triggers"),
            F::text("tone"),
            F::text("platforms"),
            F::text("tags"),
            F::timestamp("updated_at").default_now(),
        ])
        .order_by(FilterOrderInfo::desc("updated_at")),
        EntitySchema::new("trend-scanner-logs", "trend_scanner_logs", vec![
            F::timestamp("date").default_now(),
            F::text("source"),
            F::text("title"),
            F::decimal("relevance_score"),
            F::text("category"),
            F::text("insight_text"),
            F::text("used_in"),
        ])
        .order_by(FilterOrderInfo::desc("date")),
        EntitySchema::new("campaign-tests", "campaign_tests", vec![
            F::integer("campaign_id"),
            F::text("test_type"),
            F::text("version_a"),
            F::text("version_b"),
            F::text("result"),
            F::timestamp("tested_at"),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("tested_at"))
        .with_lookup("campaign_id", "marketing_campaigns", "name", "campaign_name"),
        EntitySchema::new("content-remixes", "content_remixes", vec![
            F::integer("source_post_id"),
            F::text("platform"),
            F::text("remix_type"),
            F::text("title"),
            F::text("content_text"),
            F::text("media_link"),
            F::timestamp("created_at").default_now(),
            F::text("notes"),
        ])
        .order_by(FilterOrderInfo::desc("created_at"))
        .with_lookup("source_post_id", "content_posts", "title", "source_post_title"),
        EntitySchema::new("support-requests", "support_requests", vec![
            F::integer("client_id"),
            F::integer("project_id"),
            F::text("message"),
            F::text("type"),
            F::text("emotion"),
            F::text("status"),
            F::text("handled_by"),
            F::timestamp("created_at").default_now(),
            F::timestamp("updated_at").default_now(),
        ])
        .order_by(FilterOrderInfo::desc("created_at"))
        .with_lookup("client_id", "contacts", "full_name", "client_name")
        .with_lookup("project_id", "projects", "title", "project_title"),
    ];

    let associations = vec![Association {
        owner_path: "campaigns".to_string(),
        owner: "marketing-campaigns".to_string(),
        owner_column: "campaign_id".to_string(),
        member_path: "personas".to_string(),
        member: "persona-library".to_string(),
        member_column: "persona_id".to_string(),
        table: "marketing_campaigns_personas".to_string(),
        body_key: "persona_ids".to_string(),
    }];

    Catalog { entities, associations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortDirection;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        catalog.validate().unwrap();
        assert_eq!(catalog.entities.len(), 25);
        assert!(catalog.association("campaigns", "personas").is_some());
    }

    #[test]
    fn builtin_orders_and_attachments() {
        let catalog = Catalog::builtin();
        let payments = catalog.get("payments").unwrap();
        assert_eq!(payments.order[0].column, "due_date");
        assert_eq!(payments.order[0].sort, SortDirection::Asc);
        assert_eq!(payments.attachment.as_ref().unwrap().field, "invoice_link");
        assert!(catalog.get("contacts").unwrap().order.is_empty());
        assert_eq!(catalog.by_table("persona_library").unwrap().name, "persona-library");
    }

    #[test]
    fn rejects_reserved_and_unsafe_names() {
        let yaml = "entities:\n  - name: users\n    table: people\n    fields: []\n";
        assert!(matches!(Catalog::from_yaml_str(yaml), Err(SchemaError::ReservedRouteName(_))));

        let yaml = "entities:\n  - name: notes\n    table: \"notes; drop\"\n    fields: []\n";
        assert!(matches!(Catalog::from_yaml_str(yaml), Err(SchemaError::InvalidIdentifier(_))));
    }

    #[test]
    fn loads_yaml_catalog() {
        let yaml = r#"
entities:
  - name: notes
    table: notes
    fields:
      - name: body
        type: text
        required: true
      - name: pinned
        type: boolean
      - name: written_at
        type: timestamp
        auto: created
    order:
      - column: written_at
        sort: desc
"#;
        let catalog = Catalog::from_yaml_str(yaml).unwrap();
        let notes = catalog.get("notes").unwrap();
        assert!(notes.field("body").unwrap().required);
        assert_eq!(notes.order[0], FilterOrderInfo::desc("written_at"));
        assert_eq!(notes.writable_fields().count(), 2);
    }
}
