use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{FilterOrderInfo, ListParams, SortDirection};
use crate::config::PaginationConfig;
use crate::schema::EntitySchema;

/// Resolved ordering and paging for one list call against one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub order: Vec<FilterOrderInfo>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl ListFilter {
    /// Full, unpaginated listing in the entity's natural order.
    pub fn natural(schema: &EntitySchema) -> Self {
        Self {
            order: with_tiebreak(schema.order.clone()),
            limit: None,
            offset: 0,
        }
    }

    pub fn resolve(
        schema: &EntitySchema,
        params: &ListParams,
        pagination: &PaginationConfig,
    ) -> Result<Self, FilterError> {
        let order = match params.order.as_deref().map(str::trim) {
            Some(spec) if !spec.is_empty() => FilterOrder::parse(spec)?,
            _ => schema.order.clone(),
        };
        for info in &order {
            if info.column != "id" && schema.field(&info.column).is_none() {
                return Err(FilterError::UnknownColumn(info.column.clone()));
            }
        }

        let limit = match params.limit {
            Some(l) if l < 0 => {
                return Err(FilterError::InvalidLimit("limit must be non-negative".to_string()))
            }
            Some(l) if l > pagination.max_limit => {
                tracing::debug!(requested = l, max = pagination.max_limit, "capping list limit");
                Some(pagination.max_limit)
            }
            other => other,
        };
        let offset = params.offset.unwrap_or(0);
        if offset < 0 {
            return Err(FilterError::InvalidOffset("offset must be non-negative".to_string()));
        }

        Ok(Self { order: with_tiebreak(order), limit, offset })
    }

    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset > 0
    }

    pub fn order_clause(&self, qualifier: Option<&str>) -> String {
        FilterOrder::generate(&self.order, qualifier)
    }

    pub fn limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), 0) => format!("LIMIT {}", l),
            (Some(l), o) => format!("LIMIT {} OFFSET {}", l, o),
            (None, 0) => String::new(),
            (None, o) => format!("OFFSET {}", o),
        }
    }
}

/// Appends `id` so equal sort keys still come back in a stable order.
fn with_tiebreak(mut order: Vec<FilterOrderInfo>) -> Vec<FilterOrderInfo> {
    if order.iter().any(|o| o.column == "id") {
        return order;
    }
    let sort = order.first().map(|o| o.sort).unwrap_or(SortDirection::Asc);
    order.push(FilterOrderInfo { column: "id".to_string(), sort });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Catalog;

    fn pagination() -> PaginationConfig {
        PaginationConfig { max_limit: 100 }
    }

    #[test]
    fn falls_back_to_descriptor_order() {
        let catalog = Catalog::builtin();
        let tasks = catalog.get("tasks").unwrap();
        let filter = ListFilter::resolve(tasks, &ListParams::default(), &pagination()).unwrap();
        assert_eq!(filter.order[0], FilterOrderInfo::desc("created_at"));
        assert_eq!(filter.order[1], FilterOrderInfo::desc("id"));
        assert!(!filter.is_paginated());
        assert_eq!(filter.limit_clause(), "");
    }

    #[test]
    fn rejects_columns_outside_the_descriptor() {
        let catalog = Catalog::builtin();
        let leads = catalog.get("leads").unwrap();
        let params = ListParams { order: Some("password desc".into()), ..Default::default() };
        assert!(matches!(
            ListFilter::resolve(leads, &params, &pagination()),
            Err(FilterError::UnknownColumn(c)) if c == "password"
        ));
    }

    #[test]
    fn caps_limit_and_renders_offset() {
        let catalog = Catalog::builtin();
        let leads = catalog.get("leads").unwrap();
        let params = ListParams { order: None, limit: Some(5000), offset: Some(20) };
        let filter = ListFilter::resolve(leads, &params, &pagination()).unwrap();
        assert_eq!(filter.limit, Some(100));
        assert_eq!(filter.limit_clause(), "LIMIT 100 OFFSET 20");

        let negative = ListParams { limit: Some(-1), ..Default::default() };
        assert!(ListFilter::resolve(leads, &negative, &pagination()).is_err());
    }
}
