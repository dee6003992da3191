use serde_json::Value;

/// Client-side copy of a collection, kept in sync with the outcome of each
/// mutation instead of re-fetching the whole list.
#[derive(Debug, Clone, Default)]
pub struct LocalView {
    records: Vec<Value>,
}

impl LocalView {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&Value> {
        self.records.iter().find(|r| record_id(r) == Some(id))
    }

    /// New records go to the front, matching newest-first listings.
    pub fn created(&mut self, record: Value) {
        self.records.insert(0, record);
    }

    /// Swap in the updated record; returns false if it was not in view.
    pub fn updated(&mut self, record: Value) -> bool {
        let Some(id) = record_id(&record) else {
            return false;
        };
        match self.records.iter_mut().find(|r| record_id(r) == Some(id)) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn deleted(&mut self, id: i64) -> bool {
        let before = self.records.len();
        self.records.retain(|r| record_id(r) != Some(id));
        self.records.len() != before
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_mutations_in_place() {
        let mut view = LocalView::new(vec![json!({"id": 2, "name": "b"}), json!({"id": 1, "name": "a"})]);

        view.created(json!({"id": 3, "name": "c"}));
        assert_eq!(view.records()[0]["id"], 3);

        assert!(view.updated(json!({"id": 1, "name": "renamed"})));
        assert_eq!(view.find(1).unwrap()["name"], "renamed");
        assert!(!view.updated(json!({"id": 9})));

        assert!(view.deleted(2));
        assert!(!view.deleted(2));
        assert_eq!(view.len(), 2);
    }
}
