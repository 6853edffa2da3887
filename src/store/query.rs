//! # Queries
//!
//! Equality filters with a single ordering field. This is the whole query
//! surface the consistency layer relies on.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{Collection, Document};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality predicate on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// Check if a document satisfies this filter
    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A filtered, optionally ordered query over one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub collection: Collection,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of a collection
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality filter
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Order results by a field
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if a document of this query's collection matches every filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Evaluate the query over a set of candidate documents
    ///
    /// Ties on the ordering field fall back to document id so results are
    /// stable between evaluations.
    pub fn evaluate<'a, I>(&self, docs: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut results: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            results.sort_by(|a, b| {
                let cmp = compare_json_values(a.get(&order.field), b.get(&order.field));
                let cmp = match order.direction {
                    Direction::Ascending => cmp,
                    Direction::Descending => cmp.reverse(),
                };
                cmp.then_with(|| a.id.cmp(&b.id))
            });
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results
    }
}

/// Compare two JSON field values for ordering
///
/// Missing values sort after present ones.
fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        let Value::Object(map) = data else {
            panic!("test documents must be objects");
        };
        Document::new(id, map)
    }

    #[test]
    fn test_equality_filters() {
        let query = Query::collection(Collection::Versions)
            .where_eq("chapterId", "c1")
            .where_eq("isCurrent", true);

        assert!(query.matches(&doc("v1", json!({"chapterId": "c1", "isCurrent": true}))));
        assert!(!query.matches(&doc("v2", json!({"chapterId": "c1", "isCurrent": false}))));
        assert!(!query.matches(&doc("v3", json!({"chapterId": "c2", "isCurrent": true}))));
        assert!(!query.matches(&doc("v4", json!({"chapterId": "c1"}))));
    }

    #[test]
    fn test_ordering_descending() {
        let docs = vec![
            doc("a", json!({"versionNumber": 1})),
            doc("b", json!({"versionNumber": 3})),
            doc("c", json!({"versionNumber": 2})),
        ];

        let query =
            Query::collection(Collection::Versions).order_by("versionNumber", Direction::Descending);
        let ids: Vec<String> = query.evaluate(&docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_missing_field_sorts_last_and_limit() {
        let docs = vec![
            doc("a", json!({})),
            doc("b", json!({"chapterNumber": 2})),
            doc("c", json!({"chapterNumber": 1})),
        ];

        let query = Query::collection(Collection::Chapters)
            .order_by("chapterNumber", Direction::Ascending)
            .limit(2);
        let ids: Vec<String> = query.evaluate(&docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
