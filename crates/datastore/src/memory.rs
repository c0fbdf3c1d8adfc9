use async_trait::async_trait;
use domain::{Collection, Document, ID_FIELD, Timestamp};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    DeleteOutcome, DocumentStore, Filter, InsertedId, StoreError, Update, UpdateOutcome,
};

/// In-memory implementation of the DocumentStore trait.
/// Documents are kept per collection in insertion order.
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Equality semantics of a MongoDB filter on one field: a scalar compares
/// directly, an array matches when it contains the value, and a null filter
/// also matches a missing field.
fn filter_matches(document: &Document, filter: &Filter) -> bool {
    match document.get(&filter.field) {
        Some(Value::Array(items)) => {
            items.contains(&filter.value)
                || matches!(&filter.value, Value::Array(wanted) if wanted == items)
        }
        Some(value) => *value == filter.value,
        None => filter.value.is_null(),
    }
}

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Apply `$set` semantics; returns whether any stored value changed.
///
/// Dotted keys (`stats.likes`) write into nested documents, creating missing
/// levels, and numeric segments index into arrays. The document is left
/// untouched when any path fails.
fn apply_set(document: &mut Document, fields: Document) -> Result<bool, StoreError> {
    let mut updated = document.clone();
    for (key, value) in fields {
        set_path(&mut updated, &key, value)?;
    }
    if updated.get(ID_FIELD) != document.get(ID_FIELD) {
        return Err(StoreError::ImmutableId);
    }

    let changed = updated != *document;
    *document = updated;
    Ok(changed)
}

fn set_path(fields: &mut Document, path: &str, value: Value) -> Result<(), StoreError> {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let slot = fields
                .entry(head)
                .or_insert_with(|| Value::Object(Document::new()));
            set_nested(slot, head, rest, value)
        }
    }
}

fn set_nested(slot: &mut Value, parent: &str, path: &str, value: Value) -> Result<(), StoreError> {
    let conflict = |slot: &Value| {
        let field = path.split('.').next().unwrap_or(path).to_string();
        StoreError::PathConflict {
            field,
            parent: parent.to_string(),
            found: slot.to_string(),
        }
    };

    match slot {
        Value::Object(fields) => set_path(fields, path, value),
        Value::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let Ok(index) = head.parse::<usize>() else {
                return Err(conflict(&Value::Array(items.clone())));
            };
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            match rest {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => {
                    let item = &mut items[index];
                    if item.is_null() {
                        *item = Value::Object(Document::new());
                    }
                    set_nested(item, head, rest, value)
                }
            }
        }
        other => Err(conflict(other)),
    }
}

fn apply_push(document: &mut Document, field: String, value: Value) -> Result<(), StoreError> {
    let id = document.get(ID_FIELD).map(render_id).unwrap_or_default();
    match document.get_mut(&field) {
        Some(Value::Array(items)) => items.push(value),
        Some(other) => {
            let found = type_name(other);
            return Err(StoreError::NotAnArray { field, found, id });
        }
        None => {
            document.insert(field, Value::Array(vec![value]));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter_matches(doc, filter)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter_matches(doc, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
        created_at: Timestamp,
    ) -> Result<InsertedId, StoreError> {
        let mut document = domain::stamp(collection, document, &created_at);
        let id = document
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()))
            .clone();

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|doc| doc.get(ID_FIELD) == Some(&id)) {
            return Err(StoreError::DuplicateKey {
                collection,
                id: id.to_string(),
            });
        }
        docs.push(document);

        Ok(InsertedId(render_id(&id)))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Update,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter_matches(doc, filter)))
        else {
            return Ok(UpdateOutcome::default());
        };

        let changed = match update {
            Update::Set(fields) => apply_set(document, fields)?,
            Update::Push { field, value } => {
                apply_push(document, field, value)?;
                true
            }
        };

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
        })
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteOutcome::default());
        };

        match docs.iter().position(|doc| filter_matches(doc, filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteOutcome { deleted: 1 })
            }
            None => Ok(DeleteOutcome::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single().unwrap()
    }

    fn object(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = InMemoryStore::new();
        let id = store
            .insert_one(
                Collection::Videos,
                object(json!({"videoId": "v1", "title": "Intro"})),
                fixed_time(),
            )
            .await
            .unwrap();

        assert_eq!(id.0.len(), 32);
        let stored = store
            .find_one(Collection::Videos, &Filter::eq("videoId", "v1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["_id"], json!(id.0));
        assert_eq!(stored["title"], "Intro");
        assert_eq!(stored["uploadDate"], "2023-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn duplicate_client_id_is_rejected() {
        let store = InMemoryStore::new();
        let doc = object(json!({"_id": "fixed", "userId": "u1"}));
        let id = store
            .insert_one(Collection::Users, doc.clone(), fixed_time())
            .await
            .unwrap();
        assert_eq!(id.to_string(), "fixed");

        let err = store
            .insert_one(Collection::Users, doc, fixed_time())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = InMemoryStore::new();
        store
            .insert_one(Collection::Users, object(json!({"userId": "u1"})), fixed_time())
            .await
            .unwrap();

        assert!(store.find_all(Collection::Videos).await.unwrap().is_empty());
        assert_eq!(store.find_all(Collection::Users).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_many_keeps_insertion_order() {
        let store = InMemoryStore::new();
        for (comment, video) in [("c1", "v1"), ("c2", "v2"), ("c3", "v1")] {
            store
                .insert_one(
                    Collection::Comments,
                    object(json!({"commentId": comment, "videoId": video})),
                    fixed_time(),
                )
                .await
                .unwrap();
        }

        let found = store
            .find_many(Collection::Comments, &Filter::eq("videoId", "v1"))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|doc| doc["commentId"].clone()).collect();
        assert_eq!(ids, vec![json!("c1"), json!("c3")]);
    }

    #[tokio::test]
    async fn filter_matches_array_members() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Subscriptions,
                object(json!({"subscriber": ["u1", "u2"]})),
                fixed_time(),
            )
            .await
            .unwrap();

        let found = store
            .find_many(Collection::Subscriptions, &Filter::eq("subscriber", "u2"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn set_reports_modified_only_on_change() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Users,
                object(json!({"userId": "u1", "name": "A", "age": 3})),
                fixed_time(),
            )
            .await
            .unwrap();
        let filter = Filter::eq("userId", "u1");

        let outcome = store
            .update_one(Collection::Users, &filter, Update::Set(object(json!({"name": "B"}))))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let outcome = store
            .update_one(Collection::Users, &filter, Update::Set(object(json!({"name": "B"}))))
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });

        let stored = store.find_one(Collection::Users, &filter).await.unwrap().unwrap();
        assert_eq!(stored["name"], "B");
        assert_eq!(stored["age"], 3);
    }

    #[tokio::test]
    async fn set_cannot_change_id() {
        let store = InMemoryStore::new();
        store
            .insert_one(Collection::Users, object(json!({"userId": "u1"})), fixed_time())
            .await
            .unwrap();

        let err = store
            .update_one(
                Collection::Users,
                &Filter::eq("userId", "u1"),
                Update::Set(object(json!({"_id": "other"}))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ImmutableId));
    }

    #[tokio::test]
    async fn set_writes_dotted_paths_into_nested_documents() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Videos,
                object(json!({"videoId": "v1", "stats": {"views": 1}, "tags": ["a"]})),
                fixed_time(),
            )
            .await
            .unwrap();
        let filter = Filter::eq("videoId", "v1");

        let outcome = store
            .update_one(
                Collection::Videos,
                &filter,
                Update::Set(object(json!({"stats.likes": 3, "meta.source.kind": "upload", "tags.1": "b"}))),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let stored = store.find_one(Collection::Videos, &filter).await.unwrap().unwrap();
        assert_eq!(stored["stats"], json!({"views": 1, "likes": 3}));
        assert_eq!(stored["meta"], json!({"source": {"kind": "upload"}}));
        assert_eq!(stored["tags"], json!(["a", "b"]));
        assert!(!stored.contains_key("stats.likes"));

        let outcome = store
            .update_one(Collection::Videos, &filter, Update::Set(object(json!({"stats.likes": 3}))))
            .await
            .unwrap();
        assert_eq!(outcome.modified, 0);
    }

    #[tokio::test]
    async fn dotted_set_through_a_scalar_fails_without_partial_writes() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Videos,
                object(json!({"videoId": "v1", "likes": 5})),
                fixed_time(),
            )
            .await
            .unwrap();
        let filter = Filter::eq("videoId", "v1");

        let err = store
            .update_one(
                Collection::Videos,
                &filter,
                Update::Set(object(json!({"title": "T", "likes.count": 1}))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PathConflict { .. }));
        assert_eq!(err.to_string(), "Cannot create field 'count' in element {likes: 5}");

        let stored = store.find_one(Collection::Videos, &filter).await.unwrap().unwrap();
        assert_eq!(stored["likes"], 5);
        assert!(!stored.contains_key("title"));
    }

    #[tokio::test]
    async fn update_without_match_is_not_an_error() {
        let store = InMemoryStore::new();
        let outcome = store
            .update_one(
                Collection::Comments,
                &Filter::eq("commentId", "missing"),
                Update::Set(object(json!({"likes": 1}))),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn push_creates_then_appends() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Playlists,
                object(json!({"playlistId": "p1"})),
                fixed_time(),
            )
            .await
            .unwrap();
        let filter = Filter::eq("playlistId", "p1");

        for video in ["v1", "v2"] {
            let outcome = store
                .update_one(
                    Collection::Playlists,
                    &filter,
                    Update::Push {
                        field: "videos".to_string(),
                        value: json!({"videoId": video}),
                    },
                )
                .await
                .unwrap();
            assert_eq!(outcome.modified, 1);
        }

        let stored = store
            .find_one(Collection::Playlists, &filter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["videos"], json!([{"videoId": "v1"}, {"videoId": "v2"}]));
    }

    #[tokio::test]
    async fn push_onto_scalar_fails() {
        let store = InMemoryStore::new();
        store
            .insert_one(
                Collection::Playlists,
                object(json!({"playlistId": "p1", "videos": "none"})),
                fixed_time(),
            )
            .await
            .unwrap();

        let err = store
            .update_one(
                Collection::Playlists,
                &Filter::eq("playlistId", "p1"),
                Update::Push {
                    field: "videos".to_string(),
                    value: json!("v1"),
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be an array but is of type string"));
    }

    #[tokio::test]
    async fn delete_removes_first_match_only() {
        let store = InMemoryStore::new();
        for name in ["first", "second"] {
            store
                .insert_one(
                    Collection::Videos,
                    object(json!({"videoId": "dup", "name": name})),
                    fixed_time(),
                )
                .await
                .unwrap();
        }
        let filter = Filter::eq("videoId", "dup");

        assert_eq!(
            store.delete_one(Collection::Videos, &filter).await.unwrap().deleted,
            1
        );
        let remaining = store.find_all(Collection::Videos).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["name"], "second");

        store.delete_one(Collection::Videos, &filter).await.unwrap();
        assert_eq!(
            store.delete_one(Collection::Videos, &filter).await.unwrap().deleted,
            0
        );
    }
}
