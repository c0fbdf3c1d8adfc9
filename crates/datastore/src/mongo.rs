use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Collection, Document, Timestamp};
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document as BsonDocument, doc};
use mongodb::{Client, Database};
use serde_json::{Number, Value};
use tracing::debug;

use crate::{
    DeleteOutcome, DocumentStore, Filter, InsertedId, StoreError, Update, UpdateOutcome,
};

/// MongoDB-backed implementation of the DocumentStore trait
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Connect to `uri` and select `database`.
    ///
    /// The driver connects lazily, so a `ping` is issued here to make an
    /// unreachable server fail at startup rather than on the first request.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        database.run_command(doc! { "ping": 1 }).await?;
        Ok(Self { database })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.name())
    }
}

fn filter_document(filter: &Filter) -> BsonDocument {
    let mut document = BsonDocument::new();
    document.insert(filter.field.clone(), json_to_bson(filter.value.clone()));
    document
}

/// Convert a JSON value to BSON. Integers that fit in 32 bits are stored as
/// `Int32`, larger ones as `Int64`, everything else numeric as `Double`.
pub(crate) fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).map_or(Bson::Int64(i), Bson::Int32),
            None => n.as_f64().map_or(Bson::Null, Bson::Double),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(json_to_document(map)),
    }
}

pub(crate) fn json_to_document(map: Document) -> BsonDocument {
    map.into_iter().map(|(k, v)| (k, json_to_bson(v))).collect()
}

/// Convert BSON back to the JSON clients see: ObjectIds become hex strings
/// and dates become RFC 3339 strings.
pub(crate) fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => Value::Object(document_to_json(doc)),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null => Value::Null,
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => {
            let millis = dt.timestamp_millis();
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map_or(Value::from(millis), |ts| {
                    Value::String(domain::format_timestamp(&ts))
                })
        }
        other => other.into_relaxed_extjson(),
    }
}

pub(crate) fn document_to_json(doc: BsonDocument) -> Document {
    doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()
}

fn render_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bson_timestamp(ts: &Timestamp) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(ts.timestamp_millis()))
}

fn update_document(update: Update) -> BsonDocument {
    match update {
        Update::Set(fields) => doc! { "$set": json_to_document(fields) },
        Update::Push { field, value } => {
            let mut push = BsonDocument::new();
            push.insert(field, json_to_bson(value));
            doc! { "$push": push }
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(doc! {}).await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let found = self
            .collection(collection)
            .find_one(filter_document(filter))
            .await?;
        Ok(found.map(document_to_json))
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(filter_document(filter))
            .await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(document_to_json).collect())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
        created_at: Timestamp,
    ) -> Result<InsertedId, StoreError> {
        let mut document = json_to_document(document);
        document.insert(collection.timestamp_field(), bson_timestamp(&created_at));

        let result = self.collection(collection).insert_one(document).await?;
        let id = render_id(&result.inserted_id);
        debug!(%collection, %id, "inserted document");
        Ok(InsertedId(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Update,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter_document(filter), update_document(update))
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteOutcome, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(filter_document(filter))
            .await?;
        Ok(DeleteOutcome {
            deleted: result.deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn json_numbers_pick_narrowest_bson_type() {
        assert_eq!(json_to_bson(json!(7)), Bson::Int32(7));
        assert_eq!(json_to_bson(json!(5_000_000_000_i64)), Bson::Int64(5_000_000_000));
        assert_eq!(json_to_bson(json!(1.5)), Bson::Double(1.5));
    }

    #[test]
    fn nested_documents_survive_conversion() {
        let original = json!({"playlistId": "p1", "videos": [{"videoId": "v1"}, 3, null, true]});
        let bson = json_to_bson(original.clone());
        assert_eq!(bson_to_json(bson), original);
    }

    #[test]
    fn object_ids_and_dates_render_as_strings() {
        let oid = ObjectId::new();
        let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single().unwrap();
        let doc = doc! { "_id": oid, "joinedDate": bson_timestamp(&ts) };

        let json = document_to_json(doc);
        assert_eq!(json["_id"], json!(oid.to_hex()));
        assert_eq!(json["joinedDate"], "2023-01-01T00:00:00.000Z");
        assert_eq!(render_id(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(render_id(&Bson::String("custom".into())), "custom");
    }

    #[test]
    fn updates_use_set_and_push_operators() {
        let fields = json!({"likes": 10}).as_object().cloned().unwrap();
        assert_eq!(
            update_document(Update::Set(fields)),
            doc! { "$set": { "likes": 10 } }
        );
        assert_eq!(
            update_document(Update::Push {
                field: "videos".to_string(),
                value: json!("v1"),
            }),
            doc! { "$push": { "videos": "v1" } }
        );
        assert_eq!(
            filter_document(&Filter::eq("userId", "u1")),
            doc! { "userId": "u1" }
        );
    }
}
