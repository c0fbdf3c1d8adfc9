use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use datastore::{DocumentStore, Filter, Update};
use domain::{Collection, Document, PLAYLIST_VIDEOS_FIELD};

use crate::SharedStore;
use crate::body::JsonBody;
use crate::error::ApiError;

type Listing = Result<Json<Vec<Document>>, ApiError>;
type Single = Result<Json<Document>, ApiError>;
type Message = Result<(StatusCode, String), ApiError>;

// Operations shared by every collection. Each one issues exactly one store call.

async fn list_all(store: &dyn DocumentStore, collection: Collection) -> Listing {
    store
        .find_all(collection)
        .await
        .map(Json)
        .map_err(ApiError::store("fetching", collection.name()))
}

async fn find_by_id(
    store: &dyn DocumentStore,
    collection: Collection,
    id: String,
    not_found: &'static str,
) -> Single {
    store
        .find_one(collection, &Filter::eq(collection.id_field(), id))
        .await
        .map_err(ApiError::store("fetching", collection.noun()))?
        .map(Json)
        .ok_or(ApiError::NotFound(not_found))
}

/// List documents whose `field` equals `value`; an empty result is a 404
async fn find_related(
    store: &dyn DocumentStore,
    collection: Collection,
    field: &str,
    value: String,
    not_found: &'static str,
) -> Listing {
    let docs = store
        .find_many(collection, &Filter::eq(field, value))
        .await
        .map_err(ApiError::store("fetching", collection.name()))?;
    if docs.is_empty() {
        return Err(ApiError::NotFound(not_found));
    }
    Ok(Json(docs))
}

async fn create(store: &dyn DocumentStore, collection: Collection, body: JsonBody) -> Message {
    let document = body.into_document()?;
    let id = store
        .insert_one(collection, document, Utc::now())
        .await
        .map_err(ApiError::store("adding", collection.noun()))?;
    Ok((
        StatusCode::CREATED,
        format!("{} added with ID: {id}", collection.singular()),
    ))
}

async fn update(
    store: &dyn DocumentStore,
    collection: Collection,
    id: String,
    change: Update,
) -> Message {
    let outcome = store
        .update_one(collection, &Filter::eq(collection.id_field(), id), change)
        .await
        .map_err(ApiError::store("updating", collection.noun()))?;
    Ok((
        StatusCode::OK,
        format!("{} document(s) updated", outcome.modified),
    ))
}

async fn set_fields(
    store: &dyn DocumentStore,
    collection: Collection,
    id: String,
    body: JsonBody,
) -> Message {
    let fields = body.into_object()?;
    update(store, collection, id, Update::Set(fields)).await
}

async fn delete(store: &dyn DocumentStore, collection: Collection, id: String) -> Message {
    let outcome = store
        .delete_one(collection, &Filter::eq(collection.id_field(), id))
        .await
        .map_err(ApiError::store("deleting", collection.noun()))?;
    Ok((
        StatusCode::OK,
        format!("{} document(s) deleted", outcome.deleted),
    ))
}

// Users

pub async fn list_users(State(store): State<SharedStore>) -> Listing {
    list_all(store.as_ref(), Collection::Users).await
}

pub async fn get_user(State(store): State<SharedStore>, Path(user_id): Path<String>) -> Single {
    find_by_id(store.as_ref(), Collection::Users, user_id, "User not found").await
}

pub async fn create_user(State(store): State<SharedStore>, body: JsonBody) -> Message {
    create(store.as_ref(), Collection::Users, body).await
}

pub async fn update_user(
    State(store): State<SharedStore>,
    Path(user_id): Path<String>,
    body: JsonBody,
) -> Message {
    set_fields(store.as_ref(), Collection::Users, user_id, body).await
}

pub async fn delete_user(State(store): State<SharedStore>, Path(user_id): Path<String>) -> Message {
    delete(store.as_ref(), Collection::Users, user_id).await
}

// Videos

pub async fn list_videos(State(store): State<SharedStore>) -> Listing {
    list_all(store.as_ref(), Collection::Videos).await
}

pub async fn get_video(State(store): State<SharedStore>, Path(video_id): Path<String>) -> Single {
    find_by_id(store.as_ref(), Collection::Videos, video_id, "Video not found").await
}

pub async fn create_video(State(store): State<SharedStore>, body: JsonBody) -> Message {
    create(store.as_ref(), Collection::Videos, body).await
}

/// Overwrites whichever fields the caller sends; the "likes" path does not
/// increment anything.
pub async fn update_video_likes(
    State(store): State<SharedStore>,
    Path(video_id): Path<String>,
    body: JsonBody,
) -> Message {
    set_fields(store.as_ref(), Collection::Videos, video_id, body).await
}

pub async fn delete_video(
    State(store): State<SharedStore>,
    Path(video_id): Path<String>,
) -> Message {
    delete(store.as_ref(), Collection::Videos, video_id).await
}

// Comments

pub async fn list_video_comments(
    State(store): State<SharedStore>,
    Path(video_id): Path<String>,
) -> Listing {
    find_related(
        store.as_ref(),
        Collection::Comments,
        Collection::Videos.id_field(),
        video_id,
        "No comments found for this video",
    )
    .await
}

pub async fn create_comment(State(store): State<SharedStore>, body: JsonBody) -> Message {
    create(store.as_ref(), Collection::Comments, body).await
}

pub async fn update_comment_likes(
    State(store): State<SharedStore>,
    Path(comment_id): Path<String>,
    body: JsonBody,
) -> Message {
    set_fields(store.as_ref(), Collection::Comments, comment_id, body).await
}

pub async fn delete_comment(
    State(store): State<SharedStore>,
    Path(comment_id): Path<String>,
) -> Message {
    delete(store.as_ref(), Collection::Comments, comment_id).await
}

// Playlists

pub async fn list_user_playlists(
    State(store): State<SharedStore>,
    Path(user_id): Path<String>,
) -> Listing {
    find_related(
        store.as_ref(),
        Collection::Playlists,
        Collection::Users.id_field(),
        user_id,
        "No playlists found for this user",
    )
    .await
}

pub async fn create_playlist(State(store): State<SharedStore>, body: JsonBody) -> Message {
    create(store.as_ref(), Collection::Playlists, body).await
}

/// Appends the request body as one entry of the playlist's `videos` array
pub async fn append_playlist_video(
    State(store): State<SharedStore>,
    Path(playlist_id): Path<String>,
    body: JsonBody,
) -> Message {
    let entry = body.into_element()?;
    let push = Update::Push {
        field: PLAYLIST_VIDEOS_FIELD.to_string(),
        value: entry,
    };
    update(store.as_ref(), Collection::Playlists, playlist_id, push).await
}

pub async fn delete_playlist(
    State(store): State<SharedStore>,
    Path(playlist_id): Path<String>,
) -> Message {
    delete(store.as_ref(), Collection::Playlists, playlist_id).await
}

// Subscriptions

pub async fn list_subscriptions(
    State(store): State<SharedStore>,
    Path(subscriber): Path<String>,
) -> Listing {
    find_related(
        store.as_ref(),
        Collection::Subscriptions,
        Collection::Subscriptions.id_field(),
        subscriber,
        "No subscriptions found for this user",
    )
    .await
}

pub async fn create_subscription(State(store): State<SharedStore>, body: JsonBody) -> Message {
    create(store.as_ref(), Collection::Subscriptions, body).await
}
