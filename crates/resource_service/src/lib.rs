use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod body;
mod error;
pub mod handlers;

pub use body::JsonBody;
pub use error::ApiError;

/// Store handle injected into every handler
pub type SharedStore = Arc<dyn datastore::DocumentStore>;

/// Create the router for the resource API
///
/// Routes sharing a path differ only in method, so the path parameter has a
/// single name per position (`/playlists/{id}` serves both the by-user
/// listing and the by-playlist delete).
pub fn create_router(store: SharedStore) -> Router {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/videos",
            get(handlers::list_videos).post(handlers::create_video),
        )
        .route(
            "/videos/{id}",
            get(handlers::get_video).delete(handlers::delete_video),
        )
        .route("/videos/{id}/likes", patch(handlers::update_video_likes))
        .route("/videos/{id}/comments", get(handlers::list_video_comments))
        .route("/comments", post(handlers::create_comment))
        .route("/comments/{id}", delete(handlers::delete_comment))
        .route("/comments/{id}/likes", patch(handlers::update_comment_likes))
        .route("/playlists", post(handlers::create_playlist))
        .route(
            "/playlists/{id}",
            get(handlers::list_user_playlists).delete(handlers::delete_playlist),
        )
        .route("/playlists/{id}/videos", put(handlers::append_playlist_video))
        .route("/subscriptions", post(handlers::create_subscription))
        .route("/subscriptions/{id}", get(handlers::list_subscriptions))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
