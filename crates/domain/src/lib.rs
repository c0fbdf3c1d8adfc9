use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// A stored document. The gateway never enforces a schema, so documents stay
/// as plain JSON objects end to end.
pub type Document = Map<String, Value>;

/// Server-assigned creation time stamped onto inserted documents
pub type Timestamp = DateTime<Utc>;

/// Render a timestamp the way JSON clients expect it (`2024-01-01T00:00:00.000Z`)
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The five resource collections exposed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Videos,
    Comments,
    Playlists,
    Subscriptions,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Videos,
        Collection::Comments,
        Collection::Playlists,
        Collection::Subscriptions,
    ];

    /// Name of the backing collection in the document store
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Comments => "comments",
            Collection::Playlists => "playlists",
            Collection::Subscriptions => "subscriptions",
        }
    }

    /// Field used to address a single document in update/delete routes
    pub fn id_field(self) -> &'static str {
        match self {
            Collection::Users => "userId",
            Collection::Videos => "videoId",
            Collection::Comments => "commentId",
            Collection::Playlists => "playlistId",
            Collection::Subscriptions => "subscriber",
        }
    }

    /// Field the server sets to the insertion time
    pub fn timestamp_field(self) -> &'static str {
        match self {
            Collection::Users => "joinedDate",
            Collection::Videos => "uploadDate",
            Collection::Comments => "commentDate",
            Collection::Playlists => "playlistDate",
            Collection::Subscriptions => "subscriptionDate",
        }
    }

    /// Singular noun used in response messages ("User", "Video", ...)
    pub fn singular(self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Videos => "Video",
            Collection::Comments => "Comment",
            Collection::Playlists => "Playlist",
            Collection::Subscriptions => "Subscription",
        }
    }

    /// Lowercase singular noun ("user", "video", ...)
    pub fn noun(self) -> &'static str {
        match self {
            Collection::Users => "user",
            Collection::Videos => "video",
            Collection::Comments => "comment",
            Collection::Playlists => "playlist",
            Collection::Subscriptions => "subscription",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field holding the ordered list of videos on a playlist
pub const PLAYLIST_VIDEOS_FIELD: &str = "videos";

/// Field holding the store-generated primary key
pub const ID_FIELD: &str = "_id";

/// Merge the server timestamp into a client-supplied document.
///
/// The server value replaces any client field with the same name, so a stored
/// document always carries exactly one timestamp field.
pub fn stamp(collection: Collection, mut document: Document, ts: &Timestamp) -> Document {
    document.insert(
        collection.timestamp_field().to_string(),
        Value::String(format_timestamp(ts)),
    );
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single().unwrap()
    }

    #[test]
    fn timestamp_uses_millisecond_precision() {
        assert_eq!(format_timestamp(&fixed_time()), "2023-01-01T00:00:00.000Z");
    }

    #[test]
    fn stamp_overrides_client_timestamp() {
        let body = json!({"userId": "u1", "joinedDate": "yesterday"});
        let doc = stamp(
            Collection::Users,
            body.as_object().unwrap().clone(),
            &fixed_time(),
        );

        assert_eq!(doc.len(), 2);
        assert_eq!(doc["userId"], "u1");
        assert_eq!(doc["joinedDate"], "2023-01-01T00:00:00.000Z");
    }

    #[test]
    fn collection_fields_are_distinct() {
        let mut names: Vec<_> = Collection::ALL.iter().map(|c| c.timestamp_field()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Collection::ALL.len());
        assert_eq!(Collection::Subscriptions.id_field(), "subscriber");
        assert_eq!(Collection::Playlists.to_string(), "playlists");
    }
}
