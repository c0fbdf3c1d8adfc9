use domain::Collection;

/// Failures surfaced by a [`DocumentStore`](crate::DocumentStore) backend.
///
/// The `Display` text is what clients see after the route prefix, so each
/// variant renders the backend's own message without extra decoration.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The MongoDB driver reported an error
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A document with the same `_id` already exists
    #[error("duplicate key error collection: {collection} index: _id_ dup key: {{ _id: {id} }}")]
    DuplicateKey { collection: Collection, id: String },

    /// `$push` targeted a field holding something other than an array
    #[error("The field '{field}' must be an array but is of type {found} in document {{_id: {id}}}")]
    NotAnArray {
        field: String,
        found: &'static str,
        id: String,
    },

    /// A dotted `$set` path runs through a value that cannot hold fields
    #[error("Cannot create field '{field}' in element {{{parent}: {found}}}")]
    PathConflict {
        field: String,
        parent: String,
        found: String,
    },

    /// An update tried to change the `_id` of an existing document
    #[error("Performing an update on the path '_id' would modify the immutable field '_id'")]
    ImmutableId,
}
