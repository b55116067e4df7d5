//! Diesel schema for session, message, task, and asset-reference storage.

diesel::table! {
    /// Conversational sessions owned by a project.
    sessions (id) {
        /// Session identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Optional space the session is connected to.
        space_id -> Nullable<Uuid>,
        /// Opaque session configuration.
        configs -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Messages; parts live out of row in a content-addressed blob.
    messages (id) {
        /// Message identifier.
        id -> Uuid,
        /// Owning session; rows cascade on session delete.
        session_id -> Uuid,
        /// Message that was most recent in the session at insert time.
        parent_id -> Nullable<Uuid>,
        /// Canonical role.
        #[max_length = 20]
        role -> Varchar,
        /// Message-level metadata.
        meta -> Nullable<Jsonb>,
        /// Asset descriptor of the serialized parts blob.
        parts_asset -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Task worker state of the message.
        #[max_length = 20]
        processing_status -> Varchar,
    }
}

diesel::table! {
    /// Per-project reference counts keyed by content address.
    asset_references (project_id, sha256) {
        /// Owning project.
        project_id -> Uuid,
        /// Hex-encoded SHA-256 of the content.
        #[max_length = 64]
        sha256 -> Varchar,
        /// Number of live references; never negative.
        ref_count -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tasks extracted from a session by the background worker.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning session; rows cascade on session delete.
        session_id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Position of the task within its session.
        task_order -> Int4,
        /// Task status.
        #[max_length = 20]
        status -> Varchar,
        /// Task payload.
        data -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(messages -> sessions (session_id));
diesel::joinable!(tasks -> sessions (session_id));

diesel::allow_tables_to_appear_in_same_query!(sessions, messages, asset_references, tasks);
