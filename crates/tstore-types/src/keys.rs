//! Reserved key names shared by every layer.

/// Top-level key holding the record identifier.
pub const ID_KEY: &str = "_id";

/// Top-level namespace holding record metadata.
pub const META_KEY: &str = "_ts_meta";

/// Session identifier inside [`META_KEY`].
pub const SESSION_KEY: &str = "session";

/// Capture time inside [`META_KEY`].
pub const SYS_TIME_KEY: &str = "sys_time";

/// Dotted path of the session field, used for by-session queries.
pub const SESSION_PATH: &str = "_ts_meta.session";

/// Dotted path of the capture time field.
pub const SYS_TIME_PATH: &str = "_ts_meta.sys_time";

/// Key prefix marking a leaf whose payload was moved to the blob store.
pub const MARKER_PREFIX: &str = "__gridfs_file_";
