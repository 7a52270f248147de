use chrono::{DateTime, Utc};
use tstore_types::{Document, SESSION_PATH, SYS_TIME_PATH};

/// One row of the group-by-session summarization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub session: String,
    /// Capture time of the first document seen for the session.
    pub first_seen: Option<DateTime<Utc>>,
    pub count: u64,
}

/// Group documents by `_ts_meta.session`.
///
/// Documents without a string session are skipped. Rows come out in the
/// order their session was first encountered, and `first_seen` is the
/// capture time of that first document, so callers should feed documents
/// in insertion order.
pub fn summarize_sessions<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Vec<SessionSummary> {
    let mut rows: Vec<SessionSummary> = Vec::new();
    for doc in docs {
        let Some(session) = doc.get_path(SESSION_PATH).and_then(|v| v.as_str()) else {
            continue;
        };
        match rows.iter_mut().find(|row| row.session == session) {
            Some(row) => row.count += 1,
            None => rows.push(SessionSummary {
                session: session.to_string(),
                first_seen: doc.get_path(SYS_TIME_PATH).and_then(|v| v.as_time()).copied(),
                count: 1,
            }),
        }
    }
    rows
}
