/// SQL DDL for the skein-store database.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS threads (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL,
    thread_ts TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_message_ts TEXT,
    message_count INTEGER NOT NULL DEFAULT 0,
    new_message_count INTEGER NOT NULL DEFAULT 0,
    is_read INTEGER NOT NULL DEFAULT 1,
    is_archived INTEGER NOT NULL DEFAULT 0,
    summary_topic TEXT NOT NULL DEFAULT '',
    summary_generated_at TEXT,
    UNIQUE (channel_id, thread_ts)
);

CREATE TABLE IF NOT EXISTS message_lists (
    thread_id TEXT PRIMARY KEY REFERENCES threads(id),
    channel_id TEXT NOT NULL,
    thread_ts TEXT NOT NULL,
    payload TEXT NOT NULL,
    last_fetched_at TEXT
);

CREATE TABLE IF NOT EXISTS summaries (
    thread_id TEXT PRIMARY KEY REFERENCES threads(id),
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_threads_source ON threads(channel_id, thread_ts);
CREATE INDEX IF NOT EXISTS idx_threads_archived ON threads(is_archived);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
