/// Schema for local tables. Every statement is idempotent.
pub const SCHEMA: &str = r#"
-- Listings the user swiped right on
CREATE TABLE IF NOT EXISTS liked_listings (
    listing_id TEXT PRIMARY KEY,
    liked_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Running counters per listing
CREATE TABLE IF NOT EXISTS listing_metrics (
    listing_id TEXT PRIMARY KEY,
    views INTEGER NOT NULL DEFAULT 0,
    swipe_rights INTEGER NOT NULL DEFAULT 0,
    swipe_lefts INTEGER NOT NULL DEFAULT 0,
    shares INTEGER NOT NULL DEFAULT 0
);

-- Timestamped event log for trends
CREATE TABLE IF NOT EXISTS metric_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    listing_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    user_id TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_metric_events_recorded
    ON metric_events(recorded_at);

-- Renter preferences as key/value pairs; commute is a JSON array
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
