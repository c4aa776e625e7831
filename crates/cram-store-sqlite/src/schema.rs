//! SQL schema for the Cram SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS folders (
    folder_id   TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    color       TEXT,
    emoji       TEXT,
    position    INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS topics (
    topic_id        TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    folder_id       TEXT REFERENCES folders(folder_id),
    title           TEXT NOT NULL,
    tags            TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    content         TEXT NOT NULL,
    summary         TEXT NOT NULL,
    position        INTEGER NOT NULL,
    archived_at     TEXT,                         -- NULL while active
    created_at      TEXT NOT NULL,
    last_studied_at TEXT
);

-- `seq` keeps the order in which the generator produced the material.
CREATE TABLE IF NOT EXISTS flashcards (
    flashcard_id TEXT PRIMARY KEY,
    topic_id     TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    question     TEXT NOT NULL,
    answer       TEXT NOT NULL,
    example      TEXT NOT NULL DEFAULT '',
    seq          INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS test_questions (
    question_id TEXT PRIMARY KEY,
    topic_id    TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    kind        TEXT NOT NULL,                    -- 'multiple_choice' | 'true_false'
    question    TEXT NOT NULL,
    options     TEXT NOT NULL DEFAULT '[]',       -- JSON array of strings
    answer      TEXT NOT NULL,
    seq         INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS test_attempts (
    attempt_id TEXT PRIMARY KEY,
    topic_id   TEXT NOT NULL REFERENCES topics(topic_id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL,
    score      REAL NOT NULL CHECK (score BETWEEN 0 AND 100),
    taken_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS topics_user_idx        ON topics(user_id, folder_id);
CREATE INDEX IF NOT EXISTS topics_title_idx       ON topics(user_id, title);
CREATE INDEX IF NOT EXISTS folders_user_idx       ON folders(user_id);
CREATE INDEX IF NOT EXISTS flashcards_topic_idx   ON flashcards(topic_id);
CREATE INDEX IF NOT EXISTS questions_topic_idx    ON test_questions(topic_id);
CREATE INDEX IF NOT EXISTS attempts_topic_idx     ON test_attempts(topic_id);

PRAGMA user_version = 1;
";
