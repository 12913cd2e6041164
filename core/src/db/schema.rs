//! Database schema definitions.

/// Tables every initialized catalog must contain
pub const REQUIRED_TABLES: &[&str] = &[
    "commands",
    "command_tags",
    "command_history",
    "command_fts",
    "schema_version",
];

/// SQL statements to create the database schema
pub const SCHEMA_V1: &str = r#"
-- Known commands
CREATE TABLE IF NOT EXISTS commands (
    id INTEGER PRIMARY KEY,
    command TEXT NOT NULL CHECK (length(trim(command)) > 0),
    explanation TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    platform TEXT NOT NULL DEFAULT '',      -- comma-joined, e.g. 'linux,macos'
    dangerous INTEGER NOT NULL DEFAULT 0,
    danger_reason TEXT NOT NULL DEFAULT '',
    popularity INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- Tags (many-to-many with commands)
CREATE TABLE IF NOT EXISTS command_tags (
    command_id INTEGER NOT NULL REFERENCES commands(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    PRIMARY KEY (command_id, tag)
);

-- Usage audit log, deliberately not linked to commands
CREATE TABLE IF NOT EXISTS command_history (
    id INTEGER PRIMARY KEY,
    query TEXT NOT NULL,
    command TEXT NOT NULL,
    executed INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL DEFAULT 0,
    platform TEXT NOT NULL DEFAULT '',
    timestamp INTEGER NOT NULL
);

-- Full-text index, rowid = commands.id
CREATE VIRTUAL TABLE IF NOT EXISTS command_fts USING fts5(
    command,
    explanation,
    category,
    tags,
    tokenize='porter unicode61'
);

-- Keep command_fts in sync with commands
CREATE TRIGGER IF NOT EXISTS commands_ai AFTER INSERT ON commands BEGIN
    INSERT INTO command_fts(rowid, command, explanation, category, tags)
    VALUES (new.id, new.command, new.explanation, new.category,
            (SELECT COALESCE(GROUP_CONCAT(tag, ' '), '') FROM command_tags WHERE command_id = new.id));
END;

CREATE TRIGGER IF NOT EXISTS commands_ad AFTER DELETE ON commands BEGIN
    DELETE FROM command_fts WHERE rowid = old.id;
END;

CREATE TRIGGER IF NOT EXISTS commands_au AFTER UPDATE OF command, explanation, category ON commands BEGIN
    UPDATE command_fts SET
        command = new.command,
        explanation = new.explanation,
        category = new.category
    WHERE rowid = new.id;
END;

-- Keep the tags column in sync with command_tags
CREATE TRIGGER IF NOT EXISTS command_tags_ai AFTER INSERT ON command_tags BEGIN
    UPDATE command_fts
    SET tags = (SELECT COALESCE(GROUP_CONCAT(tag, ' '), '') FROM command_tags WHERE command_id = new.command_id)
    WHERE rowid = new.command_id;
END;

CREATE TRIGGER IF NOT EXISTS command_tags_ad AFTER DELETE ON command_tags BEGIN
    UPDATE command_fts
    SET tags = (SELECT COALESCE(GROUP_CONCAT(tag, ' '), '') FROM command_tags WHERE command_id = old.command_id)
    WHERE rowid = old.command_id;
END;

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- Indexes for fast queries
CREATE INDEX IF NOT EXISTS idx_commands_command_platform ON commands(command, platform);
CREATE INDEX IF NOT EXISTS idx_commands_popularity ON commands(popularity DESC);
CREATE INDEX IF NOT EXISTS idx_command_tags_tag ON command_tags(tag);
"#;
