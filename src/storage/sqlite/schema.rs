//! Schema definition for the embedded store.
//!
//! One `branches` row is pre-seeded at id 1 for `main` (invariant: `main`
//! always exists and is never deleted). `entities.name` is unique only
//! within `branch_id`, never globally. The FTS5 shadow table mirrors
//! `entities` via the standard `content=`/`content_rowid=` contentless-sync
//! pattern, kept current by the `entities_ai`/`entities_ad`/`entities_au`
//! triggers.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS branches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    purpose TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    status_reason TEXT,
    original_content TEXT NOT NULL DEFAULT '',
    optimized_content TEXT NOT NULL DEFAULT '',
    token_count INTEGER NOT NULL DEFAULT 0,
    compression_ratio REAL NOT NULL DEFAULT 1.0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    last_accessed INTEGER NOT NULL,
    UNIQUE(branch_id, name),
    FOREIGN KEY(branch_id) REFERENCES branches(id) ON DELETE CASCADE
) STRICT;

CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);
CREATE INDEX IF NOT EXISTS idx_entities_branch_id ON entities(branch_id);
CREATE INDEX IF NOT EXISTS idx_entities_status ON entities(status);
CREATE INDEX IF NOT EXISTS idx_entities_entity_type ON entities(entity_type);
CREATE INDEX IF NOT EXISTS idx_entities_last_accessed ON entities(last_accessed);

CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    optimized_content TEXT NOT NULL DEFAULT '',
    sequence_order INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(entity_id) REFERENCES entities(id) ON DELETE CASCADE
) STRICT;

CREATE INDEX IF NOT EXISTS idx_observations_entity_id ON observations(entity_id);

CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_id INTEGER NOT NULL,
    from_entity_id INTEGER NOT NULL,
    to_entity_id INTEGER NOT NULL,
    relation_type TEXT NOT NULL,
    auto_generated INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    UNIQUE(from_entity_id, to_entity_id, relation_type),
    FOREIGN KEY(branch_id) REFERENCES branches(id) ON DELETE CASCADE,
    FOREIGN KEY(from_entity_id) REFERENCES entities(id) ON DELETE CASCADE,
    FOREIGN KEY(to_entity_id) REFERENCES entities(id) ON DELETE CASCADE
) STRICT;

CREATE INDEX IF NOT EXISTS idx_relations_from ON relations(from_entity_id);
CREATE INDEX IF NOT EXISTS idx_relations_to ON relations(to_entity_id);
CREATE INDEX IF NOT EXISTS idx_relations_type ON relations(relation_type);

CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL,
    term TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 0.0,
    context TEXT,
    FOREIGN KEY(entity_id) REFERENCES entities(id) ON DELETE CASCADE
) STRICT;

CREATE INDEX IF NOT EXISTS idx_keywords_term ON keywords(term);
CREATE INDEX IF NOT EXISTS idx_keywords_entity_id ON keywords(entity_id);

-- Cross-references deliberately have no foreign key on (target_branch,
-- target_entity_name): the referenced branch or entity need not exist yet.
CREATE TABLE IF NOT EXISTS cross_references (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL,
    target_branch TEXT NOT NULL,
    target_entity_name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(entity_id) REFERENCES entities(id) ON DELETE CASCADE
) STRICT;

CREATE INDEX IF NOT EXISTS idx_cross_references_entity_id ON cross_references(entity_id);

CREATE VIRTUAL TABLE IF NOT EXISTS entities_fts USING fts5(
    name,
    entity_type,
    optimized_content,
    content='entities',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS entities_ai AFTER INSERT ON entities BEGIN
    INSERT INTO entities_fts(rowid, name, entity_type, optimized_content)
    VALUES (new.id, new.name, new.entity_type, new.optimized_content);
END;

CREATE TRIGGER IF NOT EXISTS entities_ad AFTER DELETE ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type, optimized_content)
    VALUES ('delete', old.id, old.name, old.entity_type, old.optimized_content);
END;

CREATE TRIGGER IF NOT EXISTS entities_au AFTER UPDATE ON entities BEGIN
    INSERT INTO entities_fts(entities_fts, rowid, name, entity_type, optimized_content)
    VALUES ('delete', old.id, old.name, old.entity_type, old.optimized_content);
    INSERT INTO entities_fts(rowid, name, entity_type, optimized_content)
    VALUES (new.id, new.name, new.entity_type, new.optimized_content);
END;
"#;

/// Seeds the `main` branch at id 1 if it is not already present.
pub const SEED_MAIN_BRANCH: &str = r#"
INSERT OR IGNORE INTO branches (id, name, purpose, created_at, updated_at)
VALUES (1, 'main', 'default branch', unixepoch(), unixepoch());
"#;
