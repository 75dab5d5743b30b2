use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS dialogue (
            id             INTEGER PRIMARY KEY,
            episode_title  TEXT NOT NULL,
            episode_number INTEGER NOT NULL,
            season         INTEGER NOT NULL,
            season_name    TEXT NOT NULL,
            character      TEXT NOT NULL,
            dialogue       TEXT NOT NULL,
            transcript_url TEXT NOT NULL,
            image_url      TEXT,
            created_at     TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(episode_title, character, dialogue)
        );
        CREATE INDEX IF NOT EXISTS idx_dialogue_episode ON dialogue(episode_title);
        CREATE INDEX IF NOT EXISTS idx_dialogue_character ON dialogue(character);
        ",
    )?;
    Ok(())
}

/// One persisted line of dialogue with its episode context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueLine {
    pub episode_title: String,
    pub episode_number: u32,
    pub season: u32,
    pub season_name: String,
    pub character: String,
    pub dialogue: String,
    pub transcript_url: String,
    pub image_url: Option<String>,
}

/// Where extracted lines end up. Only the orchestrator writes to it.
pub trait DialogueStore {
    /// Returns false when the exact line was already stored.
    fn insert(&mut self, line: &DialogueLine) -> Result<bool>;
    fn existing_episode_titles(&self) -> Result<HashSet<String>>;
    /// Returns the number of rows removed.
    fn clear(&mut self) -> Result<usize>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl DialogueStore for SqliteStore {
    fn insert(&mut self, line: &DialogueLine) -> Result<bool> {
        let n = self
            .conn
            .prepare_cached(
                "INSERT OR IGNORE INTO dialogue
                 (episode_title, episode_number, season, season_name, character, dialogue, transcript_url, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(rusqlite::params![
                line.episode_title,
                line.episode_number,
                line.season,
                line.season_name,
                line.character,
                line.dialogue,
                line.transcript_url,
                line.image_url,
            ])
            .with_context(|| format!("Failed to store line for {}", line.episode_title))?;
        Ok(n > 0)
    }

    fn existing_episode_titles(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT episode_title FROM dialogue")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(titles)
    }

    fn clear(&mut self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM dialogue", [])?)
    }
}

// ── Export ──

const LINE_COLUMNS: &str =
    "episode_title, episode_number, season, season_name, character, dialogue, transcript_url, image_url";

fn line_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DialogueLine> {
    Ok(DialogueLine {
        episode_title: row.get(0)?,
        episode_number: row.get(1)?,
        season: row.get(2)?,
        season_name: row.get(3)?,
        character: row.get(4)?,
        dialogue: row.get(5)?,
        transcript_url: row.get(6)?,
        image_url: row.get(7)?,
    })
}

pub fn all_lines(conn: &Connection) -> Result<Vec<DialogueLine>> {
    let sql = format!(
        "SELECT {} FROM dialogue ORDER BY season, episode_number, id",
        LINE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], line_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Search ──

/// Lines whose dialogue contains `keywords` and whose speaker contains
/// `character` (both case-insensitive), optionally in one season.
pub fn search_lines(
    conn: &Connection,
    keywords: Option<&str>,
    character: Option<&str>,
    season: Option<u32>,
    limit: usize,
) -> Result<Vec<DialogueLine>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(k) = keywords.filter(|k| !k.is_empty()) {
        conditions.push(format!("instr(lower(dialogue), lower(?{})) > 0", params.len() + 1));
        params.push(Box::new(k.to_string()));
    }
    if let Some(c) = character.filter(|c| !c.is_empty()) {
        conditions.push(format!("instr(lower(character), lower(?{})) > 0", params.len() + 1));
        params.push(Box::new(c.to_string()));
    }
    if let Some(s) = season {
        conditions.push(format!("season = ?{}", params.len() + 1));
        params.push(Box::new(s));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT {} FROM dialogue{}
         ORDER BY season, episode_number, id
         LIMIT {}",
        LINE_COLUMNS, where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), line_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub lines: usize,
    pub episodes: usize,
    pub characters: usize,
    pub top_characters: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection, top: usize) -> Result<Stats> {
    let lines: usize = conn.query_row("SELECT COUNT(*) FROM dialogue", [], |r| r.get(0))?;
    let episodes: usize =
        conn.query_row("SELECT COUNT(DISTINCT episode_title) FROM dialogue", [], |r| r.get(0))?;
    let characters: usize =
        conn.query_row("SELECT COUNT(DISTINCT character) FROM dialogue", [], |r| r.get(0))?;
    let mut stmt = conn.prepare(
        "SELECT character, COUNT(*) AS n FROM dialogue
         GROUP BY character ORDER BY n DESC, character LIMIT ?1",
    )?;
    let top_characters = stmt
        .query_map([top as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats {
        lines,
        episodes,
        characters,
        top_characters,
    })
}
