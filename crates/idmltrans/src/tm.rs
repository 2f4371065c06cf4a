use crate::prelude::{println, *};
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use idmltrans_core::language::TargetLanguage;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_text TEXT NOT NULL,
    source_lang TEXT,
    target_text TEXT NOT NULL,
    target_lang TEXT NOT NULL,
    context_hash TEXT,
    model TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    last_used TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    usage_count INTEGER DEFAULT 1,
    UNIQUE(source_text, target_lang, context_hash)
);

CREATE INDEX IF NOT EXISTS idx_source_text ON translations(source_text);
CREATE INDEX IF NOT EXISTS idx_context ON translations(context_hash);
CREATE INDEX IF NOT EXISTS idx_langs ON translations(source_lang, target_lang);
";

/// SQLite-backed store of past translations.
///
/// Identical source segments recur constantly across manual revisions;
/// serving them from the store keeps terminology consistent between runs
/// and avoids paying for the same API call twice.
pub struct TranslationMemory {
    conn: Connection,
}

#[derive(Debug)]
pub struct TmStats {
    pub total_translations: usize,
    pub by_language: Vec<(String, usize)>,
    pub most_used: Vec<(String, String, usize)>,
}

impl TranslationMemory {
    /// Opens the default store at `~/.idmltrans/tm.db`, creating it on
    /// first use.
    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path()?)
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| eyre!(Error::Memory(f!("failed to open {}: {e}", path.display()))))?;
        conn.execute_batch(SCHEMA)?;
        Ok(TranslationMemory { conn })
    }

    /// Exact-match lookup. A hit bumps its usage counters.
    pub fn lookup(
        &self,
        source_text: &str,
        language: TargetLanguage,
        context: Option<&str>,
    ) -> Result<Option<String>> {
        let hash = context_hash(context, language);
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, target_text FROM translations
                 WHERE source_text = ?1 AND target_lang = ?2 AND context_hash = ?3
                 ORDER BY last_used DESC
                 LIMIT 1",
                (source_text, language.code(), &hash),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, target_text)) = row {
            self.conn.execute(
                "UPDATE translations
                 SET last_used = CURRENT_TIMESTAMP, usage_count = usage_count + 1
                 WHERE id = ?1",
                (id,),
            )?;
            Ok(Some(target_text))
        } else {
            Ok(None)
        }
    }

    /// Stores a translation; re-storing the same (source, language, context)
    /// overwrites the target and bumps the usage count.
    pub fn store(
        &self,
        source_text: &str,
        target_text: &str,
        language: TargetLanguage,
        context: Option<&str>,
        model: &str,
    ) -> Result<()> {
        let hash = context_hash(context, language);
        self.conn.execute(
            "INSERT INTO translations
             (source_text, source_lang, target_text, target_lang, context_hash, model)
             VALUES (?1, 'it', ?2, ?3, ?4, ?5)
             ON CONFLICT(source_text, target_lang, context_hash)
             DO UPDATE SET
                 target_text = excluded.target_text,
                 last_used = CURRENT_TIMESTAMP,
                 usage_count = usage_count + 1",
            (source_text, target_text, language.code(), &hash, model),
        )?;
        Ok(())
    }

    pub fn stats(&self) -> Result<TmStats> {
        let total_translations: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM translations", (), |row| row.get(0))?;

        let mut by_language = Vec::new();
        let mut statement = self.conn.prepare(
            "SELECT target_lang, COUNT(*) FROM translations
             GROUP BY target_lang ORDER BY COUNT(*) DESC LIMIT 5",
        )?;
        let rows = statement.query_map((), |row| Ok((row.get(0)?, row.get(1)?)))?;
        for row in rows {
            by_language.push(row?);
        }

        let mut most_used = Vec::new();
        let mut statement = self.conn.prepare(
            "SELECT source_text, target_text, usage_count FROM translations
             ORDER BY usage_count DESC LIMIT 10",
        )?;
        let rows = statement.query_map((), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        for row in rows {
            most_used.push(row?);
        }

        Ok(TmStats {
            total_translations,
            by_language,
            most_used,
        })
    }

    /// Deletes every stored translation and returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM translations", ())?;
        Ok(deleted)
    }
}

fn default_db_path() -> Result<PathBuf> {
    let dir = dirs_next::home_dir()
        .ok_or_else(|| eyre!("Unable to determine home directory"))?
        .join(".idmltrans");
    std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create translation memory directory: {}", e))?;
    Ok(dir.join("tm.db"))
}

/// Short context hash; includes the target language so translations of the
/// same source into different languages never collide.
fn context_hash(context: Option<&str>, language: TargetLanguage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(context.unwrap_or(""));
    hasher.update(language.code());
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| f!("{b:02x}")).collect()
}

#[derive(Debug, clap::Parser)]
#[command(name = "tm")]
#[command(about = "Translation memory operations")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Show translation memory statistics
    #[clap(name = "stats")]
    Stats(DbOptions),

    /// Delete all stored translations
    #[clap(name = "clear")]
    Clear(DbOptions),
}

#[derive(Debug, clap::Args, Clone)]
pub struct DbOptions {
    /// Path to the translation memory database
    #[arg(long, env = "IDMLTRANS_TM_DB")]
    db: Option<PathBuf>,
}

fn open(options: &DbOptions) -> Result<TranslationMemory> {
    match &options.db {
        Some(path) => TranslationMemory::open(path),
        None => TranslationMemory::open_default(),
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    match app.command {
        Commands::Stats(options) => {
            let tm = open(&options)?;
            let stats = tm.stats()?;

            let mut table = new_table();
            table.add_row(prettytable::row!["Total translations", stats.total_translations]);
            for (language, count) in &stats.by_language {
                table.add_row(prettytable::row![f!("  {language}"), count]);
            }
            table.printstd();

            if global.verbose && !stats.most_used.is_empty() {
                println!();
                println!("Most reused translations:");
                let mut table = new_table();
                for (source, target, uses) in &stats.most_used {
                    table.add_row(prettytable::row![uses, source, target]);
                }
                table.printstd();
            }
            Ok(())
        }
        Commands::Clear(options) => {
            let tm = open(&options)?;
            let deleted = tm.clear()?;
            println!("Deleted {deleted} stored translations");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> (tempfile::TempDir, TranslationMemory) {
        let dir = tempfile::tempdir().unwrap();
        let tm = TranslationMemory::open(&dir.path().join("tm.db")).unwrap();
        (dir, tm)
    }

    #[test]
    fn test_store_and_lookup() {
        let (_dir, tm) = memory();
        tm.store("Montaggio", "Montage", TargetLanguage::German, None, "test-model")
            .unwrap();

        let hit = tm.lookup("Montaggio", TargetLanguage::German, None).unwrap();
        assert_eq!(hit.as_deref(), Some("Montage"));

        // Other languages and unknown texts miss.
        assert!(tm.lookup("Montaggio", TargetLanguage::French, None).unwrap().is_none());
        assert!(tm.lookup("Fissaggio", TargetLanguage::German, None).unwrap().is_none());
    }

    #[test]
    fn test_restore_updates_target_and_usage() {
        let (_dir, tm) = memory();
        tm.store("Montaggio", "Montage alt", TargetLanguage::German, None, "m")
            .unwrap();
        tm.store("Montaggio", "Montage", TargetLanguage::German, None, "m")
            .unwrap();

        let hit = tm.lookup("Montaggio", TargetLanguage::German, None).unwrap();
        assert_eq!(hit.as_deref(), Some("Montage"));

        let stats = tm.stats().unwrap();
        assert_eq!(stats.total_translations, 1);
        // Upsert counted once, lookup once more.
        assert_eq!(stats.most_used[0].2, 3);
    }

    #[test]
    fn test_context_separates_entries() {
        let (_dir, tm) = memory();
        tm.store("Guida", "Führung", TargetLanguage::German, Some("mechanical"), "m")
            .unwrap();
        tm.store("Guida", "Anleitung", TargetLanguage::German, Some("manual"), "m")
            .unwrap();

        assert_eq!(
            tm.lookup("Guida", TargetLanguage::German, Some("mechanical"))
                .unwrap()
                .as_deref(),
            Some("Führung")
        );
        assert_eq!(
            tm.lookup("Guida", TargetLanguage::German, Some("manual"))
                .unwrap()
                .as_deref(),
            Some("Anleitung")
        );
        assert_eq!(tm.stats().unwrap().total_translations, 2);
    }

    #[test]
    fn test_clear() {
        let (_dir, tm) = memory();
        tm.store("uno", "eins", TargetLanguage::German, None, "m").unwrap();
        tm.store("due", "zwei", TargetLanguage::German, None, "m").unwrap();
        assert_eq!(tm.clear().unwrap(), 2);
        assert_eq!(tm.stats().unwrap().total_translations, 0);
    }
}
