use crate::domain::error::{BridgeError, EngineError};
use crate::domain::model::{LanguagePair, PackageMetadata};
use crate::domain::segment::{self, DEFAULT_MAX_PHRASE_WORDS};
use crate::domain::traits::Translator;
use async_trait::async_trait;
use std::path::Path;
use tokio_rusqlite::Connection;

pub const PHRASES_FILE: &str = "phrases.db";

/// Translator backed by an installed package's phrase table.
pub struct PhraseTableTranslator {
    conn: Connection,
    pair: LanguagePair,
    max_words: usize,
    unspaced: bool,
}

impl PhraseTableTranslator {
    pub async fn open(package_dir: &Path, metadata: &PackageMetadata) -> Result<Self, BridgeError> {
        let db_path = package_dir.join(PHRASES_FILE);
        if !db_path.exists() {
            return Err(BridgeError::Package(format!(
                "Phrase table missing: {}",
                db_path.display()
            )));
        }

        let conn = Connection::open(db_path).await?;

        // 打开时校验表结构，避免首个请求才暴露损坏的包
        let entries: i64 = conn
            .call(|conn| -> rusqlite::Result<i64> {
                conn.query_row("SELECT COUNT(*) FROM phrases", [], |row| row.get(0))
            })
            .await?;

        let pair = metadata.pair()?;
        tracing::debug!("Phrase table for {} has {} entries", pair, entries);

        Ok(Self {
            conn,
            unspaced: segment::is_unspaced(&pair.target),
            pair,
            max_words: metadata
                .max_phrase_words
                .unwrap_or(DEFAULT_MAX_PHRASE_WORDS),
        })
    }
}

#[async_trait]
impl Translator for PhraseTableTranslator {
    fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    async fn translate(&self, text: &str) -> Result<String, EngineError> {
        let text = text.to_string();
        let max_words = self.max_words;
        let unspaced = self.unspaced;

        let translated = self
            .conn
            .call(move |conn| -> rusqlite::Result<String> {
                let mut stmt = conn.prepare_cached("SELECT target FROM phrases WHERE source = ?1")?;
                segment::translate_with(&text, max_words, unspaced, |key| {
                    use rusqlite::OptionalExtension;
                    stmt.query_row([key], |row| row.get::<_, String>(0)).optional()
                })
            })
            .await?;

        Ok(translated)
    }
}
