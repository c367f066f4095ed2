use crate::types::{PostRecord, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

/// Persistent url -> last-known-post mapping. Sole owner of the `posts`
/// table; all access is sequential from the detection pass.
pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    /// Opens the SQLite database at `db_path`, creating the file if it
    /// does not exist yet.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Ensures the `posts` table exists. Idempotent; called on every
    /// startup.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                url TEXT PRIMARY KEY,
                last_known_post TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Post store initialized");
        Ok(())
    }

    /// Link recorded as the most recent post seen for `url`, if any.
    pub async fn get_last_known(&self, url: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT last_known_post FROM posts WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("last_known_post")))
    }

    /// Upserts the record for `url`: a single logical replace, insert if
    /// absent, overwrite if present.
    pub async fn set_last_known(&self, url: &str, link: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO posts (url, last_known_post) VALUES (?, ?)")
            .bind(url)
            .bind(link)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All persisted records, in no particular order. Diagnostic helper
    /// for tests and operators.
    pub async fn all_records(&self) -> Result<Vec<PostRecord>> {
        let rows = sqlx::query("SELECT url, last_known_post FROM posts")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| PostRecord {
                url: r.get("url"),
                last_known_post: r.get("last_known_post"),
            })
            .collect())
    }
}
