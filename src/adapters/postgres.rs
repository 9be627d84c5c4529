//! PostgreSQL `VideoRepository`.

use crate::domain::video::{Counter, Publication, Video, VideoFile, VideoId, VideoStatus};
use crate::error::RepositoryError;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

/// Tables owned jointly with the upload side. Applied idempotently at startup.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id             BIGSERIAL PRIMARY KEY,
    title          TEXT NOT NULL,
    status         TEXT NOT NULL DEFAULT 'processing',
    duration       INTEGER NOT NULL DEFAULT 0,
    hls_master_url TEXT,
    thumbnail      TEXT,
    views_count    BIGINT NOT NULL DEFAULT 0,
    likes_count    BIGINT NOT NULL DEFAULT 0,
    published_at   TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS video_files (
    id           BIGSERIAL PRIMARY KEY,
    video_id     BIGINT NOT NULL REFERENCES videos (id) ON DELETE CASCADE,
    quality      TEXT NOT NULL,
    playlist_url TEXT NOT NULL,
    bitrate      INTEGER NOT NULL,
    file_size    BIGINT NOT NULL,
    UNIQUE (video_id, quality)
);
"#;

const VIDEO_COLUMNS: &str = "id, title, status, duration, hls_master_url, thumbnail, \
                             views_count, likes_count, published_at";

#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

fn video_from_row(row: &PgRow) -> Result<Video, RepositoryError> {
    let status: String = row.try_get("status")?;
    let duration: i32 = row.try_get("duration")?;
    Ok(Video {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        status: status.parse().map_err(RepositoryError::InvalidData)?,
        duration: u32::try_from(duration)
            .map_err(|_| RepositoryError::InvalidData(format!("negative duration {}", duration)))?,
        hls_master_url: row.try_get("hls_master_url")?,
        thumbnail: row.try_get("thumbnail")?,
        views_count: row.try_get("views_count")?,
        likes_count: row.try_get("likes_count")?,
        published_at: row.try_get("published_at")?,
    })
}

fn file_from_row(row: &PgRow) -> Result<VideoFile, RepositoryError> {
    let bitrate: i32 = row.try_get("bitrate")?;
    let file_size: i64 = row.try_get("file_size")?;
    Ok(VideoFile {
        video_id: row.try_get("video_id")?,
        quality: row.try_get("quality")?,
        playlist_url: row.try_get("playlist_url")?,
        bitrate: u32::try_from(bitrate)
            .map_err(|_| RepositoryError::InvalidData(format!("negative bitrate {}", bitrate)))?,
        file_size: u64::try_from(file_size)
            .map_err(|_| RepositoryError::InvalidData(format!("negative size {}", file_size)))?,
    })
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM videos WHERE id = $1", VIDEO_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(video_from_row).transpose()
    }

    async fn record_duration(&self, id: VideoId, duration_secs: u32) -> Result<(), RepositoryError> {
        let duration = i32::try_from(duration_secs).unwrap_or(i32::MAX);
        let result = sqlx::query("UPDATE videos SET duration = $2 WHERE id = $1")
            .bind(id)
            .bind(duration)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn publish(&self, id: VideoId, publication: &Publication) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM videos WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound(id));
        }

        sqlx::query(
            r#"
            UPDATE videos
            SET status = $2,
                hls_master_url = $3,
                thumbnail = COALESCE($4, thumbnail),
                published_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(VideoStatus::Ready.as_str())
        .bind(&publication.hls_master_url)
        .bind(publication.thumbnail.as_deref())
        .bind(publication.published_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM video_files WHERE video_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for file in &publication.files {
            sqlx::query(
                r#"
                INSERT INTO video_files (video_id, quality, playlist_url, bitrate, file_size)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(&file.quality)
            .bind(&file.playlist_url)
            .bind(i32::try_from(file.bitrate).unwrap_or(i32::MAX))
            .bind(i64::try_from(file.file_size).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(video_id = id, files = publication.files.len(), "Published video");
        Ok(())
    }

    async fn mark_failed(&self, id: VideoId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE videos SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(VideoStatus::Failed.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn video_files(&self, id: VideoId) -> Result<Vec<VideoFile>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT video_id, quality, playlist_url, bitrate, file_size
            FROM video_files
            WHERE video_id = $1
            ORDER BY bitrate ASC, quality ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(file_from_row).collect()
    }

    async fn ready_without_thumbnail(&self) -> Result<Vec<Video>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM videos WHERE status = $1 AND thumbnail IS NULL ORDER BY id",
            VIDEO_COLUMNS
        ))
        .bind(VideoStatus::Ready.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(video_from_row).collect()
    }

    async fn set_thumbnail(&self, id: VideoId, key: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE videos SET thumbnail = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn increment(&self, id: VideoId, counter: Counter, by: i64) -> Result<i64, RepositoryError> {
        let column = counter.column();
        let value: Option<i64> = sqlx::query_scalar(&format!(
            "UPDATE videos SET {column} = {column} + $2 WHERE id = $1 RETURNING {column}"
        ))
        .bind(id)
        .bind(by)
        .fetch_optional(&self.pool)
        .await?;
        value.ok_or(RepositoryError::NotFound(id))
    }
}
