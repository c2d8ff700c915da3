use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::ServerError;
use crate::AppState;

/// Flat content-addressed store: uploaded bytes live at
/// `uploads_dir/<key>` with no extension, keyed by a freshly minted opaque
/// id. The store never renames, inspects, or transcodes the payload.
#[derive(Debug, Clone)]
pub struct MediaStore {
    uploads_dir: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    pub async fn new(uploads_dir: PathBuf, max_bytes: u64) -> Result<Self, ServerError> {
        fs::create_dir_all(&uploads_dir).await.map_err(|e| {
            ServerError::Storage(format!(
                "Failed to create uploads directory '{}': {}",
                uploads_dir.display(),
                e
            ))
        })?;

        tracing::info!(path = %uploads_dir.display(), "Media store initialized");

        Ok(Self {
            uploads_dir,
            max_bytes,
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServerError> {
        // Keys are server-minted uuids; anything else gets no chance to
        // escape the uploads directory.
        let valid = !key.is_empty()
            && !key.contains("..")
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_');
        if !valid {
            return Err(ServerError::BadRequest(format!("Invalid media key: {}", key)));
        }
        Ok(self.uploads_dir.join(key))
    }

    /// Stream a multipart field to disk under `key`, enforcing the upload
    /// cap without buffering the payload. A partial file left behind by an
    /// oversize or failed upload is removed.
    pub async fn write_field(
        &self,
        key: &str,
        field: &mut axum::extract::multipart::Field<'_>,
    ) -> Result<u64, ServerError> {
        let path = self.path_for(key)?;
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to create {}: {}", key, e)))?;

        let mut written: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&path).await;
                    return Err(ServerError::BadRequest(format!("Upload aborted: {}", e)));
                }
            };

            written += chunk.len() as u64;
            if written > self.max_bytes {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(ServerError::TooLarge {
                    size: written,
                    max: self.max_bytes,
                });
            }

            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(ServerError::Storage(format!("Failed to write {}: {}", key, e)));
            }
        }

        file.flush()
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to flush {}: {}", key, e)))?;

        tracing::info!(key = %key, size = written, "Stored upload");
        Ok(written)
    }

    pub async fn size_of(&self, key: &str) -> Result<u64, ServerError> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            _ => Err(ServerError::NotFound(format!("No media under key {}", key))),
        }
    }

    pub async fn open_at(&self, key: &str, offset: u64) -> Result<fs::File, ServerError> {
        let path = self.path_for(key)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|_| ServerError::NotFound(format!("No media under key {}", key)))?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| ServerError::Storage(format!("Failed to seek {}: {}", key, e)))?;
        }
        Ok(file)
    }

    pub async fn list(&self) -> Result<Vec<StoredMedia>, ServerError> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(&self.uploads_dir)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to list store: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to read store entry: {}", e)))?
        {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            out.push(StoredMedia {
                key,
                size: meta.len(),
                modified_at: modified_millis(&meta),
            });
        }

        Ok(out)
    }

    /// Delete stored files older than `max_age_days` (0 removes
    /// everything). Returns how many were removed.
    pub async fn purge(&self, max_age_days: u64) -> Result<usize, ServerError> {
        let cutoff = crate::room::now_millis().saturating_sub(max_age_days * 24 * 60 * 60 * 1000);
        let mut removed = 0;
        for item in self.list().await? {
            if item.modified_at <= cutoff {
                let path = self.path_for(&item.key)?;
                if fs::remove_file(&path).await.is_ok() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, max_age_days, "Purged stored media");
        }
        Ok(removed)
    }
}

fn modified_millis(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub key: String,
    pub size: u64,
    pub modified_at: u64,
}

#[derive(Serialize)]
pub(crate) struct UploadResponse {
    success: bool,
    video: UploadedVideo,
}

#[derive(Serialize)]
struct UploadedVideo {
    id: String,
    name: String,
    size: u64,
    #[serde(rename = "type")]
    mime_type: String,
    filename: String,
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !mime_type.starts_with("video/") {
            return Err(ServerError::BadRequest(format!(
                "Expected a video/* upload, got '{}'",
                mime_type
            )));
        }

        let name = field.file_name().unwrap_or("video").to_string();
        let key = Uuid::new_v4().to_string();
        let size = state.media.write_field(&key, &mut field).await?;

        return Ok(Json(UploadResponse {
            success: true,
            video: UploadedVideo {
                id: key.clone(),
                name,
                size,
                mime_type,
                filename: key,
            },
        }));
    }

    Err(ServerError::BadRequest(
        "Missing 'video' field in multipart form".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Authoritative mime override; stored keys carry no extension, so the
    /// table lookup below is best-effort only.
    #[serde(rename = "type")]
    mime: Option<String>,
}

pub async fn stream(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let size = state.media.size_of(&key).await?;
    let mime = query.mime.unwrap_or_else(|| mime_for_key(&key).to_string());

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|h| parse_range(h, size))
        .unwrap_or(ParsedRange::None);

    match range {
        ParsedRange::Satisfiable(start, end) => {
            let len = end - start + 1;
            let file = state.media.open_at(&key, start).await?;
            let body = Body::from_stream(ReaderStream::new(file.take(len)));

            Ok(Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, mime)
                .header(header::CONTENT_LENGTH, len)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, size),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
                .map_err(|e| ServerError::Storage(e.to_string()))?)
        }
        ParsedRange::Unsatisfiable => Err(ServerError::RangeNotSatisfiable { size }),
        ParsedRange::None => {
            let file = state.media.open_at(&key, 0).await?;
            let body = Body::from_stream(ReaderStream::new(file));

            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime)
                .header(header::CONTENT_LENGTH, size)
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
                .map_err(|e| ServerError::Storage(e.to_string()))?)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedRange {
    /// No usable range; serve the whole file.
    None,
    Satisfiable(u64, u64),
    Unsatisfiable,
}

/// Parse a single `bytes=a-b` range against a representation of `size`
/// bytes. `b` defaults to `size-1`; a suffix form `bytes=-n` takes the
/// final `n` bytes. Syntactically hopeless headers are ignored rather than
/// rejected; a well-formed but impossible range is unsatisfiable.
fn parse_range(header: &str, size: u64) -> ParsedRange {
    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return ParsedRange::None;
    };
    if spec.contains(',') {
        // Multipart ranges are out of contract.
        return ParsedRange::None;
    }
    let Some((start_str, end_str)) = spec.split_once('-') else {
        return ParsedRange::None;
    };

    let (start, end) = if start_str.is_empty() {
        // Suffix range: the last `n` bytes.
        let Ok(n) = end_str.trim().parse::<u64>() else {
            return ParsedRange::None;
        };
        if n == 0 || size == 0 {
            return ParsedRange::Unsatisfiable;
        }
        (size.saturating_sub(n), size - 1)
    } else {
        let Ok(start) = start_str.trim().parse::<u64>() else {
            return ParsedRange::None;
        };
        let end = if end_str.trim().is_empty() {
            size.saturating_sub(1)
        } else {
            let Ok(end) = end_str.trim().parse::<u64>() else {
                return ParsedRange::None;
            };
            end
        };
        (start, end)
    };

    if start >= size || start > end {
        return ParsedRange::Unsatisfiable;
    }
    ParsedRange::Satisfiable(start, end.min(size - 1))
}

fn mime_for_key(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "video/mp4",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StorageListing {
    files: Vec<StoredMedia>,
    total_bytes: u64,
}

pub async fn admin_storage(
    State(state): State<AppState>,
) -> Result<Json<StorageListing>, ServerError> {
    let files = state.media.list().await?;
    let total_bytes = files.iter().map(|f| f.size).sum();
    Ok(Json(StorageListing { files, total_bytes }))
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    days: u64,
}

#[derive(Serialize)]
pub(crate) struct CleanupResponse {
    removed: usize,
}

pub async fn admin_cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, ServerError> {
    let removed = state.media.purge(query.days).await?;
    Ok(Json(CleanupResponse { removed }))
}

pub async fn admin_cleanup_all(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ServerError> {
    let removed = state.media.purge(0).await?;
    Ok(Json(CleanupResponse { removed }))
}
