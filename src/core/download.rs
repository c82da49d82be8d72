//! Streamed Download
//!
//! Writes a response body to a partial file, then renames it into place.

use futures::StreamExt;
use percent_encoding::percent_decode_str;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::{ByteStream, HttpResponse};
use crate::error::{DownloadError, RestError, RestResult};

/// Download progress observer.
pub trait DownloadProgress: Send + Sync {
    /// Transfer started. `expected` comes from `Content-Length`.
    fn started(&self, target: &Path, expected: Option<u64>);

    /// `received` bytes written so far.
    fn progressed(&self, target: &Path, received: u64);

    /// Transfer ended, successfully or not.
    fn finished(&self, target: &Path, success: bool);
}

/// Extract the file name advertised by a `Content-Disposition` header.
///
/// `filename*` (RFC 5987) wins over `filename`. Only the final path component
/// is kept.
pub fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in header.split(';').map(str::trim) {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let value = value.trim().trim_matches('"');
                // charset'language'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                extended = Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
            }
            "filename" => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    let name = extended.or(plain)?;
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().to_string();
    match base.as_str() {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}

/// Final file path: the caller's target, renamed after `Content-Disposition`.
pub fn resolve_target(target: &Path, response: &HttpResponse) -> PathBuf {
    match response
        .header("content-disposition")
        .and_then(disposition_filename)
    {
        Some(name) => target.with_file_name(name),
        None => target.to_path_buf(),
    }
}

/// `<target><suffix>`.
pub fn partial_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Stream `body` into `target` through a partial file.
pub async fn stream_to_file(
    mut body: ByteStream,
    target: &Path,
    partial_suffix: &str,
    expected: Option<u64>,
    progress: Option<&dyn DownloadProgress>,
) -> RestResult<PathBuf> {
    let partial = partial_path(target, partial_suffix);
    if let Some(p) = progress {
        p.started(target, expected);
    }

    let result = write_partial(&mut body, target, &partial, progress).await;
    match result {
        Ok(received) => {
            tokio::fs::rename(&partial, target)
                .await
                .map_err(|e| io_error(target, e))?;
            debug!(path = %target.display(), bytes = received, "Download complete");
            if let Some(p) = progress {
                p.finished(target, true);
            }
            Ok(target.to_path_buf())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            if let Some(p) = progress {
                p.finished(target, false);
            }
            Err(e)
        }
    }
}

async fn write_partial(
    body: &mut ByteStream,
    target: &Path,
    partial: &Path,
    progress: Option<&dyn DownloadProgress>,
) -> RestResult<u64> {
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| io_error(partial, e))?;
    let mut received = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            RestError::Download(DownloadError::Interrupted {
                message: e.to_string(),
            })
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| io_error(partial, e))?;
        received += chunk.len() as u64;
        if let Some(p) = progress {
            p.progressed(target, received);
        }
    }

    file.flush().await.map_err(|e| io_error(partial, e))?;
    Ok(received)
}

fn io_error(path: &Path, source: std::io::Error) -> RestError {
    RestError::Download(DownloadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
