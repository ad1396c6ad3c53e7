//! Writes relayed bodies to the storage directory.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::capture::classify::is_well_formed_markup;
use crate::capture::filename::{build_identifier, Charset};
use crate::capture::pretty::prettify;
use crate::capture::redact::redact_updates;
use crate::capture::{Direction, RequestDescriptor};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::telemetry::{extract, ExtractionError, MetricsSnapshot, Publisher};

const FORM_PREFIX: &[u8] = b"data=";
const XML_EXTENSION: &str = ".xml";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination of every captured body.
///
/// Shared by all requests; holds no per-request state.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    data_dir: PathBuf,
    charset: Charset,
    block_updates: bool,
    telemetry_suffix: String,
    snapshot: Arc<MetricsSnapshot>,
    publisher: Publisher,
}

impl CaptureSink {
    pub fn new(config: &ProxyConfig, snapshot: Arc<MetricsSnapshot>, publisher: Publisher) -> Self {
        Self {
            data_dir: PathBuf::from(&config.storage.data_dir),
            charset: config.storage.filename_charset,
            block_updates: config.capture.block_updates,
            telemetry_suffix: config.capture.telemetry_path_suffix.clone(),
            snapshot,
            publisher,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Record one body. Never fails; problems are logged and counted.
    pub async fn capture(&self, request: &RequestDescriptor, body: &[u8], direction: Direction) {
        if body.is_empty() {
            return;
        }

        let body = decode_form(body);

        if direction == Direction::Request && request.path.ends_with(&self.telemetry_suffix) {
            self.extract_telemetry(request, &body).await;
        }

        let markup = is_well_formed_markup(&body);
        let extension = if markup { XML_EXTENSION } else { "" };
        metrics::record_capture(direction.as_str(), markup);

        let body = if self.block_updates {
            redact_updates(&body)
        } else {
            Cow::Borrowed(body.as_ref())
        };
        let content = prettify(&body);

        let name = build_identifier(request, direction.suffix(), extension, self.charset);
        match self.write_artifact(&name, &content).await {
            Ok(path) => {
                tracing::debug!(
                    path = %path.display(),
                    direction = direction.as_str(),
                    bytes = content.len(),
                    "Captured body"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to store captured body");
                metrics::record_write_failure();
            }
        }
    }

    async fn extract_telemetry(&self, request: &RequestDescriptor, body: &[u8]) {
        let rendered = extract(body).and_then(|doc| {
            let text = doc.to_exposition()?;
            Ok((doc, text))
        });

        match rendered {
            Ok((doc, text)) => {
                metrics::record_extraction("ok");
                if let Err(e) = self.snapshot.store(text).await {
                    tracing::error!(
                        path = %self.snapshot.path().display(),
                        error = %e,
                        "Failed to persist metrics snapshot"
                    );
                    metrics::record_write_failure();
                }
                self.publisher.publish(doc);
                tracing::info!(path = %request.path, "Telemetry updated");
            }
            Err(ExtractionError::NotRecognized) => {
                metrics::record_extraction(ExtractionError::NotRecognized.kind());
                tracing::debug!(path = %request.path, "Body is not a status document");
            }
            Err(e) => {
                metrics::record_extraction(e.kind());
                tracing::warn!(path = %request.path, error = %e, "Failed to extract telemetry");
            }
        }
    }

    async fn write_artifact(&self, name: &str, content: &[u8]) -> Result<PathBuf, CaptureError> {
        let path = self.data_dir.join(name);
        let io_err = |source| CaptureError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.data_dir).await.map_err(io_err)?;
        tokio::fs::write(&path, content).await.map_err(io_err)?;
        Ok(path)
    }
}

/// Unwrap a `data=` form body.
///
/// The remainder is percent-decoded with `+` read as a space. A malformed
/// escape leaves the whole body untouched.
pub fn decode_form(body: &[u8]) -> Cow<'_, [u8]> {
    let Some(encoded) = body.strip_prefix(FORM_PREFIX) else {
        return Cow::Borrowed(body);
    };
    if !has_valid_escapes(encoded) {
        tracing::debug!("Form body has a malformed escape, keeping it encoded");
        return Cow::Borrowed(body);
    }

    let spaced: Vec<u8> = encoded
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    Cow::Owned(urlencoding::decode_binary(&spaced).into_owned())
}

fn has_valid_escapes(encoded: &[u8]) -> bool {
    let mut i = 0;
    while i < encoded.len() {
        if encoded[i] == b'%' {
            let valid = encoded
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
