use crate::constants::{DEFAULT_FILE_BASE_NAME, MAX_FILE_BASE_NAME_CHARS};
use crate::error::Result;
use crate::reference::{ImageReference, ImageResolver};
use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use log::{info, warn};
use std::path::PathBuf;

/// Writes resolved images under a fixed output directory.
#[derive(Debug, Clone)]
pub struct ImagePersister {
    output_dir: PathBuf,
    resolver: ImageResolver,
}

impl ImagePersister {
    pub fn new(output_dir: impl Into<PathBuf>, resolver: ImageResolver) -> Self {
        Self {
            output_dir: output_dir.into(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &ImageResolver {
        &self.resolver
    }

    /// Resolves and writes every reference, returning one slot per input in
    /// input order. A failed slot is `None`; it never aborts its siblings.
    /// Only failing to create the output directory is an error.
    pub async fn persist(
        &self,
        refs: &[ImageReference],
        base_name: &str,
    ) -> Result<Vec<Option<PathBuf>>> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let stem = sanitize_file_name(base_name);
        let timestamp = file_timestamp();
        let writes = refs.iter().enumerate().map(|(index, reference)| {
            let stem = stem.as_str();
            let timestamp = timestamp.as_str();
            async move {
                match self.persist_one(reference, stem, timestamp, index).await {
                    Ok(path) => {
                        info!("saved image {} to {}", index + 1, path.display());
                        Some(path)
                    }
                    Err(err) => {
                        warn!(
                            "failed to save image {} ({}): {}",
                            index + 1,
                            reference.describe(),
                            err
                        );
                        None
                    }
                }
            }
        });

        Ok(join_all(writes).await)
    }

    async fn persist_one(
        &self,
        reference: &ImageReference,
        stem: &str,
        timestamp: &str,
        index: usize,
    ) -> Result<PathBuf> {
        let image = self.resolver.resolve(reference).await?;
        let file_name = format!("{}_{}_{}.{}", stem, timestamp, index + 1, image.extension);
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &image.bytes).await?;
        Ok(path)
    }
}

/// Keeps `[A-Za-z0-9_-]`, replaces everything else with `_`, and caps the
/// result at 64 characters.
pub fn sanitize_file_name(base_name: &str) -> String {
    let sanitized: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_BASE_NAME_CHARS)
        .collect();

    if sanitized.is_empty() {
        DEFAULT_FILE_BASE_NAME.to_string()
    } else {
        sanitized
    }
}

/// RFC 3339 instant with microseconds, with `:` and `.` made filesystem-safe.
pub fn file_timestamp() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Micros, true)
        .replace(|c: char| c == ':' || c == '.', "-")
}
