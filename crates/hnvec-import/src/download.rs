//! Dataset acquisition
//!
//! Guarantees a non-empty local copy of the dataset. An existing non-empty
//! file is reused as-is; otherwise the body is streamed to `<path>.part` and
//! renamed into place once complete. An empty body is an error.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};

/// HTTP fetcher for dataset files
#[derive(Debug, Clone)]
pub struct DatasetFetcher {
    client: reqwest::Client,
}

impl DatasetFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hnvec-import/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Make sure `path` holds a non-empty copy of `url` and return it.
    pub async fn ensure_local(
        &self,
        url: &str,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        if url.trim().is_empty() {
            return Err(ImportError::Config("dataset url is empty".to_string()));
        }
        if path.as_os_str().is_empty() {
            return Err(ImportError::Config("dataset local path is empty".to_string()));
        }

        if let Ok(metadata) = fs::metadata(path).await {
            if metadata.is_file() && metadata.len() > 0 {
                debug!(path = %path.display(), bytes = metadata.len(), "Dataset already present");
                return Ok(path.to_path_buf());
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ImportError::io(format!("create directory {}", parent.display()), e))?;
        }

        info!(url, path = %path.display(), "Downloading dataset");

        let partial = partial_path(path);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ImportError::Cancelled),
            result = self.fetch_to(url, &partial) => result,
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&partial).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %remove_err, "Failed to remove partial download");
                    }
                }
                return Err(e);
            },
        };

        fs::rename(&partial, path)
            .await
            .map_err(|e| ImportError::io(format!("move download into {}", path.display()), e))?;

        info!(url, path = %path.display(), bytes, "Dataset downloaded");
        Ok(path.to_path_buf())
    }

    async fn fetch_to(&self, url: &str, target: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = fs::File::create(target)
            .await
            .map_err(|e| ImportError::io(format!("create {}", target.display()), e))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ImportError::io(format!("write {}", target.display()), e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| ImportError::io(format!("flush {}", target.display()), e))?;

        if written == 0 {
            return Err(ImportError::EmptyDownload {
                url: url.to_string(),
            });
        }
        Ok(written)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> DatasetFetcher {
        DatasetFetcher::with_client(reqwest::Client::new())
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/tmp/hn.parquet")),
            PathBuf::from("/tmp/hn.parquet.part")
        );
    }

    #[tokio::test]
    async fn test_downloads_into_missing_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/hn.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"doc_id\n1\n".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/data/hn.csv");
        let url = format!("{}/hn.csv", server.uri());

        let path = fetcher()
            .ensure_local(&url, &target, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(path, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"doc_id\n1\n");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn test_existing_file_skips_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hn.parquet");
        std::fs::write(&target, b"cached").unwrap();

        fetcher()
            .ensure_local(&server.uri(), &target, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_empty_file_is_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hn.parquet");
        std::fs::write(&target, b"").unwrap();

        fetcher()
            .ensure_local(&server.uri(), &target, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hn.parquet");

        let err = fetcher()
            .ensure_local(&server.uri(), &target, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::UnexpectedStatus { status: 404, .. }));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_and_cleaned_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hn.parquet");

        let err = fetcher()
            .ensure_local(&server.uri(), &target, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::EmptyDownload { .. }));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn test_empty_url_or_path_is_config_error() {
        let cancel = CancellationToken::new();
        let err = fetcher()
            .ensure_local("", Path::new("/tmp/x.csv"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));

        let err = fetcher()
            .ensure_local("http://localhost/x.csv", Path::new(""), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_download_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(std::time::Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hn.parquet");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher()
            .ensure_local(&server.uri(), &target, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }
}
