//! Streamed download of a response body to a local file.

use std::collections::HashMap;
use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::client::Client;
use crate::endpoint::resolve;
use crate::error::{Error, Method, RequestFailure};

/// Write buffer used while streaming to disk.
pub const DOWNLOAD_BLOCK_SIZE: usize = 1024;

impl Client {
    /// Streams `endpoint` into `path` and returns the response headers.
    ///
    /// The destination is only created once the server answered 2xx, and is
    /// removed again if the transfer breaks part way.
    pub async fn download(
        &self,
        endpoint: &str,
        path: &Path,
    ) -> Result<HashMap<String, String>, Error> {
        let url = resolve(self.base_url(), endpoint);
        self.log_request(Method::Download, &url);

        let resp = self.request(Method::Download, &url).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.log_response(Method::Download, &url, status, body.len());
            return Err(Error::DownloadFailed(Box::new(RequestFailure {
                method: Method::Download,
                url,
                status,
                body,
            })));
        }

        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        match stream_to_file(resp, path).await {
            Ok(written) => {
                self.log_response(Method::Download, &url, status, written);
                info!(file = %path.display(), bytes = written, "download finished");
                Ok(headers)
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "download aborted, removing partial file");
                let _ = tokio::fs::remove_file(path).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file(mut resp: reqwest::Response, path: &Path) -> Result<usize, Error> {
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    let mut out = BufWriter::with_capacity(DOWNLOAD_BLOCK_SIZE, file);
    let mut written = 0;
    while let Some(chunk) = resp.chunk().await? {
        out.write_all(&chunk).await?;
        written += chunk.len();
    }
    out.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockResponse, MockServer};

    #[tokio::test]
    async fn writes_body_and_returns_headers() {
        let server = MockServer::start(vec![
            MockResponse::raw(200, "id,phone\n1,5551234\n")
                .with_header("Content-Disposition", "attachment; filename=dnc.csv"),
        ])
        .await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dnc.csv");

        let headers = client.download("/sample/dnc/x/list/", &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "id,phone\n1,5551234\n");
        assert_eq!(
            headers.get("content-disposition").map(String::as_str),
            Some("attachment; filename=dnc.csv")
        );

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "GET");
        assert_eq!(reqs[0].header("authorization"), Some("ApiKey k"));
    }

    #[tokio::test]
    async fn failed_status_leaves_no_file() {
        let server = MockServer::start(vec![MockResponse::raw(403, "forbidden")]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");

        let err = client.download("/files/1/", &dest).await.unwrap_err();
        let Error::DownloadFailed(failure) = &err else {
            panic!("expected download error, got {err:?}");
        };
        assert_eq!(failure.method, Method::Download);
        assert_eq!(failure.status, 403);
        assert_eq!(failure.body, "forbidden");
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(
            err.to_string(),
            format!("Unable to download file: Error[403] - DOWNLOAD {} - forbidden", server.api_url("/files/1/"))
        );
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn failed_status_keeps_existing_file_untouched() {
        let server = MockServer::start(vec![MockResponse::raw(500, "")]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        std::fs::write(&dest, "previous").unwrap();

        assert!(client.download("/files/1/", &dest).await.is_err());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "previous");
    }

    #[tokio::test]
    async fn larger_than_buffer_body_is_complete() {
        let body = "x".repeat(DOWNLOAD_BLOCK_SIZE * 5 + 17);
        let server = MockServer::start(vec![MockResponse::raw(200, body.clone())]).await;
        let client = Client::with_api_key(server.url(), "k").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("big.txt");

        client.download("/files/big/", &dest).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), body);
    }
}
