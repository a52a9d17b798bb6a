//! Chunked, content-range addressed file upload.
//!
//! A file is sent as a series of `PUT` requests, one per block, each carrying
//! a `Content-Range` header and a multipart body. The server answers every
//! block with the URL the next block must go to. Once every block has been
//! acknowledged, the MD5 of the whole file is `POST`ed to the last URL.

use std::fmt;
use std::path::Path;

use md5::{Digest, Md5};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::client::{Client, RequestBody};
use crate::endpoint::resolve;
use crate::envelope::unwrap_envelope;
use crate::error::{Error, Method, RequestFailure};

/// Block size used when the caller does not pick one.
pub const DEFAULT_BLOCK_SIZE: usize = 1_000_000;

/// Value of one `Content-Range` header.
///
/// `end` is exclusive: a block of `n` bytes at offset `o` is `o-(o+n)/total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

fn effective_block_size(block_size: Option<usize>) -> usize {
    match block_size {
        Some(n) if n > 0 => n,
        _ => DEFAULT_BLOCK_SIZE,
    }
}

// ---------------------------------------------------------------------------
// BlockReader
// ---------------------------------------------------------------------------

/// One block read from the source file.
#[derive(Debug)]
pub struct Block {
    pub range: ContentRange,
    pub data: Vec<u8>,
}

/// Reads a file in full, fixed-size blocks while hashing it.
pub struct BlockReader {
    file: tokio::fs::File,
    block_size: usize,
    offset: u64,
    file_size: u64,
    hasher: Md5,
}

impl BlockReader {
    /// Opens `path`. A missing file is [`Error::FileNotFound`].
    pub async fn open(path: &Path, block_size: Option<usize>) -> Result<Self, Error> {
        let file = match tokio::fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let file_size = file.metadata().await?.len();
        Ok(Self {
            file,
            block_size: effective_block_size(block_size),
            offset: 0,
            file_size,
            hasher: Md5::new(),
        })
    }

    /// Reads the next block. Only the last block may be short. `None` at EOF.
    pub async fn next_block(&mut self) -> Result<Option<Block>, Error> {
        let mut buf = vec![0u8; self.block_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.hasher.update(&buf);

        let start = self.offset;
        self.offset += filled as u64;
        Ok(Some(Block {
            range: ContentRange {
                start,
                end: self.offset,
                total: self.file_size.max(self.offset),
            },
            data: buf,
        }))
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Hex MD5 of everything read so far.
    pub fn md5_hex(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

impl Client {
    /// Uploads `path` in blocks to `endpoint` and returns the finalize `data`.
    pub async fn upload(
        &self,
        endpoint: &str,
        path: &Path,
        block_size: Option<usize>,
    ) -> Result<Value, Error> {
        let mut reader = BlockReader::open(path, block_size).await?;
        let file_name = base_name(path);
        let mut url = resolve(self.base_url(), endpoint);

        info!(
            file = %path.display(),
            size = reader.file_size(),
            block_size = reader.block_size,
            "upload started"
        );

        while let Some(block) = reader.next_block().await? {
            debug!(range = %block.range, "upload block");
            self.log_request(Method::Put, &url);
            let form = Form::new().text("filename", file_name.clone()).part(
                "file",
                Part::bytes(block.data).file_name(file_name.clone()),
            );
            let req = self
                .request(Method::Put, &url)
                .header(reqwest::header::CONTENT_RANGE, block.range.to_string())
                .multipart(form);
            let (status, body) = self.send_raw(req).await?;
            self.log_response(Method::Put, &url, status, body.len());

            let data = upload_data(Method::Put, &url, status, &body)?;
            let Some(next) = data.get("url").and_then(Value::as_str) else {
                return Err(upload_error(Method::Put, &url, status, &body));
            };
            url = resolve(self.base_url(), next);
        }

        let md5 = reader.md5_hex();
        self.log_request(Method::Post, &url);
        let req = RequestBody::Form(serde_json::Map::from_iter([(
            "md5".to_string(),
            Value::String(md5.clone()),
        )]))
        .apply(self.request(Method::Post, &url));
        let (status, body) = self.send_raw(req).await?;
        self.log_response(Method::Post, &url, status, body.len());
        let data = upload_data(Method::Post, &url, status, &body)?;

        info!(file = %path.display(), %md5, "upload finished");
        Ok(data)
    }
}

fn upload_data(method: Method, url: &str, status: u16, body: &str) -> Result<Value, Error> {
    if !(200..300).contains(&status) {
        return Err(upload_error(method, url, status, body));
    }
    unwrap_envelope(body).ok_or_else(|| upload_error(method, url, status, body))
}

fn upload_error(method: Method, url: &str, status: u16, body: &str) -> Error {
    Error::Upload(Box::new(RequestFailure {
        method,
        url: url.to_string(),
        status,
        body: body.to_string(),
    }))
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
