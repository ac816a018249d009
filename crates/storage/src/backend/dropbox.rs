//! Dropbox storage client.
//!
//! Talks to the Dropbox HTTP API v2 directly with [`reqwest`]. RPC endpoints
//! take JSON bodies; content endpoints (thumbnail download, upload) carry
//! their arguments in the `Dropbox-API-Arg` header and the payload in the
//! body.
//!
//! # Credentials
//!
//! A long-lived or short-lived access token is provided explicitly. Without
//! one, every call fails with [`ErrorKind::Auth`] before any request is sent.

use crate::error::{ErrorKind, Result};
use crate::models::{Cursor, Entry, EntryKind, ListingPage, MoveOptions, Thumbnail, ThumbnailRequest, UploadOptions};
use crate::{StorageClient, validate_path};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::{RequestBuilder, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com/2";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2";
const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const API_RESULT_HEADER: &str = "Dropbox-API-Result";
const USER_AGENT: &str = concat!("lowres/", env!("CARGO_PKG_VERSION"));

/// Dropbox storage client.
///
/// # Examples
///
/// ```no_run
/// use lowres_storage::backend::DropboxClient;
/// use lowres_storage::StorageClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DropboxClient::new("dropbox", Some("sl.token".to_string()))?;
/// let page = client.list("/photos", 20).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DropboxClient {
    name: String,
    http: reqwest::Client,
    token: Option<String>,
    api_url: String,
    content_url: String,
}

impl DropboxClient {
    /// Create a client against the public Dropbox endpoints.
    pub fn new(name: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .or_raise(|| ErrorKind::BackendError("failed to build HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            http,
            token: token.filter(|t| !t.trim().is_empty()),
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
        })
    }

    /// Point the client at different RPC and content hosts (proxies, test
    /// servers).
    pub fn with_endpoints(mut self, api_url: impl Into<String>, content_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.content_url = content_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorized(&self, url: String) -> Result<RequestBuilder> {
        let Some(token) = &self.token else {
            exn::bail!(ErrorKind::Auth("no access token configured".to_string()));
        };
        Ok(self.http.post(url).bearer_auth(token))
    }

    /// Call an RPC-style endpoint: JSON in, JSON out.
    async fn rpc<A: Serialize, R: DeserializeOwned>(&self, endpoint: &str, arg: &A, subject: &str) -> Result<R> {
        let body = serde_json::to_vec(arg).or_raise(|| ErrorKind::BackendError(format!("encoding {endpoint}")))?;
        let request = self
            .authorized(format!("{}/{endpoint}", self.api_url))?
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        let text = Self::send(request, subject).await?.text().await.map_err(Self::transport)?;
        serde_json::from_str(&text).or_raise(|| ErrorKind::Malformed(format!("{endpoint} response")))
    }

    /// Call a content-style endpoint, with arguments in the header.
    async fn content<A: Serialize>(
        &self,
        endpoint: &str,
        arg: &A,
        payload: Option<Vec<u8>>,
        subject: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self
            .authorized(format!("{}/{endpoint}", self.content_url))?
            .header(API_ARG_HEADER, api_arg(arg)?);
        if let Some(payload) = payload {
            request = request.header(header::CONTENT_TYPE, "application/octet-stream").body(payload);
        }
        Self::send(request, subject).await
    }

    async fn send(request: RequestBuilder, subject: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(Self::transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        exn::bail!(error_kind(status, &body, subject))
    }

    fn transport(err: reqwest::Error) -> exn::Exn<ErrorKind> {
        exn::Exn::from(ErrorKind::Network(err.to_string()))
    }
}

#[async_trait]
impl StorageClient for DropboxClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, folder: &str, limit: u32) -> Result<ListingPage> {
        let folder = validate_path(folder)?;
        tracing::debug!(client = %self.name, folder = %folder, limit, "Listing folder");
        let arg = ListFolderArg { path: &folder, limit, recursive: false };
        let result: ListFolderResult = self.rpc("files/list_folder", &arg, &folder).await?;
        result.try_into()
    }

    async fn list_continue(&self, cursor: &Cursor) -> Result<ListingPage> {
        tracing::debug!(client = %self.name, "Continuing folder listing");
        let arg = ListFolderContinueArg { cursor: cursor.as_str() };
        let result: ListFolderResult = self.rpc("files/list_folder/continue", &arg, cursor.as_str()).await?;
        result.try_into()
    }

    async fn download_thumbnail(&self, path: &str, request: &ThumbnailRequest) -> Result<Thumbnail> {
        let path = validate_path(path)?;
        tracing::debug!(client = %self.name, path = %path, size = %request.size, "Downloading thumbnail");
        let arg = ThumbnailArg {
            resource: PathResource { tag: "path", path: &path },
            format: request.format.as_str(),
            size: request.size.as_str(),
            mode: request.mode.as_str(),
        };
        let response = self.content("files/get_thumbnail_v2", &arg, None, &path).await?;
        // Metadata rides along in a header and is optional.
        let metadata = response
            .headers()
            .get(API_RESULT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| serde_json::from_str::<ThumbnailResult>(value).ok())
            .and_then(|result| result.file_metadata)
            .and_then(|file| file.into_entry(EntryKind::File).ok());
        let data = response.bytes().await.map_err(Self::transport)?.to_vec();
        Ok(Thumbnail { data, metadata })
    }

    async fn upload(&self, path: &str, data: &[u8], options: UploadOptions) -> Result<Entry> {
        let path = validate_path(path)?;
        tracing::debug!(client = %self.name, path = %path, bytes = data.len(), "Uploading file");
        let arg = UploadArg {
            path: &path,
            mode: "add",
            autorename: options.autorename,
            mute: options.mute,
        };
        let response = self.content("files/upload", &arg, Some(data.to_vec()), &path).await?;
        let text = response.text().await.map_err(Self::transport)?;
        let file: WireFile =
            serde_json::from_str(&text).or_raise(|| ErrorKind::Malformed("files/upload response".to_string()))?;
        file.into_entry(EntryKind::File)
    }

    async fn move_entry(&self, from: &str, to: &str, options: MoveOptions) -> Result<Entry> {
        let from = validate_path(from)?;
        let to = validate_path(to)?;
        tracing::debug!(client = %self.name, from = %from, to = %to, "Moving file");
        let arg = MoveArg {
            from_path: &from,
            to_path: &to,
            autorename: options.autorename,
        };
        let result: RelocationResult = self.rpc("files/move_v2", &arg, &from).await?;
        result.metadata.try_into()
    }
}

/// Map a non-success HTTP response onto an actionable error.
///
/// Endpoint-specific failures arrive as `409` with an `error_summary` such as
/// `path/not_found/..` or `path/conflict/file/..`.
fn error_kind(status: StatusCode, body: &str, subject: &str) -> ErrorKind {
    let summary = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error_summary)
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Auth(summary),
        StatusCode::CONFLICT if summary.contains("not_found") => ErrorKind::NotFound(subject.to_string()),
        StatusCode::CONFLICT if summary.contains("conflict") => ErrorKind::Conflict(subject.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Network(format!("rate limited: {summary}")),
        s if s.is_server_error() => ErrorKind::Network(format!("{s}: {summary}")),
        s => ErrorKind::BackendError(format!("{s}: {summary}")),
    }
}

/// Serialize a `Dropbox-API-Arg` header value.
///
/// Header values must be ASCII, so anything outside of it (and DEL) is
/// written as a JSON `\uXXXX` escape, surrogate pairs included.
fn api_arg<A: Serialize>(arg: &A) -> Result<String> {
    let json = serde_json::to_string(arg).or_raise(|| ErrorKind::BackendError("encoding API argument".to_string()))?;
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && c != '\x7f' {
            escaped.push(c);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            // Infallible: writing to a String.
            let _ = write!(escaped, "\\u{unit:04x}");
        }
    }
    Ok(escaped)
}

#[derive(Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    limit: u32,
    recursive: bool,
}

#[derive(Serialize)]
struct ListFolderContinueArg<'a> {
    cursor: &'a str,
}

#[derive(Serialize)]
struct PathResource<'a> {
    #[serde(rename = ".tag")]
    tag: &'static str,
    path: &'a str,
}

#[derive(Serialize)]
struct ThumbnailArg<'a> {
    resource: PathResource<'a>,
    format: &'static str,
    size: &'static str,
    mode: &'static str,
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

#[derive(Serialize)]
struct MoveArg<'a> {
    from_path: &'a str,
    to_path: &'a str,
    autorename: bool,
}

#[derive(Deserialize)]
struct ApiError {
    error_summary: String,
}

#[derive(Deserialize)]
struct ListFolderResult {
    entries: Vec<WireMetadata>,
    cursor: Option<String>,
    has_more: bool,
}
impl TryFrom<ListFolderResult> for ListingPage {
    type Error = exn::Exn<ErrorKind>;
    fn try_from(result: ListFolderResult) -> Result<Self> {
        Ok(ListingPage {
            entries: result.entries.into_iter().map(Entry::try_from).collect::<Result<_>>()?,
            cursor: result.cursor.filter(|c| !c.is_empty()).map(Cursor::new),
            has_more: result.has_more,
        })
    }
}

#[derive(Deserialize)]
struct ThumbnailResult {
    file_metadata: Option<WireFile>,
}

#[derive(Deserialize)]
struct RelocationResult {
    metadata: WireMetadata,
}

#[derive(Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum WireMetadata {
    File(WireFile),
    Folder(WireFile),
    Deleted(WireFile),
}
impl TryFrom<WireMetadata> for Entry {
    type Error = exn::Exn<ErrorKind>;
    fn try_from(metadata: WireMetadata) -> Result<Self> {
        match metadata {
            WireMetadata::File(f) => f.into_entry(EntryKind::File),
            WireMetadata::Folder(f) => f.into_entry(EntryKind::Folder),
            WireMetadata::Deleted(f) => f.into_entry(EntryKind::Deleted),
        }
    }
}

/// Fields shared by every metadata variant; the ones a folder lacks are
/// simply absent.
#[derive(Deserialize)]
struct WireFile {
    path_lower: Option<String>,
    path_display: Option<String>,
    size: Option<u64>,
    server_modified: Option<String>,
    content_hash: Option<String>,
}
impl WireFile {
    fn into_entry(self, kind: EntryKind) -> Result<Entry> {
        let path = self
            .path_lower
            .or_else(|| self.path_display.as_ref().map(|p| p.to_lowercase()))
            .ok_or_raise(|| ErrorKind::Malformed("entry without a path".to_string()))?;
        Ok(Entry {
            path,
            display_path: self.path_display,
            kind,
            size: self.size.filter(|_| kind == EntryKind::File),
            modified: self.server_modified.and_then(|m| OffsetDateTime::parse(&m, &Rfc3339).ok()),
            content_hash: self.content_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_api_arg_escapes_non_ascii() {
        let arg = UploadArg {
            path: "/fotos/café/ü.jpg",
            mode: "add",
            autorename: true,
            mute: true,
        };
        let header = api_arg(&arg).unwrap();
        assert!(header.is_ascii());
        assert_eq!(header, r#"{"path":"/fotos/caf\u00e9/\u00fc.jpg","mode":"add","autorename":true,"mute":true}"#);
    }

    #[test]
    fn test_api_arg_escapes_surrogate_pairs() {
        let arg = ListFolderContinueArg { cursor: "📷" };
        assert_eq!(api_arg(&arg).unwrap(), r#"{"cursor":"\ud83d\udcf7"}"#);
    }

    #[test]
    fn test_thumbnail_arg_shape() {
        let request = ThumbnailRequest::default();
        let arg = ThumbnailArg {
            resource: PathResource { tag: "path", path: "/photos/a.jpg" },
            format: request.format.as_str(),
            size: request.size.as_str(),
            mode: request.mode.as_str(),
        };
        let value: serde_json::Value = serde_json::from_str(&api_arg(&arg).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "resource": {".tag": "path", "path": "/photos/a.jpg"},
                "format": "jpeg",
                "size": "w2048h1536",
                "mode": "fitone_bestfit",
            })
        );
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED, r#"{"error_summary": "invalid_access_token/.."}"#, "auth")]
    #[case(StatusCode::CONFLICT, r#"{"error_summary": "path/not_found/.."}"#, "not_found")]
    #[case(StatusCode::CONFLICT, r#"{"error_summary": "from_lookup/not_found/."}"#, "not_found")]
    #[case(StatusCode::CONFLICT, r#"{"error_summary": "path/conflict/file/.."}"#, "conflict")]
    #[case(StatusCode::CONFLICT, r#"{"error_summary": "path/insufficient_space/"}"#, "backend")]
    #[case(StatusCode::TOO_MANY_REQUESTS, r#"{"error_summary": "too_many_requests/"}"#, "network")]
    #[case(StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable", "network")]
    #[case(StatusCode::BAD_REQUEST, "Error in call to API function", "backend")]
    fn test_error_kind(#[case] status: StatusCode, #[case] body: &str, #[case] expected: &str) {
        let kind = error_kind(status, body, "/photos/a.jpg");
        let actual = match kind {
            ErrorKind::Auth(_) => "auth",
            ErrorKind::NotFound(ref p) if p == "/photos/a.jpg" => "not_found",
            ErrorKind::Conflict(ref p) if p == "/photos/a.jpg" => "conflict",
            ErrorKind::Network(_) => "network",
            ErrorKind::BackendError(_) => "backend",
            _ => "other",
        };
        assert_eq!(actual, expected, "{kind:?}");
    }

    #[test]
    fn test_list_folder_result_conversion() {
        let json = serde_json::json!({
            "entries": [
                {
                    ".tag": "file",
                    "name": "IMG_0001.JPG",
                    "path_lower": "/photos/img_0001.jpg",
                    "path_display": "/Photos/IMG_0001.JPG",
                    "id": "id:a4ayc_80_OEAAAAAAAAAXw",
                    "server_modified": "2015-05-12T15:50:38Z",
                    "size": 7212306,
                    "content_hash": "e3b0c442"
                },
                {".tag": "folder", "name": "highres", "path_lower": "/photos/highres", "path_display": "/Photos/highres"},
                {".tag": "deleted", "name": "old.png", "path_lower": "/photos/old.png"}
            ],
            "cursor": "ZtkX9_EHj3x7PMkVuFIhwKYXEpwpLwyxp9vMKomUhllil9q7eWiAu",
            "has_more": true
        });
        let result: ListFolderResult = serde_json::from_value(json).unwrap();
        let page = ListingPage::try_from(result).unwrap();
        assert!(page.has_more);
        assert!(page.cursor.is_some());
        assert_eq!(page.entries.len(), 3);

        let file = &page.entries[0];
        assert_eq!(file.path, "/photos/img_0001.jpg");
        assert_eq!(file.display_path.as_deref(), Some("/Photos/IMG_0001.JPG"));
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, Some(7_212_306));
        assert_eq!(file.modified.unwrap().unix_timestamp(), 1_431_445_838);

        assert_eq!(page.entries[1].kind, EntryKind::Folder);
        assert_eq!(page.entries[1].size, None);
        assert_eq!(page.entries[2].kind, EntryKind::Deleted);
    }

    #[test]
    fn test_file_without_size_is_kept() {
        let json = serde_json::json!({".tag": "file", "path_lower": "/photos/a.jpg"});
        let entry = Entry::try_from(serde_json::from_value::<WireMetadata>(json).unwrap()).unwrap();
        assert_eq!(entry.size, None);
    }

    #[test]
    fn test_entry_without_path_is_malformed() {
        let json = serde_json::json!({".tag": "file", "size": 12});
        let err = Entry::try_from(serde_json::from_value::<WireMetadata>(json).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        // Unroutable endpoints: if a request were attempted it would be a
        // network error, not an auth error.
        let client =
            DropboxClient::new("dropbox", None).unwrap().with_endpoints("http://0.0.0.0:1", "http://0.0.0.0:1");
        let err = client.list("/photos", 20).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Auth(_)));
        let err = client.download_thumbnail("/photos/a.jpg", &ThumbnailRequest::default()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Auth(_)));
    }

    #[test]
    fn test_blank_token_is_no_token() {
        let client = DropboxClient::new("dropbox", Some("  ".to_string())).unwrap();
        assert!(client.token.is_none());
    }
}
