//! In-memory storage client for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{Cursor, Entry, ListingPage, MoveOptions, Thumbnail, ThumbnailRequest, UploadOptions};
use crate::path::validate as validate_path;
use crate::StorageClient;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Remote operations, as recorded in a [`MockClient`]'s call log and as
/// targets for injected failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    ListContinue,
    Thumbnail,
    Upload,
    Move,
}

struct MockFile {
    /// Path with its original casing.
    display: String,
    size: u64,
    data: Vec<u8>,
}

struct Failure {
    operation: Operation,
    /// `None` fails every call of the operation.
    path: Option<String>,
    kind: ErrorKind,
}

#[derive(Default)]
struct State {
    /// Keyed by lower-cased path; remote paths are case-insensitive.
    files: BTreeMap<String, MockFile>,
    /// Snapshots taken by `list`, indexed by cursor token.
    listings: HashMap<String, (Vec<Entry>, usize, u32)>,
    next_cursor: usize,
    calls: Vec<(Operation, String)>,
    failures: Vec<Failure>,
}

/// In-memory storage client for testing.
///
/// Files live in a map behind a [`RwLock`], so all trait methods operate on
/// `&self`. Listings are non-recursive and snapshotted when the first page
/// is requested, so writes made while paging do not shift later pages.
/// Every call is recorded, and failures can be injected per operation and
/// path.
///
/// Thumbnails are not real images: the payload is a short marker naming the
/// source path and requested rendition.
///
/// # Examples
///
/// ```
/// use lowres_storage::backend::{MockClient, Operation};
/// use lowres_storage::error::ErrorKind;
/// use lowres_storage::StorageClient;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let client = MockClient::with_sizes([("/photos/a.jpg", 7_000_000)])
///     .with_failure(Operation::Move, Some("/photos/a.jpg"), ErrorKind::Network("reset".into()));
/// let page = client.list("/photos", 20).await.unwrap();
/// assert_eq!(page.entries[0].size, Some(7_000_000));
/// # }
/// ```
pub struct MockClient {
    name: String,
    state: RwLock<State>,
}

impl MockClient {
    /// Create a mock client pre-populated with files and their contents.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut state = State::default();
        for (path, data) in files {
            let data = data.into();
            let (key, display) = Self::key(path.into());
            state.files.insert(key, MockFile { display, size: data.len() as u64, data });
        }
        Self {
            name: "mock".to_string(),
            state: RwLock::new(state),
        }
    }

    /// Create a mock client pre-populated with empty files that report the
    /// given sizes. Saves allocating megabytes just to cross a threshold.
    pub fn with_sizes(files: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut state = State::default();
        for (path, size) in files {
            let (key, display) = Self::key(path.into());
            state.files.insert(key, MockFile { display, size, data: Vec::new() });
        }
        Self {
            name: "mock".to_string(),
            state: RwLock::new(state),
        }
    }

    /// Make calls of `operation` fail with `kind`, either for one path (the
    /// folder for [`Operation::List`], the cursor token for
    /// [`Operation::ListContinue`], the source for [`Operation::Move`]) or
    /// for every call when `path` is `None`.
    pub fn with_failure(mut self, operation: Operation, path: Option<&str>, kind: ErrorKind) -> Self {
        self.state.get_mut().failures.push(Failure {
            operation,
            path: path.map(str::to_lowercase),
            kind,
        });
        self
    }

    /// Every call made so far, in order, with the path (or cursor) it was
    /// made for.
    pub async fn calls(&self) -> Vec<(Operation, String)> {
        self.state.read().await.calls.clone()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.state.read().await.files.contains_key(&path.to_lowercase())
    }

    pub async fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().await.files.get(&path.to_lowercase()).map(|f| f.data.clone())
    }

    /// All file paths currently stored, lower-cased and sorted.
    pub async fn paths(&self) -> Vec<String> {
        self.state.read().await.files.keys().cloned().collect()
    }

    fn key(path: String) -> (String, String) {
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockClient is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockClient: invalid path {path}");
        };
        (validated.to_lowercase(), validated)
    }

    fn entry(key: &str, file: &MockFile) -> Entry {
        let mut entry = Entry::file(key, file.size);
        entry.display_path = Some(file.display.clone());
        entry
    }

    /// Direct children of `folder`, files and implied sub-folders, in path order.
    fn children(state: &State, folder: &str) -> Option<Vec<Entry>> {
        let prefix = format!("{folder}/");
        let mut found = folder.is_empty();
        let mut children = BTreeMap::new();
        for (key, file) in state.files.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else { break };
            found = true;
            match rest.split_once('/') {
                Some((sub, _)) => {
                    let path = format!("{prefix}{sub}");
                    children.entry(path.clone()).or_insert_with(|| Entry::folder(path));
                },
                None => {
                    children.insert(key.clone(), Self::entry(key, file));
                },
            }
        }
        found.then(|| children.into_values().collect())
    }

    /// Dropbox-style conflict renaming: `a.jpg` → `a (1).jpg` → `a (2).jpg`.
    fn autorename(state: &State, path: &str) -> String {
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name, ""),
        };
        (1..)
            .map(|n| format!("{parent}/{stem} ({n}){ext}"))
            .find(|candidate| !state.files.contains_key(&candidate.to_lowercase()))
            .unwrap_or_else(|| path.to_string())
    }

    fn record(state: &mut State, operation: Operation, path: &str) -> Result<()> {
        state.calls.push((operation, path.to_string()));
        let path = path.to_lowercase();
        match state
            .failures
            .iter()
            .find(|f| f.operation == operation && f.path.as_deref().is_none_or(|p| p == path))
        {
            Some(failure) => exn::bail!(failure.kind.clone()),
            None => Ok(()),
        }
    }

    fn page(state: &mut State, token: String) -> Result<ListingPage> {
        let (entries, offset, limit) =
            state.listings.get(&token).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(token.clone())))?;
        let end = (offset + limit as usize).min(entries.len());
        let has_more = end < entries.len();
        state.listings.insert(token.clone(), (entries.clone(), end, limit));
        Ok(ListingPage {
            entries: entries[offset..end].to_vec(),
            cursor: Some(Cursor::new(token)),
            has_more,
        })
    }
}
impl Default for MockClient {
    fn default() -> Self {
        let files: [(&str, Vec<u8>); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, folder: &str, limit: u32) -> Result<ListingPage> {
        let mut guard = self.state.write().await;
        Self::record(&mut guard, Operation::List, folder)?;
        let folder = validate_path(folder)?.to_lowercase();
        if limit == 0 {
            exn::bail!(ErrorKind::BackendError("limit must be at least 1".to_string()));
        }
        let entries = Self::children(&guard, &folder).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(folder)))?;
        let token = format!("mock-cursor-{}", guard.next_cursor);
        guard.next_cursor += 1;
        guard.listings.insert(token.clone(), (entries, 0, limit));
        Self::page(&mut guard, token)
    }

    async fn list_continue(&self, cursor: &Cursor) -> Result<ListingPage> {
        let mut guard = self.state.write().await;
        Self::record(&mut guard, Operation::ListContinue, cursor.as_str())?;
        Self::page(&mut guard, cursor.as_str().to_string())
    }

    async fn download_thumbnail(&self, path: &str, request: &ThumbnailRequest) -> Result<Thumbnail> {
        let mut guard = self.state.write().await;
        Self::record(&mut guard, Operation::Thumbnail, path)?;
        let key = validate_path(path)?.to_lowercase();
        let file = guard.files.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(Thumbnail {
            data: format!("thumbnail:{}:{}:{}:{key}", request.format, request.size, request.mode).into_bytes(),
            metadata: Some(Self::entry(&key, file)),
        })
    }

    async fn upload(&self, path: &str, data: &[u8], options: UploadOptions) -> Result<Entry> {
        let mut guard = self.state.write().await;
        Self::record(&mut guard, Operation::Upload, path)?;
        let mut target = validate_path(path)?;
        if guard.files.contains_key(&target.to_lowercase()) {
            if !options.autorename {
                exn::bail!(ErrorKind::Conflict(target));
            }
            target = Self::autorename(&guard, &target);
        }
        let key = target.to_lowercase();
        let file = MockFile {
            display: target,
            size: data.len() as u64,
            data: data.to_vec(),
        };
        let entry = Self::entry(&key, &file);
        guard.files.insert(key, file);
        Ok(entry)
    }

    async fn move_entry(&self, from: &str, to: &str, options: MoveOptions) -> Result<Entry> {
        let mut guard = self.state.write().await;
        Self::record(&mut guard, Operation::Move, from)?;
        let from = validate_path(from)?.to_lowercase();
        let mut target = validate_path(to)?;
        if !guard.files.contains_key(&from) {
            exn::bail!(ErrorKind::NotFound(from));
        }
        if guard.files.contains_key(&target.to_lowercase()) {
            if !options.autorename {
                exn::bail!(ErrorKind::Conflict(target));
            }
            target = Self::autorename(&guard, &target);
        }
        let Some(mut file) = guard.files.remove(&from) else {
            exn::bail!(ErrorKind::NotFound(from));
        };
        let key = target.to_lowercase();
        file.display = target;
        let entry = Self::entry(&key, &file);
        guard.files.insert(key, file);
        Ok(entry)
    }
}
