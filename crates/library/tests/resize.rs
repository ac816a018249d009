use futures::StreamExt;
use lowres_library::resize::error::ErrorKind as ResizeErrorKind;
use lowres_library::resize::{Orchestrator, ResizeEvent, Summary, resize};
use lowres_library::{Context, ErrorPolicy};
use lowres_storage::ClientHandle;
use lowres_storage::backend::{MockClient, Operation, ReadOnlyClient};
use lowres_storage::error::ErrorKind as StorageErrorKind;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Formatted log output collected by a thread-local subscriber.
#[derive(Clone, Default)]
struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    /// Capture everything logged on this thread until the guard is dropped.
    fn capture() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    fn lines_containing(&self, needle: &str) -> Vec<String> {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).lines().filter(|l| l.contains(needle)).map(str::to_string).collect()
    }
}

impl Write for Logs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn setup(files: &[(&str, u64)]) -> (Arc<MockClient>, ClientHandle) {
    let mock = Arc::new(MockClient::with_sizes(files.iter().copied()));
    let client: ClientHandle = mock.clone();
    (mock, client)
}

fn remote_calls(calls: &[(Operation, String)], operation: Operation) -> Vec<&str> {
    calls.iter().filter(|(op, _)| *op == operation).map(|(_, p)| p.as_str()).collect()
}

#[tokio::test]
async fn test_single_page() {
    let (mock, client) = setup(&[("/photos/a.jpg", 7_000_000), ("/photos/b.txt", 9_000_000)]);
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();

    assert_eq!(summary, Summary { pages: 1, processed: 1, skipped: 0 });
    assert_eq!(
        mock.paths().await,
        vec!["/photos/a_lowres.jpg", "/photos/b.txt", "/photos/highres/a.jpg"]
    );
    let calls = mock.calls().await;
    assert_eq!(remote_calls(&calls, Operation::Thumbnail), vec!["/photos/a.jpg"]);
    assert_eq!(remote_calls(&calls, Operation::Upload), vec!["/photos/a_lowres.jpg"]);
    assert_eq!(remote_calls(&calls, Operation::Move), vec!["/photos/a.jpg"]);
}

#[tokio::test]
async fn test_uploaded_data_is_thumbnail() {
    let (mock, client) = setup(&[("/photos/a.png", 7_000_000)]);
    Orchestrator::new(client, Context::default()).run().await.unwrap();

    let data = mock.read("/photos/a_lowres.jpg").await.unwrap();
    assert_eq!(String::from_utf8(data).unwrap(), "thumbnail:jpeg:w2048h1536:fitone_bestfit:/photos/a.png");
}

#[tokio::test]
async fn test_follows_cursor_across_pages() {
    let (mock, client) = setup(&[("/photos/a.jpg", 7_000_000), ("/photos/b.jpg", 8_000_000)]);
    let ctx = Context { page_size: 1, ..Context::default() };
    let (logs, _guard) = Logs::capture();
    let summary = Orchestrator::new(client, ctx).run().await.unwrap();

    assert_eq!(summary, Summary { pages: 2, processed: 2, skipped: 0 });
    let progress = logs.lines_containing("resized and moved");
    assert_eq!(progress.len(), 2);
    assert!(progress[0].contains("/photos/a.jpg"));
    assert!(progress[1].contains("/photos/b.jpg"));
    assert_eq!(logs.lines_containing("Finished! Resized 2 images").len(), 1);
    let calls = mock.calls().await;
    let listings: Vec<_> =
        calls.iter().filter(|(op, _)| matches!(op, Operation::List | Operation::ListContinue)).cloned().collect();
    assert_eq!(
        listings,
        vec![
            (Operation::List, "/photos".to_string()),
            (Operation::ListContinue, "mock-cursor-0".to_string()),
        ]
    );
    // Page one is fully processed before page two is requested.
    let first_move = calls.iter().position(|(op, _)| *op == Operation::Move).unwrap();
    let continued = calls.iter().position(|(op, _)| *op == Operation::ListContinue).unwrap();
    assert!(first_move < continued);
}

#[tokio::test]
async fn test_thumbnail_failure_aborts() {
    let mock = Arc::new(MockClient::with_sizes([("/photos/a.jpg", 7_000_000)]).with_failure(
        Operation::Thumbnail,
        Some("/photos/a.jpg"),
        StorageErrorKind::Network("connection reset".to_string()),
    ));
    let client: ClientHandle = mock.clone();
    let orchestrator = Orchestrator::new(client, Context::default());

    let mut events = Box::pin(orchestrator.events());
    let mut resized = 0;
    let mut failed = None;
    while let Some(event) = events.next().await {
        match event {
            Ok(ResizeEvent::Resized(_)) => resized += 1,
            Ok(ResizeEvent::Complete(_)) => panic!("aborted run must not complete"),
            Ok(_) => {},
            Err(e) => failed = Some(e),
        }
    }
    assert_eq!(resized, 0);
    assert!(failed.is_some());

    let calls = mock.calls().await;
    assert!(remote_calls(&calls, Operation::Upload).is_empty());
    assert!(remote_calls(&calls, Operation::Move).is_empty());
    assert_eq!(mock.paths().await, vec!["/photos/a.jpg"]);
}

#[tokio::test]
async fn test_thumbnail_failure_logs_one_abort() {
    let mock = MockClient::with_sizes([("/photos/a.jpg", 7_000_000)]).with_failure(
        Operation::Thumbnail,
        None,
        StorageErrorKind::Network("connection reset".to_string()),
    );
    let client: ClientHandle = Arc::new(mock);
    let (logs, _guard) = Logs::capture();

    assert!(Orchestrator::new(client, Context::default()).run().await.is_err());
    assert_eq!(logs.lines_containing("Encountered error, aborting").len(), 1);
    assert!(logs.lines_containing("resized and moved").is_empty());
    assert!(logs.lines_containing("Finished!").is_empty());
}

#[tokio::test]
async fn test_run_returns_error_on_abort() {
    let mock = MockClient::with_sizes([("/photos/a.jpg", 7_000_000), ("/photos/b.jpg", 7_000_000)]).with_failure(
        Operation::Move,
        Some("/photos/b.jpg"),
        StorageErrorKind::Conflict("/photos/highres/b.jpg".to_string()),
    );
    let mock = Arc::new(mock);
    let client: ClientHandle = mock.clone();

    assert!(Orchestrator::new(client, Context::default()).run().await.is_err());
    // Work done before the failure is kept; the upload for b is not rolled back.
    assert_eq!(
        mock.paths().await,
        vec!["/photos/a_lowres.jpg", "/photos/b.jpg", "/photos/b_lowres.jpg", "/photos/highres/a.jpg"]
    );
}

#[tokio::test]
async fn test_threshold_is_exclusive() {
    let (mock, client) = setup(&[("/photos/exact.jpg", 6_000_000), ("/photos/above.jpg", 6_000_001)]);
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();

    assert_eq!(summary.processed, 1);
    let calls = mock.calls().await;
    assert_eq!(remote_calls(&calls, Operation::Thumbnail), vec!["/photos/above.jpg"]);
}

#[tokio::test]
async fn test_empty_folder() {
    let (mock, client) = setup(&[("/photos/small.jpg", 10)]);
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();
    assert_eq!(summary, Summary { pages: 1, processed: 0, skipped: 0 });
    assert_eq!(mock.paths().await, vec!["/photos/small.jpg"]);
}

#[tokio::test]
async fn test_missing_folder_is_fatal() {
    let (_, client) = setup(&[("/elsewhere/a.jpg", 7_000_000)]);
    let ctx = Context { on_error: ErrorPolicy::Skip, ..Context::default() };
    let orchestrator = Orchestrator::new(client, ctx);
    let events: Vec<_> = orchestrator.events().collect().await;

    assert!(matches!(events[0], Ok(ResizeEvent::Started)));
    assert_eq!(events.len(), 2);
    assert!(events[1].is_err());
}

#[tokio::test]
async fn test_skip_policy_continues() {
    let mock = MockClient::with_sizes([("/photos/a.jpg", 7_000_000), ("/photos/b.jpg", 7_000_000)]).with_failure(
        Operation::Thumbnail,
        Some("/photos/a.jpg"),
        StorageErrorKind::NotFound("/photos/a.jpg".to_string()),
    );
    let mock = Arc::new(mock);
    let client: ClientHandle = mock.clone();
    let ctx = Context { on_error: ErrorPolicy::Skip, ..Context::default() };

    let mut skipped = Vec::new();
    let mut summary = None;
    let mut events = Box::pin(resize(&client, &ctx));
    while let Some(event) = events.next().await {
        match event.unwrap() {
            ResizeEvent::Skipped { path, error } => {
                assert!(matches!(&*error, ResizeErrorKind::File { recoverable: true, .. }));
                skipped.push(path);
            },
            ResizeEvent::Complete(s) => summary = Some(s),
            _ => {},
        }
    }

    assert_eq!(skipped, vec!["/photos/a.jpg"]);
    assert_eq!(summary, Some(Summary { pages: 1, processed: 1, skipped: 1 }));
    assert!(mock.contains("/photos/highres/b.jpg").await);
    assert!(mock.contains("/photos/a.jpg").await);
}

#[tokio::test]
async fn test_skip_policy_still_aborts_on_auth() {
    let mock = MockClient::with_sizes([("/photos/a.jpg", 7_000_000), ("/photos/b.jpg", 7_000_000)]).with_failure(
        Operation::Upload,
        None,
        StorageErrorKind::Auth("expired_access_token".to_string()),
    );
    let mock = Arc::new(mock);
    let client: ClientHandle = mock.clone();
    let ctx = Context { on_error: ErrorPolicy::Skip, ..Context::default() };

    assert!(Orchestrator::new(client, ctx).run().await.is_err());
    let calls = mock.calls().await;
    assert_eq!(remote_calls(&calls, Operation::Upload), vec!["/photos/a_lowres.jpg"]);
    assert!(remote_calls(&calls, Operation::Move).is_empty());
}

#[tokio::test]
async fn test_name_without_extension_is_ignored() {
    let (mock, client) = setup(&[("/photos/README", 9_000_000), ("/photos/archive.JPG.bak", 9_000_000)]);
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert!(remote_calls(&mock.calls().await, Operation::Thumbnail).is_empty());
}

#[tokio::test]
async fn test_existing_destinations_autorename() {
    let (mock, client) = setup(&[
        ("/photos/a.jpg", 7_000_000),
        ("/photos/a_lowres.jpg", 10),
        ("/photos/highres/a.jpg", 10),
    ]);
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();
    assert_eq!(summary.processed, 1);
    assert!(mock.contains("/photos/a_lowres (1).jpg").await);
    assert!(mock.contains("/photos/highres/a (1).jpg").await);
}

#[tokio::test]
async fn test_dry_run_leaves_storage_untouched() {
    let (mock, inner) = setup(&[("/photos/a.jpg", 7_000_000)]);
    let client: ClientHandle = Arc::new(ReadOnlyClient::new(inner));
    let summary = Orchestrator::new(client, Context::default()).run().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(mock.paths().await, vec!["/photos/a.jpg"]);
    assert!(remote_calls(&mock.calls().await, Operation::Upload).is_empty());
}
