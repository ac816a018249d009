use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::filter::oversized_images;
use crate::resize::error::{Error as ResizeError, ErrorKind as ResizeErrorKind, Result as ResizeResult};
use crate::resize::file::{Outcome, resize_file};
use crate::resize::pagination::Pagination;
use crate::{Context, ErrorPolicy};
use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use lowres_storage::ClientHandle;

/// Totals for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Listing pages fetched.
    pub pages: u64,
    /// Candidates for which all three remote calls succeeded.
    pub processed: u64,
    /// Candidates abandoned under [`ErrorPolicy::Skip`].
    pub skipped: u64,
}

/// Progress events emitted by [`resize`] as it works through a folder.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) - exactly once.
/// 2. For each listing page, one [`PageListed`](Self::PageListed) followed by
///    one [`Resized`](Self::Resized) or [`Skipped`](Self::Skipped) per
///    candidate on that page, in listing order.
/// 3. [`Complete`](Self::Complete) - exactly once, signalling the stream is
///    finished.
///
/// An error terminates the stream early, in which case [`Complete`](Self::Complete)
/// is never emitted.
#[derive(Debug)]
pub enum ResizeEvent {
    /// The run has begun; emitted before any remote call.
    Started,
    /// A listing page arrived.
    PageListed { entries: usize, candidates: usize },
    /// A candidate was downsized and its original archived.
    Resized(Outcome),
    /// A candidate failed and was left behind.
    Skipped { path: String, error: ResizeError },
    /// The last page has been handled; the stream is finished.
    Complete(Summary),
}

/// Streams [`ResizeEvent`]s for every oversized image directly inside
/// `ctx.folder`.
///
/// Pages are requested one at a time, `ctx.page_size` entries at most, and
/// every candidate on a page is handled (sequentially, in listing order)
/// before the next page is requested. Subfolders are not descended into.
///
/// Listing failures always end the stream. Per-file failures end it too,
/// unless `ctx.on_error` is [`ErrorPolicy::Skip`] and the failure leaves the
/// client usable.
pub fn resize<'a>(client: &'a ClientHandle, ctx: &'a Context) -> impl Stream<Item = LibraryResult<ResizeEvent>> + 'a {
    stream! {
        for await event in resize_inner(client, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Resize);
        }
    }
}

fn resize_inner<'a>(client: &'a ClientHandle, ctx: &'a Context) -> impl Stream<Item = ResizeResult<ResizeEvent>> + 'a {
    stream!({
        yield Ok(ResizeEvent::Started);

        let mut summary = Summary::default();
        let mut state = Pagination::NeedFirstPage;
        loop {
            let page = match &state {
                Pagination::NeedFirstPage => client.list(&ctx.folder, ctx.page_size).await,
                Pagination::NeedNextPage(cursor) => client.list_continue(cursor).await,
                Pagination::Done => break,
            };
            let page = match page.or_raise(|| ResizeErrorKind::Listing) {
                Ok(p) => p,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            summary.pages += 1;

            let candidates = oversized_images(&page.entries, ctx.threshold);
            tracing::debug!(entries = page.entries.len(), candidates = candidates.len(), "Listed page");
            yield Ok(ResizeEvent::PageListed {
                entries: page.entries.len(),
                candidates: candidates.len(),
            });

            for path in candidates {
                match resize_file(client, ctx, &path).await {
                    Ok(outcome) => {
                        summary.processed += 1;
                        yield Ok(ResizeEvent::Resized(outcome));
                    },
                    Err(e) if ctx.on_error == ErrorPolicy::Skip && e.is_skippable() => {
                        summary.skipped += 1;
                        yield Ok(ResizeEvent::Skipped { path, error: e });
                    },
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }

            state = match Pagination::after(&page) {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
        }

        yield Ok(ResizeEvent::Complete(summary));
    })
}
