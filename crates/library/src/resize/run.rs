use crate::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::resize::stream::{ResizeEvent, Summary, resize};
use futures::{Stream, StreamExt};
use lowres_storage::ClientHandle;
use std::pin::pin;

/// Drives a complete resize run against one client, logging progress.
pub struct Orchestrator {
    client: ClientHandle,
    ctx: Context,
}

impl Orchestrator {
    pub fn new(client: ClientHandle, ctx: Context) -> Self {
        Self { client, ctx }
    }

    /// The raw event stream, for callers that want to report progress
    /// themselves.
    pub fn events(&self) -> impl Stream<Item = LibraryResult<ResizeEvent>> + '_ {
        resize(&self.client, &self.ctx)
    }

    /// Runs to completion and returns the totals.
    ///
    /// The error returned on abort carries the failure that stopped the run;
    /// everything processed before it stays processed.
    pub async fn run(&self) -> LibraryResult<Summary> {
        tracing::info!(
            client = %self.client.name(),
            folder = %self.ctx.folder,
            threshold = self.ctx.threshold,
            suffix = %self.ctx.policy.suffix(),
            archive = %self.ctx.policy.archive_folder(),
            "Looking for oversized images"
        );
        let mut events = pin!(self.events());
        while let Some(event) = events.next().await {
            match event {
                Ok(ResizeEvent::Started) => {},
                Ok(ResizeEvent::PageListed { entries, candidates }) => {
                    tracing::debug!(entries, candidates, "Processing page");
                },
                Ok(ResizeEvent::Resized(outcome)) => {
                    tracing::info!(
                        lowres = %outcome.lowres,
                        archived = %outcome.archived,
                        "resized and moved {}",
                        outcome.original
                    );
                },
                Ok(ResizeEvent::Skipped { path, error }) => {
                    tracing::warn!(path = %path, error = ?error, "Skipping file");
                },
                Ok(ResizeEvent::Complete(summary)) => {
                    tracing::info!(
                        skipped = summary.skipped,
                        pages = summary.pages,
                        "Finished! Resized {} images",
                        summary.processed
                    );
                    return Ok(summary);
                },
                Err(e) => {
                    tracing::error!(error = ?e, "Encountered error, aborting");
                    return Err(e);
                },
            }
        }
        exn::bail!(LibraryErrorKind::Resize)
    }
}
