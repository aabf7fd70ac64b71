//! Fetch stage: stream the source into the local staging file.
//!
//! # Design
//! - The resume offset is the staged file size; append only when the source
//!   confirms partial content, otherwise truncate and start over.
//! - Every chunk boundary checks cancellation first, then the generation token.
//! - A superseded run flushes what it buffered before the interruption and
//!   writes nothing received after it. The relaunched run waits for it to
//!   exit, so the staged size never falls behind the last reported progress.
//! - A cancelled run drops its buffer; the artifact is deleted anyway.

use std::io;
use std::path::Path;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use bolt_events::TransferPhase;
use bolt_transfer_core::range::content_range_total;
use bolt_transfer_core::source::STATUS_RANGE_NOT_SATISFIABLE;
use bolt_transfer_core::{
    ContentSource, ProgressMeter, RunGeneration, TransferDescriptor, TransferError,
    TransferResult,
};

use crate::artifact::file_size;
use crate::emit::Emitter;
use crate::settings::EngineSettings;

/// Result of one fetch run.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The staged file holds the full body of this many bytes.
    Completed(u64),
    /// A newer generation took over; the partial file is left for resume.
    Superseded,
    /// Cancellation was observed; the caller removes the artifact.
    Cancelled,
    /// The run failed; the partial file is left for resume.
    Failed(TransferError),
}

/// Streams a source into a staging path for a single run.
pub struct FetchStage<'a> {
    source: &'a dyn ContentSource,
    emitter: &'a Emitter,
    settings: &'a EngineSettings,
}

impl<'a> FetchStage<'a> {
    /// Bind the stage to its collaborators.
    #[must_use]
    pub const fn new(
        source: &'a dyn ContentSource,
        emitter: &'a Emitter,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            source,
            emitter,
            settings,
        }
    }

    /// Fetch `descriptor`'s source into `path` under generation `run`.
    pub async fn run(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        path: &Path,
        filename: &str,
    ) -> FetchOutcome {
        match self.execute(descriptor, run, path, filename).await {
            Ok(outcome) => outcome,
            Err(err) => FetchOutcome::Failed(err),
        }
    }

    async fn execute(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        path: &Path,
        filename: &str,
    ) -> TransferResult<FetchOutcome> {
        let url = descriptor.source();
        let offset = file_size(path).await?.unwrap_or(0);
        let response = self.source.fetch(url, offset).await?;

        if response.status == STATUS_RANGE_NOT_SATISFIABLE
            && offset > 0
            && response.content_range.as_deref().and_then(content_range_total) == Some(offset)
        {
            debug!(download_id = %descriptor.id(), offset, "staged file already complete");
            return Ok(FetchOutcome::Completed(offset));
        }
        if !response.is_success() {
            return Err(TransferError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let resuming = offset > 0 && response.is_partial();
        let total = response.total_size(offset);
        if let Some(outcome) = interruption(descriptor, run) {
            return Ok(outcome);
        }

        let file = open_target(path, resuming).await?;
        let mut writer = BufWriter::with_capacity(self.settings.fetch_chunk_bytes.max(1), file);
        let mut downloaded = if resuming { offset } else { 0 };
        let mut meter = ProgressMeter::new(
            descriptor.id(),
            filename,
            TransferPhase::Downloading,
            downloaded,
            total,
            self.settings.progress_interval,
        );
        info!(
            download_id = %descriptor.id(),
            offset = downloaded,
            total,
            "fetch started"
        );

        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            if let Some(outcome) = interruption(descriptor, run) {
                settle(writer, &outcome, path).await;
                return Ok(outcome);
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    if descriptor.is_cancelled() {
                        discard(writer).await;
                    } else {
                        flush_partial(writer, path).await;
                    }
                    return Err(err);
                }
            };
            if let Err(source) = writer.write_all(&chunk).await {
                return Err(TransferError::filesystem("fetch.write", path, source));
            }
            downloaded += chunk.len() as u64;
            self.emitter.metrics().add_bytes_fetched(chunk.len() as u64);
            if let Some(snapshot) = meter.observe(downloaded) {
                self.emitter.progress(descriptor, snapshot);
            }
        }

        if let Some(outcome) = interruption(descriptor, run) {
            settle(writer, &outcome, path).await;
            return Ok(outcome);
        }
        writer
            .flush()
            .await
            .map_err(|source| TransferError::filesystem("fetch.flush", path, source))?;
        if total > 0 && downloaded < total {
            return Err(TransferError::network(
                "fetch.read",
                url,
                io::Error::from(io::ErrorKind::UnexpectedEof),
            ));
        }

        self.emitter
            .progress(descriptor, meter.snapshot_at(downloaded, Instant::now()));
        Ok(FetchOutcome::Completed(downloaded))
    }
}

/// Cancellation wins over a stale generation.
fn interruption(descriptor: &TransferDescriptor, run: RunGeneration) -> Option<FetchOutcome> {
    if descriptor.is_cancelled() {
        Some(FetchOutcome::Cancelled)
    } else if !descriptor.is_current(run) || descriptor.is_paused() {
        Some(FetchOutcome::Superseded)
    } else {
        None
    }
}

async fn open_target(path: &Path, append: bool) -> TransferResult<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options
        .open(path)
        .await
        .map_err(|source| TransferError::filesystem("fetch.open", path, source))
}

/// Keep buffered bytes for a superseded run, drop them for a cancelled one.
async fn settle(writer: BufWriter<File>, outcome: &FetchOutcome, path: &Path) {
    if matches!(outcome, FetchOutcome::Cancelled) {
        discard(writer).await;
    } else {
        flush_partial(writer, path).await;
    }
}

/// Drop buffered bytes but wait for writes already handed to the file.
async fn discard(writer: BufWriter<File>) {
    let mut file = writer.into_inner();
    let _ = file.flush().await;
}

/// Keep what was received before a network failure so resume can continue.
async fn flush_partial(mut writer: BufWriter<File>, path: &Path) {
    if let Err(err) = writer.flush().await {
        debug!(path = %path.display(), error = %err, "failed to flush partial artifact");
    }
}
