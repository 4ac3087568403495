//! Per-job runner: waits for a slot, drives the engine, records the outcome.
//!
//! `Pending -> Running -> {Completed | Failed}`, plus `Pending -> Failed` when a
//! job is cancelled before it gets a slot. Every transition goes through
//! [`JobRegistry::update`](crate::registry::JobRegistry::update), so updates
//! that arrive after a terminal state (or after a purge) change nothing.

use crate::engine::{EngineUpdate, FetchOutput, FetchRequest, ProgressSink};
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::types::{Event, JobId, JobRecord, QualitySpec, has_audio_extension};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::MediaDownloader;

impl MediaDownloader {
    /// Run one job to completion; spawned by [`submit`](Self::submit)
    pub(crate) async fn run_job(
        self,
        id: JobId,
        url: String,
        quality: QualitySpec,
        token: CancellationToken,
    ) {
        match self.execute(&id, url, quality, &token).await {
            Ok(Some(output)) => self.finish_job(&id, output, quality).await,
            Ok(None) => {
                tracing::debug!(job_id = %id, "Job record gone before start, runner exiting");
            }
            Err(e) => self.fail_job(&id, e).await,
        }

        self.job_control.active_jobs.lock().await.remove(&id);
    }

    /// Wait for a slot and fetch
    ///
    /// Returns `Ok(None)` if the record disappeared or left `Pending` while the
    /// job was waiting.
    async fn execute(
        &self,
        id: &JobId,
        url: String,
        quality: QualitySpec,
        token: &CancellationToken,
    ) -> Result<Option<FetchOutput>> {
        let permit = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(Error::Other("cancelled before start".to_string()));
            }
            permit = self.job_control.concurrent_limit.clone().acquire_owned() => {
                permit.map_err(|_| Error::Other("job slots closed".to_string()))?
            }
        };

        if self.registry.update(id, JobRecord::start).await != Some(true) {
            return Ok(None);
        }
        tracing::info!(job_id = %id, "Job started");
        self.emit_event(Event::Started { id: id.clone() });

        let (sink, mut updates) = ProgressSink::channel();
        let request = FetchRequest {
            url,
            quality,
            output_dir: self.store.root().to_path_buf(),
            tag: id.to_string(),
        };

        let job_timeout = self.config.download.job_timeout;
        let deadline = async {
            match job_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut fetch = self.engine.fetch(request, sink);
        let mut tracker = ProgressTracker::new();
        let mut updates_open = true;

        let output = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(Error::Other("cancelled".to_string()));
                }
                _ = &mut deadline => {
                    let secs = job_timeout.map(|d| d.as_secs()).unwrap_or_default();
                    return Err(Error::Other(format!("timed out after {secs}s")));
                }
                update = updates.recv(), if updates_open => match update {
                    Some(update) => self.apply_update(id, update, &mut tracker).await,
                    None => updates_open = false,
                },
                result = &mut fetch => break result?,
            }
        };

        // The sink is gone with the fetch future; flush what it left behind
        while let Ok(update) = updates.try_recv() {
            self.apply_update(id, update, &mut tracker).await;
        }
        drop(permit);

        Ok(Some(output))
    }

    pub(crate) async fn apply_update(
        &self,
        id: &JobId,
        update: EngineUpdate,
        tracker: &mut ProgressTracker,
    ) {
        match update {
            EngineUpdate::Progress(event) => {
                let Some(sample) = tracker.observe(&event) else {
                    return;
                };

                let mut progress = 0.0;
                let label = sample.raw_label.clone();
                let changed = self
                    .registry
                    .update(id, |record| {
                        let changed = record.record_progress(sample.percent, sample.raw_label);
                        progress = record.progress;
                        changed
                    })
                    .await;

                if changed == Some(true) {
                    tracing::debug!(job_id = %id, progress, label = ?label, "Job progress");
                    self.emit_event(Event::Progress {
                        id: id.clone(),
                        percent: progress,
                        label,
                    });
                }
            }
            EngineUpdate::Title(title) => {
                let changed = self
                    .registry
                    .update(id, |record| record.set_title(title.clone()))
                    .await;

                if changed == Some(true) {
                    tracing::debug!(job_id = %id, title = %title, "Job title resolved");
                    self.emit_event(Event::TitleResolved {
                        id: id.clone(),
                        title,
                    });
                }
            }
        }
    }

    async fn finish_job(&self, id: &JobId, output: FetchOutput, quality: QualitySpec) {
        let path = if quality.is_audio_only() {
            match self.normalize_audio(output.path).await {
                Ok(path) => path,
                Err(e) => return self.fail_job(id, e).await,
            }
        } else {
            output.path
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                let e = Error::Other(format!(
                    "engine reported output file {} which does not exist",
                    path.display()
                ));
                return self.fail_job(id, e).await;
            }
        }

        let mut title = None;
        let changed = self
            .registry
            .update(id, |record| {
                let changed = record.complete(path.clone(), output.title);
                title = record.title.clone();
                changed
            })
            .await;

        if changed == Some(true) {
            tracing::info!(job_id = %id, path = %path.display(), "Job completed");
            self.emit_event(Event::Completed {
                id: id.clone(),
                file_path: path,
                title,
            });
        } else {
            tracing::debug!(job_id = %id, "Completion discarded, job no longer running");
        }
    }

    /// Make sure an audio-only job ends with an audio container
    ///
    /// Prefers a sibling with the configured audio extension (the extracted
    /// audio), otherwise renames the produced file.
    async fn normalize_audio(&self, path: PathBuf) -> Result<PathBuf> {
        if has_audio_extension(&path) {
            return Ok(path);
        }

        let target = path.with_extension(&self.config.engine.audio_format);
        if matches!(tokio::fs::try_exists(&target).await, Ok(true)) {
            tracing::debug!(from = %path.display(), to = %target.display(), "Using extracted audio file");
            return Ok(target);
        }

        tokio::fs::rename(&path, &target).await?;
        tracing::debug!(from = %path.display(), to = %target.display(), "Renamed audio output");
        Ok(target)
    }

    pub(crate) async fn fail_job(&self, id: &JobId, error: Error) {
        let message = error.to_string();
        let changed = self
            .registry
            .update(id, |record| record.fail(message.clone()))
            .await;

        if changed == Some(true) {
            tracing::error!(job_id = %id, error = %message, "Job failed");
            self.emit_event(Event::Failed {
                id: id.clone(),
                error: message,
            });
        }
    }
}
