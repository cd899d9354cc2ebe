//! # Autosave
//!
//! An `EditingSession` wraps a `ReportEditor` and persists it through a
//! `ReportSink`. Manual saves and autosave ticks go through the same
//! `SaveGate`, so at most one save is in flight; a tick that finds a save
//! running is skipped, not queued.
//!
//! `AutosaveHandle` drives the ticks from a tokio interval task. The task is
//! cancelled by `stop` or when the handle is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use weekly_core::{
    RecordId, Report, ReportDraft, ReportEditor, ReportStatus, Repository, SaveGate, SaveOutcome,
    SaveTrigger, SkipReason, WeeklyError,
};

/// Where an editing session writes its report.
pub trait ReportSink: Send + Sync + 'static {
    /// Create (`report_id == None`) or update a report from a full draft.
    fn persist(
        &self,
        report_id: Option<RecordId>,
        draft: ReportDraft,
    ) -> impl Future<Output = Result<Report, WeeklyError>> + Send;
}

/// Sink that saves into a shared repository and flushes it.
#[derive(Debug, Clone)]
pub struct RepositorySink {
    repo: Arc<Mutex<Repository>>,
}

impl RepositorySink {
    pub fn new(repo: Arc<Mutex<Repository>>) -> Self {
        Self { repo }
    }
}

impl ReportSink for RepositorySink {
    async fn persist(
        &self,
        report_id: Option<RecordId>,
        draft: ReportDraft,
    ) -> Result<Report, WeeklyError> {
        let mut repo = self.repo.lock().await;
        let report = repo.save_report(report_id.as_ref(), draft)?;
        repo.flush()?;
        Ok(report)
    }
}

/// A report being edited, with single-flight saving.
#[derive(Debug)]
pub struct EditingSession<S: ReportSink> {
    sink: S,
    editor: Mutex<ReportEditor>,
    gate: SaveGate,
}

impl<S: ReportSink> EditingSession<S> {
    pub fn new(sink: S, editor: ReportEditor) -> Arc<Self> {
        Arc::new(Self {
            sink,
            editor: Mutex::new(editor),
            gate: SaveGate::new(),
        })
    }

    /// True while a save is running.
    pub fn is_saving(&self) -> bool {
        self.gate.is_busy()
    }

    /// Change the draft.
    pub async fn edit<T>(&self, f: impl FnOnce(&mut ReportEditor) -> T) -> T {
        let mut editor = self.editor.lock().await;
        f(&mut editor)
    }

    /// Copy of the current editor state.
    pub async fn snapshot(&self) -> ReportEditor {
        self.editor.lock().await.clone()
    }

    /// Save the draft with the given status.
    ///
    /// Autosave additionally skips drafts that are not ready.
    pub async fn save(
        &self,
        status: ReportStatus,
        trigger: SaveTrigger,
    ) -> Result<SaveOutcome, WeeklyError> {
        let Some(_guard) = self.gate.try_acquire() else {
            return Ok(SaveOutcome::Skipped(SkipReason::InFlight));
        };

        let (report_id, mut draft) = {
            let editor = self.editor.lock().await;
            if trigger == SaveTrigger::Autosave
                && let Some(reason) = editor.autosave_check()
            {
                return Ok(SaveOutcome::Skipped(reason));
            }
            (editor.report_id().cloned(), editor.draft().clone())
        };
        draft.status = status;

        let report = self.sink.persist(report_id, draft).await?;
        self.editor.lock().await.mark_saved(&report);
        Ok(SaveOutcome::Saved(report))
    }

    /// One autosave tick: save as draft if ready and nothing else is saving.
    pub async fn autosave(&self) -> Result<SaveOutcome, WeeklyError> {
        self.save(ReportStatus::Draft, SaveTrigger::Autosave).await
    }
}

/// Running autosave task.
#[derive(Debug)]
pub struct AutosaveHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    /// Tick every `period`, starting one period from now.
    pub fn start<S: ReportSink>(session: Arc<EditingSession<S>>, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match session.autosave().await {
                        Ok(SaveOutcome::Saved(report)) => {
                            tracing::info!(report = %report.id, "autosaved draft");
                        }
                        Ok(SaveOutcome::Skipped(reason)) => {
                            tracing::debug!(?reason, "autosave skipped");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "autosave failed");
                        }
                    },
                }
            }
        });
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop ticking and wait for an in-progress tick to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "autosave task ended abnormally");
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
