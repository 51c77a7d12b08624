use std::path::Path;

use chrono::Utc;
use log::{info, warn};

use crate::error::{PreconditionFailure, TmsError};
use crate::poller::{Sleeper, TokioSleeper, await_done};
use crate::state_machine::{Job, JobReport, PollOutcome, PollPolicy};
use crate::tms::{Direction, JobId, JobState, ReqwestTransport, TmsClient, Transport};
use crate::translations::{TranslationManager, TranslationReader, TranslationWriter};

/// Runs export and import pipelines against one TMS.
///
/// Each call tracks exactly one remote job. The poll policy is part of the
/// value; changing it needs `&mut self`, so it cannot race a running pipeline.
pub struct TranslationSync<T = ReqwestTransport, S = TokioSleeper> {
    client: TmsClient<T>,
    policy: PollPolicy,
    sleeper: S,
    strict_deadline: bool,
}

impl<T: Transport> TranslationSync<T, TokioSleeper> {
    pub fn new(client: TmsClient<T>) -> Self {
        Self {
            client,
            policy: PollPolicy::default(),
            sleeper: TokioSleeper,
            strict_deadline: false,
        }
    }
}

impl<T: Transport, S: Sleeper> TranslationSync<T, S> {
    /// Replace the sleep capability (tests use a recording sleeper).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> TranslationSync<T, S2> {
        TranslationSync {
            client: self.client,
            policy: self.policy,
            sleeper,
            strict_deadline: self.strict_deadline,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// When set, a poll loop that hits the deadline fails with
    /// [`TmsError::DeadlineExceeded`] instead of returning normally.
    pub fn strict_deadline(mut self, strict: bool) -> Self {
        self.strict_deadline = strict;
        self
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn set_poll_policy(&mut self, policy: PollPolicy) {
        self.policy = policy;
    }

    pub fn client(&self) -> &TmsClient<T> {
        &self.client
    }

    /// Local → remote.
    ///
    /// Has `manager` write the local translations to `export_file` through
    /// `writer`, uploads the file and waits for the export job.
    pub async fn export_translations(
        &self,
        manager: &impl TranslationManager,
        reader: &mut dyn TranslationReader,
        writer: &mut dyn TranslationWriter,
        export_file: &Path,
    ) -> Result<JobReport, TmsError> {
        let started_at = Utc::now();

        let entries = manager.copy_translations(reader, writer)?;
        if !export_file.is_file() {
            warn!("Export file {} was not produced", export_file.display());
            return Err(PreconditionFailure::FileNotProduced {
                path: export_file.to_path_buf(),
            }
            .into());
        }

        let id = self.client.submit_export_upload(export_file).await?;
        info!("Uploaded {} ({entries} entries) as export job {id}", export_file.display());

        let (job, outcome) = self.wait_for(id, Direction::Export).await?;
        Ok(JobReport::from_job(&job, outcome, entries, started_at))
    }

    /// Remote → local.
    ///
    /// Requests an import file for the manager's languages (an empty list is
    /// sent as-is and left to the TMS to interpret), waits for the job, downloads the file to `import_file` and has `manager` merge it
    /// through `reader`/`writer`. The staging file is removed afterwards,
    /// also when the merge fails.
    pub async fn import_translations(
        &self,
        manager: &impl TranslationManager,
        reader: &mut dyn TranslationReader,
        writer: &mut dyn TranslationWriter,
        import_file: &Path,
    ) -> Result<JobReport, TmsError> {
        let started_at = Utc::now();

        let languages = manager.languages();
        // Checked again after polling; this one avoids wasting a remote job.
        ensure_absent(import_file)?;

        let id = self.client.submit_import(&languages).await?;
        info!("Requested import of [{}] as job {id}", languages.join(","));

        let (job, outcome) = self.wait_for(id, Direction::Import).await?;

        ensure_absent(import_file)?;
        let bytes = self.client.download_import_file(id, import_file).await?;
        info!("Downloaded {bytes} bytes to {}", import_file.display());

        let merged = manager.copy_translations(reader, writer);
        let removed = match tokio::fs::remove_file(import_file).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
        let entries = merged?;
        removed?;
        info!("Merged {entries} entries, removed {}", import_file.display());

        Ok(JobReport::from_job(&job, outcome, entries, started_at))
    }

    /// Polls a job once.
    pub async fn job_state(&self, direction: Direction, id: JobId) -> Result<JobState, TmsError> {
        self.client.poll_state(direction, id).await
    }

    async fn wait_for(
        &self,
        id: JobId,
        direction: Direction,
    ) -> Result<(Job, PollOutcome), TmsError> {
        let client = &self.client;
        let (job, outcome) = await_done(id, direction, &self.policy, &self.sleeper, move |id| {
            client.poll_state(direction, id)
        })
        .await?;

        match outcome {
            PollOutcome::TimedOut { last_state } if self.strict_deadline => {
                Err(TmsError::DeadlineExceeded {
                    job_id: id,
                    last_state,
                    waited_secs: job.waited.as_secs(),
                })
            }
            _ => Ok((job, outcome)),
        }
    }
}

fn ensure_absent(path: &Path) -> Result<(), TmsError> {
    if path.exists() {
        warn!("Import file {} already exists", path.display());
        return Err(PreconditionFailure::FileAlreadyExists {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}
