//! Ingestion job queue: tokio mpsc submission feeding one worker task.
//!
//! Jobs are CPU-bound closures; the worker runs each through
//! `spawn_blocking` so the executor stays responsive, strictly one job at
//! a time so ingest runs never interleave. Statuses stay queryable after
//! completion.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tms_common::{LayerId, TmsResult};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

/// Lifecycle of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed(String),
}

/// A queryable job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: Uuid,
    pub layer: LayerId,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type JobFn = Box<dyn FnOnce() -> TmsResult<()> + Send + 'static>;

struct QueuedJob {
    id: Uuid,
    work: JobFn,
}

/// Handle for submitting jobs and polling their status.
///
/// Cloneable; all clones share the worker and the status map. Dropping
/// every handle closes the channel and lets the worker drain and exit.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    statuses: Arc<RwLock<HashMap<Uuid, JobInfo>>>,
}

impl JobQueue {
    /// Starts the worker task on the current tokio runtime.
    pub fn start() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedJob>();
        let statuses: Arc<RwLock<HashMap<Uuid, JobInfo>>> = Arc::new(RwLock::new(HashMap::new()));

        let worker_statuses = Arc::clone(&statuses);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                set_status(&worker_statuses, job.id, JobStatus::Running);
                info!(job_id = %job.id, "job started");

                let outcome = tokio::task::spawn_blocking(job.work).await;
                let status = match outcome {
                    Ok(Ok(())) => JobStatus::Completed,
                    Ok(Err(err)) => {
                        error!(job_id = %job.id, %err, "job failed");
                        JobStatus::Failed(err.to_string())
                    }
                    Err(join_err) => {
                        error!(job_id = %job.id, %join_err, "job panicked");
                        JobStatus::Failed(format!("job panicked: {join_err}"))
                    }
                };
                info!(job_id = %job.id, ?status, "job finished");
                set_status(&worker_statuses, job.id, status);
            }
        });

        Self { tx, statuses }
    }

    /// Queues a job, assigning and returning its id immediately.
    pub fn submit<F>(&self, layer: LayerId, work: F) -> Uuid
    where
        F: FnOnce() -> TmsResult<()> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let now = Utc::now();
        if let Ok(mut statuses) = self.statuses.write() {
            statuses.insert(
                id,
                JobInfo {
                    id,
                    layer,
                    status: JobStatus::Queued,
                    submitted_at: now,
                    updated_at: now,
                },
            );
        }

        // A send failure means the worker is gone; record it rather than
        // leaving the job Queued forever.
        if self
            .tx
            .send(QueuedJob {
                id,
                work: Box::new(work),
            })
            .is_err()
        {
            set_status(
                &self.statuses,
                id,
                JobStatus::Failed("queue worker unavailable".to_string()),
            );
        }
        id
    }

    pub fn status(&self, id: Uuid) -> Option<JobInfo> {
        self.statuses.read().ok()?.get(&id).cloned()
    }
}

fn set_status(statuses: &Arc<RwLock<HashMap<Uuid, JobInfo>>>, id: Uuid, status: JobStatus) {
    if let Ok(mut map) = statuses.write() {
        if let Some(info) = map.get_mut(&id) {
            info.status = status;
            info.updated_at = Utc::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tms_common::TmsError;

    async fn wait_for_terminal(queue: &JobQueue, id: Uuid) -> JobStatus {
        for _ in 0..200 {
            if let Some(info) = queue.status(id) {
                match info.status {
                    JobStatus::Completed | JobStatus::Failed(_) => return info.status,
                    _ => {}
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_submit_returns_immediately_with_queued_status() {
        let queue = JobQueue::start();
        let id = queue.submit(LayerId::new("slow"), || {
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        });

        let info = queue.status(id).unwrap();
        assert!(matches!(
            info.status,
            JobStatus::Queued | JobStatus::Running
        ));
        assert_eq!(wait_for_terminal(&queue, id).await, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_failure_records_reason() {
        let queue = JobQueue::start();
        let id = queue.submit(LayerId::new("bad"), || {
            Err(TmsError::InvalidSource("not a raster".to_string()))
        });

        match wait_for_terminal(&queue, id).await {
            JobStatus::Failed(reason) => assert!(reason.contains("not a raster")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_jobs_run_sequentially() {
        let queue = JobQueue::start();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for n in 0..3 {
            let order = Arc::clone(&order);
            ids.push(queue.submit(LayerId::new(format!("job-{n}")), move || {
                order.lock().map(|mut v| v.push(n)).ok();
                std::thread::sleep(Duration::from_millis(20));
                Ok(())
            }));
        }
        for id in ids {
            wait_for_terminal(&queue, id).await;
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_job_id_is_none() {
        let queue = JobQueue::start();
        assert!(queue.status(Uuid::new_v4()).is_none());
    }
}
