//! Background conversion for interactive sessions.
//!
//! The worker owns the [`Controller`]. Changes arrive over an mpsc channel
//! and each one bumps the requested generation. Conversions run on the
//! blocking pool; changes that arrive while a conversion is in flight are
//! batched into the next run, and a finished run is only published if no
//! newer change is waiting. Commits are answered once the latest generation
//! has finished converting.

use std::sync::Arc;

use image_processor::{Algorithm, Controller, PackedBitmap, Parameters, Preview, ProcessError};
use tokio::sync::{mpsc, oneshot, watch};

/// Maximum number of queued requests.
const QUEUE_CAPACITY: usize = 64;

/// A single user edit.
#[derive(Debug, Clone)]
pub enum Change {
    /// Decode and load an encoded image.
    LoadImage(Arc<Vec<u8>>),
    /// Select an algorithm, resetting threshold and energy.
    Algorithm(Algorithm),
    Threshold(i64),
    Energy(i64),
    Rotate(bool),
    TransparentAsWhite(bool),
    Flip(bool),
    /// Append transparent rows.
    Expand(u32),
    Reset,
}

/// What the worker currently shows.
#[derive(Debug, Clone)]
pub enum Published {
    /// Nothing loaded.
    Empty { generation: u64 },
    Ready {
        generation: u64,
        preview: Arc<Preview>,
    },
    Failed { generation: u64, message: String },
}

impl Published {
    pub fn generation(&self) -> u64 {
        match self {
            Published::Empty { generation }
            | Published::Ready { generation, .. }
            | Published::Failed { generation, .. } => *generation,
        }
    }
}

/// A committed job: the packed bitmap and the parameters it was made with.
#[derive(Debug, Clone)]
pub struct Committed {
    pub bitmap: PackedBitmap,
    pub params: Parameters,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Preview worker has stopped")]
    Closed,
    #[error("Latest conversion failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

enum Request {
    Change(Change),
    Commit(oneshot::Sender<Result<Committed, WorkerError>>),
}

/// Handle to a running preview worker.
#[derive(Clone)]
pub struct PreviewWorker {
    tx: mpsc::Sender<Request>,
    published: watch::Receiver<Published>,
}

impl PreviewWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(controller: Controller) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let (publish_tx, published) = watch::channel(Published::Empty { generation: 0 });
        tokio::spawn(worker_loop(controller, rx, publish_tx));
        tracing::info!("Preview worker started (capacity={QUEUE_CAPACITY})");
        Self { tx, published }
    }

    /// Queue a change.
    pub async fn send(&self, change: Change) -> Result<(), WorkerError> {
        self.tx
            .send(Request::Change(change))
            .await
            .map_err(|_| WorkerError::Closed)
    }

    /// Pack the latest conversion once every queued change has been applied.
    pub async fn commit(&self) -> Result<Committed, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request::Commit(reply_tx))
            .await
            .map_err(|_| WorkerError::Closed)?;
        reply_rx.await.map_err(|_| WorkerError::Closed)?
    }

    /// Receiver that observes every published preview.
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.published.clone()
    }

    /// The most recently published state.
    pub fn latest(&self) -> Published {
        self.published.borrow().clone()
    }
}

async fn worker_loop(
    mut controller: Controller,
    mut rx: mpsc::Receiver<Request>,
    publish: watch::Sender<Published>,
) {
    let mut requested = 0u64;
    let mut pending: Vec<Change> = Vec::new();
    let mut commits: Vec<oneshot::Sender<Result<Committed, WorkerError>>> = Vec::new();
    let mut failure: Option<String> = None;

    loop {
        if pending.is_empty() {
            // Idle: everything requested so far has been converted
            for reply in commits.drain(..) {
                let _ = reply.send(commit_current(&controller, failure.as_deref()));
            }
            match rx.recv().await {
                Some(req) => accept(req, &mut requested, &mut pending, &mut commits),
                None => break,
            }
            continue;
        }

        let job_generation = requested;
        let changes = coalesce(std::mem::take(&mut pending));
        tracing::debug!(
            generation = job_generation,
            changes = changes.len(),
            "Converting"
        );
        let mut job = tokio::task::spawn_blocking(move || {
            let result = apply(&mut controller, changes);
            (controller, result)
        });

        let mut closed = false;
        let joined = loop {
            tokio::select! {
                joined = &mut job => break joined,
                req = rx.recv(), if !closed => match req {
                    Some(req) => accept(req, &mut requested, &mut pending, &mut commits),
                    None => closed = true,
                },
            }
        };

        let (returned, result) = match joined {
            Ok(out) => out,
            Err(e) => {
                tracing::error!("Conversion task failed: {e}");
                for reply in commits.drain(..) {
                    let _ = reply.send(Err(WorkerError::Closed));
                }
                return;
            }
        };
        controller = returned;

        let superseded = !pending.is_empty();
        match result {
            Ok(_) if superseded => {
                tracing::debug!(generation = job_generation, "Discarding superseded preview");
            }
            Ok(preview) => {
                failure = None;
                let state = match preview {
                    Some(preview) => Published::Ready {
                        generation: job_generation,
                        preview: Arc::new(preview),
                    },
                    None => Published::Empty {
                        generation: job_generation,
                    },
                };
                publish.send_replace(state);
            }
            Err(e) if superseded => {
                tracing::warn!(generation = job_generation, "Conversion failed: {e}");
            }
            Err(e) => {
                tracing::warn!(generation = job_generation, "Conversion failed: {e}");
                failure = Some(e.to_string());
                publish.send_replace(Published::Failed {
                    generation: job_generation,
                    message: e.to_string(),
                });
            }
        }

        if closed && pending.is_empty() {
            for reply in commits.drain(..) {
                let _ = reply.send(commit_current(&controller, failure.as_deref()));
            }
            break;
        }
    }
    tracing::info!("Preview worker stopped");
}

fn accept(
    req: Request,
    requested: &mut u64,
    pending: &mut Vec<Change>,
    commits: &mut Vec<oneshot::Sender<Result<Committed, WorkerError>>>,
) {
    match req {
        Request::Change(change) => {
            *requested += 1;
            pending.push(change);
        }
        Request::Commit(reply) => commits.push(reply),
    }
}

fn commit_current(controller: &Controller, failure: Option<&str>) -> Result<Committed, WorkerError> {
    if let Some(message) = failure {
        return Err(WorkerError::Failed(message.to_string()));
    }
    Ok(Committed {
        bitmap: controller.commit()?,
        params: *controller.params(),
    })
}

/// Drop parameter edits that a later edit of the same field overrides.
fn coalesce(changes: Vec<Change>) -> Vec<Change> {
    let mut out: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes {
        let replaces_last = matches!(
            (out.last(), &change),
            (Some(Change::Threshold(_)), Change::Threshold(_))
                | (Some(Change::Energy(_)), Change::Energy(_))
                | (Some(Change::Rotate(_)), Change::Rotate(_))
                | (Some(Change::TransparentAsWhite(_)), Change::TransparentAsWhite(_))
                | (Some(Change::Flip(_)), Change::Flip(_))
        );
        if replaces_last {
            out.pop();
        }
        out.push(change);
    }
    out
}

/// Apply a batch of changes, converting once for all parameter edits.
///
/// A failing change does not stop the batch: later changes are still
/// applied, and the batch reports the outcome of its last step, as if every
/// change had been converted on its own.
fn apply(controller: &mut Controller, changes: Vec<Change>) -> Result<Option<Preview>, ProcessError> {
    let mut params = *controller.params();
    let mut dirty = false;
    let mut outcome: Result<(), ProcessError> = Ok(());

    for change in changes {
        match change {
            Change::Algorithm(a) => params = params.using_algorithm(a),
            Change::Threshold(v) => params = params.with_threshold(v),
            Change::Energy(v) => params = params.with_energy(v),
            Change::Rotate(v) => params = params.with_rotate(v),
            Change::TransparentAsWhite(v) => params = params.with_transparent_as_white(v),
            Change::Flip(v) => params = params.with_flip(v),
            Change::LoadImage(bytes) => {
                if dirty {
                    settle(&mut outcome, controller.set_params(params).map(drop));
                }
                settle(&mut outcome, controller.load_image(&bytes).map(drop));
                params = *controller.params();
                dirty = false;
                continue;
            }
            Change::Expand(rows) => {
                if dirty {
                    settle(&mut outcome, controller.set_params(params).map(drop));
                }
                settle(&mut outcome, controller.expand(rows).map(drop));
                params = *controller.params();
                dirty = false;
                continue;
            }
            Change::Reset => {
                // Pending edits outlive the reset
                controller.reset();
                params = params.with_target_height(controller.params().target_height);
                outcome = Ok(());
                continue;
            }
        }
        dirty = true;
    }

    if dirty {
        settle(&mut outcome, controller.set_params(params).map(drop));
    }
    outcome?;
    Ok(controller.preview().cloned())
}

/// Record the result of one step; a later success clears an earlier failure.
fn settle(outcome: &mut Result<(), ProcessError>, step: Result<(), ProcessError>) {
    if let Err(e) = &step {
        tracing::warn!("Change failed: {e}");
    }
    *outcome = step;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn gradient_png() -> Arc<Vec<u8>> {
        png(64, 4)
    }

    fn png(width: u32, height: u32) -> Arc<Vec<u8>> {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        Arc::new(bytes)
    }

    fn worker() -> PreviewWorker {
        PreviewWorker::spawn(Controller::new(64, Parameters::new()).unwrap())
    }

    #[tokio::test]
    async fn test_commit_without_content_fails() {
        let w = worker();
        assert!(matches!(
            w.commit().await,
            Err(WorkerError::Process(ProcessError::NothingToPrint))
        ));
    }

    #[tokio::test]
    async fn test_commit_reflects_every_queued_change() {
        let w = worker();
        w.send(Change::LoadImage(gradient_png())).await.unwrap();
        w.send(Change::Algorithm(Algorithm::Direct)).await.unwrap();
        for t in [10, 200, 50, 128] {
            w.send(Change::Threshold(t)).await.unwrap();
        }
        let committed = w.commit().await.unwrap();
        assert_eq!(committed.params.algorithm, Algorithm::Direct);
        assert_eq!(committed.params.threshold, 128);

        // Same result as a one-shot conversion with the final parameters
        let mut ctl = Controller::new(64, committed.params).unwrap();
        ctl.load_image(&gradient_png()).unwrap();
        ctl.set_params(committed.params).unwrap();
        assert_eq!(committed.bitmap, ctl.commit().unwrap());
    }

    #[tokio::test]
    async fn test_published_generation_is_latest() {
        let w = worker();
        w.send(Change::LoadImage(gradient_png())).await.unwrap();
        w.send(Change::Energy(200)).await.unwrap();
        w.send(Change::Rotate(true)).await.unwrap();
        w.commit().await.unwrap();

        match w.latest() {
            Published::Ready { generation, preview } => {
                assert_eq!(generation, 3);
                assert_eq!(preview.mono.dimensions(), (64, 1024));
            }
            other => panic!("expected a ready preview, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_load_blocks_commit_until_fixed() {
        let w = worker();
        w.send(Change::LoadImage(Arc::new(b"garbage".to_vec())))
            .await
            .unwrap();
        assert!(matches!(w.commit().await, Err(WorkerError::Failed(_))));
        assert!(matches!(w.latest(), Published::Failed { .. }));

        w.send(Change::LoadImage(gradient_png())).await.unwrap();
        assert!(w.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_edit_after_failed_load_survives() {
        let w = worker();
        // A slow first conversion lets the next changes pile up in one batch
        w.send(Change::LoadImage(png(1600, 1200))).await.unwrap();
        w.send(Change::LoadImage(Arc::new(b"garbage".to_vec())))
            .await
            .unwrap();
        w.send(Change::Threshold(5)).await.unwrap();
        let committed = w.commit().await.unwrap();
        assert_eq!(committed.params.threshold, 5);

        w.send(Change::LoadImage(gradient_png())).await.unwrap();
        let committed = w.commit().await.unwrap();
        assert_eq!(committed.params.threshold, 5);
        assert_eq!(committed.bitmap.height(), 4);
    }

    #[test]
    fn test_batch_continues_past_failing_change() {
        let mut ctl = Controller::new(64, Parameters::new()).unwrap();
        let out = apply(
            &mut ctl,
            vec![
                Change::LoadImage(gradient_png()),
                Change::LoadImage(Arc::new(b"garbage".to_vec())),
                Change::Threshold(5),
                Change::Energy(7),
            ],
        );
        let preview = out.unwrap().unwrap();
        assert_eq!(preview.generation, ctl.generation());
        assert_eq!(ctl.params().threshold, 5);
        assert_eq!(ctl.params().energy, 7);
    }

    #[test]
    fn test_batch_ending_in_failure_reports_it() {
        let mut ctl = Controller::new(64, Parameters::new()).unwrap();
        let out = apply(
            &mut ctl,
            vec![
                Change::Threshold(5),
                Change::LoadImage(Arc::new(b"garbage".to_vec())),
            ],
        );
        assert!(matches!(out, Err(ProcessError::Decode(_))));
        assert_eq!(ctl.params().threshold, 5);
    }

    #[test]
    fn test_edits_before_reset_are_kept() {
        let mut ctl = Controller::new(64, Parameters::new()).unwrap();
        let out = apply(
            &mut ctl,
            vec![
                Change::LoadImage(gradient_png()),
                Change::Threshold(5),
                Change::Reset,
            ],
        );
        assert!(out.unwrap().is_none());
        assert!(!ctl.has_content());
        assert_eq!(ctl.params().threshold, 5);
    }

    #[tokio::test]
    async fn test_reset_publishes_empty() {
        let w = worker();
        w.send(Change::LoadImage(gradient_png())).await.unwrap();
        w.send(Change::Reset).await.unwrap();
        assert!(w.commit().await.is_err());
        assert!(matches!(w.latest(), Published::Empty { generation: 2 }));
    }

    #[test]
    fn test_coalesce_keeps_last_edit_per_run() {
        let out = coalesce(vec![
            Change::Threshold(1),
            Change::Threshold(2),
            Change::Energy(5),
            Change::Threshold(3),
        ]);
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Change::Threshold(2)));
        assert!(matches!(out[2], Change::Threshold(3)));
    }
}
