//! Question intake
//!
//! The router hands new questions to a bounded queue and returns at once.
//! A pool task drains the queue, storing at most `workers` questions at a time
//! and confirming each one to its author.

use std::sync::Arc;
use std::time::Duration;

use teloxide::types::ChatId;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::context::UpdateContext;
use super::ports::{Messenger, QuestionStore};
use crate::core::error::{AppError, AppResult};

/// Confirmation sent after a question is stored
pub const RECEIVED_TEXT: &str = "Я получил ваше сообщение и отправил его аналитикам";

/// A question waiting to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionJob {
    pub user_id: i64,
    pub chat_id: ChatId,
    pub text: String,
}

/// Pool sizing and per-job time limit
#[derive(Debug, Clone, Copy)]
pub struct IntakeConfig {
    pub workers: usize,
    pub capacity: usize,
    pub job_timeout: Duration,
}

/// Submission side of the question pool; cheap to clone
#[derive(Clone)]
pub struct QuestionIntake {
    tx: mpsc::Sender<QuestionJob>,
}

impl QuestionIntake {
    /// Spawns the pool task and returns the submission handle.
    ///
    /// The pool stops taking new work when `shutdown` fires, finishes what is
    /// already buffered, then the returned task completes.
    pub fn start(
        questions: Arc<dyn QuestionStore>,
        messenger: Arc<dyn Messenger>,
        config: IntakeConfig,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let handle = tokio::spawn(run_pool(rx, questions, messenger, config, shutdown));
        (Self { tx }, handle)
    }

    /// Queues a question without waiting for it to be stored.
    ///
    /// Fails with `QueueFull` when the buffer is saturated and with
    /// `Cancelled` once the pool has shut down.
    pub fn submit(&self, job: QuestionJob) -> AppResult<()> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AppError::Cancelled,
        })
    }
}

async fn run_pool(
    mut rx: mpsc::Receiver<QuestionJob>,
    questions: Arc<dyn QuestionStore>,
    messenger: Arc<dyn Messenger>,
    config: IntakeConfig,
    shutdown: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let mut running = tokio::task::JoinSet::new();

    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => {
                rx.close();
                match rx.recv().await {
                    Some(job) => job,
                    None => break,
                }
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(p) => p,
            Err(e) => {
                log::error!("Question pool semaphore closed, dropping question from {}: {}", job.user_id, e);
                continue;
            }
        };
        let questions = Arc::clone(&questions);
        let messenger = Arc::clone(&messenger);
        running.spawn(async move {
            let _permit = permit;
            store_question(questions.as_ref(), messenger.as_ref(), job, config.job_timeout).await;
        });

        // Reap finished jobs so the set does not grow with uptime
        while running.try_join_next().is_some() {}
    }

    while running.join_next().await.is_some() {}
    log::info!("Question intake stopped");
}

async fn store_question(questions: &dyn QuestionStore, messenger: &dyn Messenger, job: QuestionJob, timeout: Duration) {
    let cx = UpdateContext::detached(timeout);

    if let Err(e) = cx.bounded(questions.insert(job.user_id, &job.text)).await {
        log::error!("Failed to insert question from user {}: {}", job.user_id, e);
        return;
    }

    if let Err(e) = cx.bounded(messenger.send_message(job.chat_id, None, RECEIVED_TEXT)).await {
        log::error!("Failed to confirm question to user {}: {}", job.user_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryQuestionStore, RecordingMessenger};

    fn config(workers: usize, capacity: usize) -> IntakeConfig {
        IntakeConfig {
            workers,
            capacity,
            job_timeout: Duration::from_secs(5),
        }
    }

    fn job(user_id: i64, text: &str) -> QuestionJob {
        QuestionJob {
            user_id,
            chat_id: ChatId(user_id),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submitted_question_is_stored_and_confirmed() {
        let store = Arc::new(MemoryQuestionStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let shutdown = CancellationToken::new();
        let (intake, handle) = QuestionIntake::start(store.clone(), messenger.clone(), config(2, 8), shutdown.clone());

        intake.submit(job(42, "Hello analysts")).unwrap();
        let rows = store.wait_for(1).await;

        assert_eq!(rows[0].user_id, 42);
        assert_eq!(rows[0].text, "Hello analysts");

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(messenger.sent_texts(), vec![RECEIVED_TEXT.to_string()]);
    }

    #[tokio::test]
    async fn test_failed_insert_sends_no_confirmation() {
        let store = Arc::new(MemoryQuestionStore::new());
        store.fail_inserts(true);
        let messenger = Arc::new(RecordingMessenger::new());
        let shutdown = CancellationToken::new();
        let (intake, handle) = QuestionIntake::start(store.clone(), messenger.clone(), config(1, 8), shutdown.clone());

        intake.submit(job(42, "lost")).unwrap();
        shutdown.cancel();
        handle.await.unwrap();

        assert!(store.rows().is_empty());
        assert!(messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_questions_are_drained_on_shutdown() {
        let store = Arc::new(MemoryQuestionStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let shutdown = CancellationToken::new();
        let (intake, handle) = QuestionIntake::start(store.clone(), messenger, config(2, 16), shutdown.clone());

        for i in 0..10 {
            intake.submit(job(i, &format!("question {}", i))).unwrap();
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(store.rows().len(), 10);
        assert!(matches!(intake.submit(job(1, "late")), Err(AppError::Cancelled)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_rejects_without_blocking() {
        let store = Arc::new(MemoryQuestionStore::new());
        let messenger = Arc::new(RecordingMessenger::new());
        let (intake, _handle) = QuestionIntake::start(store, messenger, config(1, 1), CancellationToken::new());

        // The pool task has not been polled yet on this single-threaded runtime
        intake.submit(job(1, "first")).unwrap();
        let second = intake.submit(job(2, "second"));

        assert!(matches!(second, Err(AppError::QueueFull)));
    }
}
