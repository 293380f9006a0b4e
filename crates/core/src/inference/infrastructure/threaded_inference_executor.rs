use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::inference::domain::emotion_classifier::EmotionClassifier;
use crate::inference::domain::inference_executor::{InferenceExecutor, InferenceOutcome};
use crate::shared::frame::Frame;

struct Job {
    generation: u64,
    face: Frame,
}

type CompletedSlot = Arc<Mutex<Option<InferenceOutcome>>>;

/// What the worker does with a result whose crop was superseded while it
/// was being classified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SupersededResults {
    /// Drop it; only the newest submission's result is ever shown.
    #[default]
    Discard,
    /// Publish it anyway, so slow backends still refresh the label.
    Publish,
}

/// Runs classification on a dedicated worker thread.
///
/// Layout: `frame loop → [1-slot queue] → worker → [completed slot] → frame loop`
///
/// The queue holds at most one pending crop. Submitting while a crop is
/// still waiting replaces it, so the worker always starts on the newest
/// face. A crop already being classified runs to completion (the blocking
/// HTTP call cannot be interrupted). When a newer crop was submitted in the
/// meantime, its result is handled per [`SupersededResults`].
pub struct ThreadedInferenceExecutor {
    job_tx: Option<Sender<Job>>,
    /// Second handle on the queue, used to evict a stale pending job.
    evict_rx: Receiver<Job>,
    completed: CompletedSlot,
    latest_submitted: Arc<AtomicU64>,
    generation: u64,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedInferenceExecutor {
    pub fn new(classifier: Box<dyn EmotionClassifier>) -> Self {
        Self::with_policy(classifier, SupersededResults::default())
    }

    pub fn with_policy(classifier: Box<dyn EmotionClassifier>, policy: SupersededResults) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(1);
        let completed: CompletedSlot = Arc::new(Mutex::new(None));
        let latest_submitted = Arc::new(AtomicU64::new(0));
        let worker = spawn_worker(
            classifier,
            job_rx.clone(),
            completed.clone(),
            latest_submitted.clone(),
            policy,
        );

        Self {
            job_tx: Some(job_tx),
            evict_rx: job_rx,
            completed,
            latest_submitted,
            generation: 0,
            worker: Some(worker),
        }
    }
}

fn spawn_worker(
    mut classifier: Box<dyn EmotionClassifier>,
    job_rx: Receiver<Job>,
    completed: CompletedSlot,
    latest_submitted: Arc<AtomicU64>,
    policy: SupersededResults,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let result = classifier.classify(&job.face);

            let superseded = job.generation < latest_submitted.load(Ordering::Acquire);
            if superseded && policy == SupersededResults::Discard {
                log::debug!("Discarding superseded inference #{}", job.generation);
                continue;
            }

            let mut slot = match completed.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            *slot = Some(InferenceOutcome {
                generation: job.generation,
                result,
            });
        }
    })
}

impl InferenceExecutor for ThreadedInferenceExecutor {
    fn submit(&mut self, face: Frame) -> u64 {
        self.generation += 1;
        self.latest_submitted
            .store(self.generation, Ordering::Release);
        let Some(tx) = self.job_tx.as_ref() else {
            return self.generation;
        };

        let mut job = Job {
            generation: self.generation,
            face,
        };
        loop {
            match tx.try_send(job) {
                Ok(()) => break,
                Err(TrySendError::Full(rejected)) => {
                    if let Ok(stale) = self.evict_rx.try_recv() {
                        log::debug!("Dropping queued inference #{}", stale.generation);
                    }
                    job = rejected;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::warn!("Inference worker stopped; crop #{} dropped", self.generation);
                    break;
                }
            }
        }
        self.generation
    }

    fn take_completed(&mut self) -> Option<InferenceOutcome> {
        match self.completed.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl Drop for ThreadedInferenceExecutor {
    fn drop(&mut self) {
        // Closing the sender ends the worker loop once the pending job is drained.
        self.job_tx = None;
        while self.evict_rx.try_recv().is_ok() {}
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Inference worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::domain::emotion::Emotion;
    use crate::inference::domain::emotion_classifier::{Classification, InferenceError};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    /// Blocks each call until the test releases it, recording frame indices.
    struct GatedClassifier {
        gate: Receiver<()>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl EmotionClassifier for GatedClassifier {
        fn name(&self) -> &str {
            "gated"
        }

        fn classify(&mut self, face: &Frame) -> Result<Classification, InferenceError> {
            self.seen.lock().unwrap().push(face.index());
            let _ = self.gate.recv();
            Ok(Classification {
                emotion: Emotion::from_index(face.index()),
                score: 1.0,
                elapsed_secs: 0.0,
            })
        }
    }

    struct CountingClassifier {
        calls: Arc<AtomicUsize>,
    }

    impl EmotionClassifier for CountingClassifier {
        fn name(&self) -> &str {
            "counting"
        }

        fn classify(&mut self, _face: &Frame) -> Result<Classification, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Classification {
                emotion: Some(Emotion::Anger),
                score: 0.8,
                elapsed_secs: 0.0,
            })
        }
    }

    fn face(index: usize) -> Frame {
        Frame::new(vec![0u8; 12], 2, 2, 3, index)
    }

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(value) = poll() {
                return value;
            }
            assert!(Instant::now() < deadline, "timed out waiting for worker");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_outcome_published_from_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut executor = ThreadedInferenceExecutor::new(Box::new(CountingClassifier {
            calls: calls.clone(),
        }));

        let generation = executor.submit(face(0));
        let outcome = wait_for(|| executor.take_completed());

        assert_eq!(outcome.generation, generation);
        assert_eq!(outcome.result.unwrap().emotion, Some(Emotion::Anger));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_crop_is_replaced_by_newer_one() {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut executor = ThreadedInferenceExecutor::new(Box::new(GatedClassifier {
            gate: gate_rx,
            seen: seen.clone(),
        }));

        executor.submit(face(1));
        // Worker is now blocked inside classify for crop 1.
        wait_for(|| (seen.lock().unwrap().len() == 1).then_some(()));

        executor.submit(face(2)); // queued
        executor.submit(face(3)); // evicts 2

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();

        let latest = wait_for(|| {
            executor
                .take_completed()
                .filter(|outcome| outcome.generation == 3)
        });
        assert_eq!(latest.result.unwrap().emotion, Some(Emotion::Sadness));
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    /// Starts crop 1, queues crop 2, then lets crop 1 finish. Returns once
    /// the worker has moved on to crop 2, i.e. crop 1's result is settled.
    fn finish_first_while_second_queued(
        policy: SupersededResults,
    ) -> (ThreadedInferenceExecutor, Sender<()>) {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut executor = ThreadedInferenceExecutor::with_policy(
            Box::new(GatedClassifier {
                gate: gate_rx,
                seen: seen.clone(),
            }),
            policy,
        );

        executor.submit(face(1));
        wait_for(|| (seen.lock().unwrap().len() == 1).then_some(()));
        executor.submit(face(2));

        gate_tx.send(()).unwrap();
        wait_for(|| (seen.lock().unwrap().len() == 2).then_some(()));
        (executor, gate_tx)
    }

    #[test]
    fn test_result_superseded_by_queued_crop_is_discarded() {
        let (mut executor, gate_tx) = finish_first_while_second_queued(SupersededResults::Discard);

        assert!(executor.take_completed().is_none());

        gate_tx.send(()).unwrap();
        let outcome = wait_for(|| executor.take_completed());
        assert_eq!(outcome.generation, 2);
        assert_eq!(outcome.result.unwrap().emotion, Some(Emotion::Surprise));
    }

    #[test]
    fn test_publish_policy_keeps_superseded_result() {
        let (mut executor, gate_tx) = finish_first_while_second_queued(SupersededResults::Publish);

        let first = executor.take_completed().unwrap();
        assert_eq!(first.generation, 1);
        assert_eq!(first.result.unwrap().emotion, Some(Emotion::Happy));

        gate_tx.send(()).unwrap();
        assert_eq!(wait_for(|| executor.take_completed()).generation, 2);
    }

    #[test]
    fn test_default_policy_discards() {
        assert_eq!(SupersededResults::default(), SupersededResults::Discard);
    }

    #[test]
    fn test_drop_joins_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut executor = ThreadedInferenceExecutor::new(Box::new(CountingClassifier {
            calls: calls.clone(),
        }));
        executor.submit(face(0));
        drop(executor);
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }
}
