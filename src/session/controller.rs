use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use super::state::{apply_event, ArmTimer, SelectionState, SessionEvent};
use crate::config::AnimationTiming;
use crate::data::conflict::Entropy;
use crate::data::ingest::{load, IngestOutcome};
use crate::error::TransitionError;
use crate::logging::{log_rejected_transition, log_transition};
use crate::source::DataSource;

/// Owns the session state. Every accepted transition is published on a watch
/// channel, so observers see the disarm/arm edge of a reselection.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SelectionState>>,
    updates: Arc<watch::Sender<SelectionState>>,
    pending_arm: Arc<Mutex<Option<JoinHandle<()>>>>,
    started: Arc<AtomicBool>,
    timing: AnimationTiming,
}

impl SessionController {
    pub fn new(timing: AnimationTiming) -> Self {
        let (tx, _rx) = watch::channel(SelectionState::new());
        Self {
            state: Arc::new(Mutex::new(SelectionState::new())),
            updates: Arc::new(tx),
            pending_arm: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            timing,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SelectionState {
        self.state.lock().await.clone()
    }

    /// Spawn the single ingestion for this session. Not cancellable; a second
    /// call is rejected before anything is fetched.
    pub fn start(
        &self,
        source: Arc<dyn DataSource + Send + Sync>,
        sample_size: usize,
        mut entropy: Box<dyn Entropy + Send>,
    ) -> Result<JoinHandle<()>, TransitionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            let err = TransitionError::AlreadyStarted;
            log_rejected_transition("start", &err.to_string());
            return Err(err);
        }
        let controller = self.clone();
        Ok(tokio::spawn(async move {
            let outcome = load(source.as_ref(), sample_size, entropy.as_mut()).await;
            if let Err(err) = controller.complete_ingestion(outcome).await {
                log_rejected_transition("ingest_completed", &err.to_string());
            }
        }))
    }

    pub async fn complete_ingestion(&self, outcome: IngestOutcome) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::IngestCompleted(outcome)).await
    }

    /// Select a conflict by its position in the sample set and replay the
    /// entrance animation.
    pub async fn select(&self, index: usize) -> Result<(), TransitionError> {
        self.dispatch(SessionEvent::Select(index)).await
    }

    async fn dispatch(&self, event: SessionEvent) -> Result<(), TransitionError> {
        let name = event.name();
        let arm = {
            let mut state = self.state.lock().await;
            let from = state.phase;
            let arm = match apply_event(&mut state, event) {
                Ok(arm) => arm,
                Err(err) => {
                    log_rejected_transition(name, &err.to_string());
                    return Err(err);
                }
            };
            log_transition(
                name,
                from.as_str(),
                state.phase.as_str(),
                state.selected_conflict().map(|c| c.name.as_str()),
                state.animation_armed,
            );
            self.updates.send_replace(state.clone());
            arm
        };

        if let Some(arm) = arm {
            self.schedule_arm(arm).await;
        }
        Ok(())
    }

    /// Arming only ever sets the flag, so a superseded timer is harmless; it is
    /// still aborted so the newest selection owns the next edge.
    async fn schedule_arm(&self, which: ArmTimer) {
        let delay = match which {
            ArmTimer::AfterLoad => self.timing.after_load,
            ArmTimer::AfterSelect => self.timing.after_select,
        };
        let state = Arc::clone(&self.state);
        let updates = Arc::clone(&self.updates);

        let mut pending = self.pending_arm.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            let mut state = state.lock().await;
            if apply_event(&mut state, SessionEvent::ArmAnimation).is_ok() && state.animation_armed {
                log_transition(
                    "arm_animation",
                    state.phase.as_str(),
                    state.phase.as_str(),
                    state.selected_conflict().map(|c| c.name.as_str()),
                    true,
                );
                updates.send_replace(state.clone());
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::conflict::testing::ScriptedEntropy;
    use crate::data::conflict::fallback_conflicts;
    use crate::session::state::Phase;
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn outcome() -> IngestOutcome {
        IngestOutcome {
            sample: fallback_conflicts(),
            failed: false,
            error: None,
            report: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn load_arms_after_delay() {
        let ctl = SessionController::new(AnimationTiming::default());
        ctl.complete_ingestion(outcome()).await.unwrap();
        let s = ctl.snapshot().await;
        assert_eq!(s.phase, Phase::Ready);
        assert!(!s.animation_armed);

        time::sleep(Duration::from_millis(400)).await;
        assert!(!ctl.snapshot().await.animation_armed);
        time::sleep(Duration::from_millis(200)).await;
        assert!(ctl.snapshot().await.animation_armed);
    }

    #[tokio::test(start_paused = true)]
    async fn reselection_publishes_disarm_then_arm() {
        let ctl = SessionController::new(AnimationTiming::default());
        ctl.complete_ingestion(outcome()).await.unwrap();
        time::sleep(Duration::from_millis(600)).await;

        let mut rx = ctl.subscribe();
        rx.borrow_and_update();
        ctl.select(1).await.unwrap();

        rx.changed().await.unwrap();
        {
            let seen = rx.borrow_and_update();
            assert_eq!(seen.selected, Some(1));
            assert!(!seen.animation_armed);
        }
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().animation_armed);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_reselection_still_ends_armed() {
        let ctl = SessionController::new(AnimationTiming::default());
        ctl.complete_ingestion(outcome()).await.unwrap();
        ctl.select(1).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        ctl.select(0).await.unwrap();
        assert!(!ctl.snapshot().await.animation_armed);
        time::sleep(Duration::from_millis(150)).await;
        let s = ctl.snapshot().await;
        assert!(s.animation_armed);
        assert_eq!(s.selected, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn bad_selection_is_rejected() {
        let ctl = SessionController::new(AnimationTiming::default());
        assert_eq!(ctl.select(0).await, Err(TransitionError::NotReady));
        ctl.complete_ingestion(outcome()).await.unwrap();
        assert_eq!(
            ctl.select(9).await,
            Err(TransitionError::UnknownConflict { index: 9, len: 2 })
        );
        assert_eq!(ctl.snapshot().await.selected, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_the_pipeline_once() {
        let ctl = SessionController::new(AnimationTiming::default());
        let text = "conflict_name,start_date,peace_date,end_date\nX,1990-01-01,1991-01-01,1992-01-01\n";
        let source = Arc::new(StaticSource::new("inline", text));
        ctl.start(source, 8, Box::new(ScriptedEntropy::default()))
            .unwrap()
            .await
            .unwrap();

        let s = ctl.snapshot().await;
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(s.sample_set.len(), 1);
        assert!(!s.load_failed);
        assert_eq!(ctl.complete_ingestion(outcome()).await, Err(TransitionError::AlreadyLoaded));
    }

    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn fetch_text(&self) -> anyhow::Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok("conflict_name,start_date,peace_date,end_date\nX,1990-01-01,1991-01-01,1992-01-01\n".to_string())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_without_fetching() {
        let ctl = SessionController::new(AnimationTiming::default());
        let source = Arc::new(CountingSource { fetches: AtomicUsize::new(0) });

        let first = ctl
            .start(source.clone(), 8, Box::new(ScriptedEntropy::default()))
            .unwrap();
        let second = ctl.start(source.clone(), 8, Box::new(ScriptedEntropy::default()));
        assert_eq!(second.err(), Some(TransitionError::AlreadyStarted));

        first.await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(ctl.snapshot().await.phase, Phase::Ready);
        assert!(ctl.clone().start(source.clone(), 8, Box::new(ScriptedEntropy::default())).is_err());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
