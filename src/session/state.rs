use serde::{Deserialize, Serialize};

use crate::data::conflict::Conflict;
use crate::data::ingest::IngestOutcome;
use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Loading,
    Ready,
    /// Ingestion finished with nothing to show.
    NoData,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::NoData => "no_data",
        }
    }
}

/// Everything the screen needs. Owned by the controller, observed by renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub phase: Phase,
    pub sample_set: Vec<Conflict>,
    /// Index into `sample_set`.
    pub selected: Option<usize>,
    pub animation_armed: bool,
    /// Set when the fallback dataset is on display; `error` says why.
    pub load_failed: bool,
    pub error: Option<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_conflict(&self) -> Option<&Conflict> {
        self.selected.and_then(|i| self.sample_set.get(i))
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    IngestCompleted(IngestOutcome),
    Select(usize),
    ArmAnimation,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::IngestCompleted(_) => "ingest_completed",
            SessionEvent::Select(_) => "select",
            SessionEvent::ArmAnimation => "arm_animation",
        }
    }
}

/// Deferred arming the caller must schedule after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmTimer {
    AfterLoad,
    AfterSelect,
}

/// Apply one event. On error the state is left untouched.
pub fn apply_event(state: &mut SelectionState, event: SessionEvent) -> Result<Option<ArmTimer>, TransitionError> {
    match (state.phase, event) {
        (Phase::Loading, SessionEvent::IngestCompleted(outcome)) => {
            state.load_failed = outcome.failed;
            state.error = outcome.error;
            state.sample_set = outcome.sample;
            state.animation_armed = false;
            if state.sample_set.is_empty() {
                state.selected = None;
                state.phase = Phase::NoData;
                Ok(None)
            } else {
                state.selected = Some(0);
                state.phase = Phase::Ready;
                Ok(Some(ArmTimer::AfterLoad))
            }
        }
        (_, SessionEvent::IngestCompleted(_)) => Err(TransitionError::AlreadyLoaded),
        (Phase::Loading, SessionEvent::Select(_)) => Err(TransitionError::NotReady),
        (Phase::NoData, SessionEvent::Select(_)) => Err(TransitionError::NoData),
        (Phase::Ready, SessionEvent::Select(index)) => {
            let len = state.sample_set.len();
            if index >= len {
                return Err(TransitionError::UnknownConflict { index, len });
            }
            state.selected = Some(index);
            state.animation_armed = false;
            Ok(Some(ArmTimer::AfterSelect))
        }
        (Phase::Ready, SessionEvent::ArmAnimation) => {
            state.animation_armed = true;
            Ok(None)
        }
        (_, SessionEvent::ArmAnimation) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::conflict::fallback_conflicts;

    fn loaded(sample: Vec<Conflict>, failed: bool) -> IngestOutcome {
        IngestOutcome {
            sample,
            failed,
            error: failed.then(|| "Failed to load conflict data".to_string()),
            report: None,
        }
    }

    #[test]
    fn new_session_starts_loading_with_nothing_selected() {
        let s = SelectionState::new();
        assert_eq!(s.phase, Phase::Loading);
        assert!(s.selected.is_none());
        assert!(!s.animation_armed);
    }

    #[test]
    fn ingestion_selects_first_and_requests_arming() {
        let mut s = SelectionState::new();
        let arm = apply_event(&mut s, SessionEvent::IngestCompleted(loaded(fallback_conflicts(), false))).unwrap();
        assert_eq!(arm, Some(ArmTimer::AfterLoad));
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(s.selected_conflict().unwrap().name, "Colombian Civil War");
        assert!(!s.animation_armed);
        assert!(!s.load_failed);
    }

    #[test]
    fn fallback_outcome_marks_failure_but_stays_usable() {
        let mut s = SelectionState::new();
        apply_event(&mut s, SessionEvent::IngestCompleted(loaded(fallback_conflicts(), true))).unwrap();
        assert!(s.load_failed);
        assert!(s.error.is_some());
        assert_eq!(s.phase, Phase::Ready);
        assert!(apply_event(&mut s, SessionEvent::Select(1)).is_ok());
    }

    #[test]
    fn empty_sample_means_no_data() {
        let mut s = SelectionState::new();
        let arm = apply_event(&mut s, SessionEvent::IngestCompleted(loaded(Vec::new(), false))).unwrap();
        assert_eq!(arm, None);
        assert_eq!(s.phase, Phase::NoData);
        assert!(s.selected.is_none());
        assert_eq!(apply_event(&mut s, SessionEvent::Select(0)), Err(TransitionError::NoData));
    }

    #[test]
    fn selection_disarms_then_arming_restores() {
        let mut s = SelectionState::new();
        apply_event(&mut s, SessionEvent::IngestCompleted(loaded(fallback_conflicts(), false))).unwrap();
        apply_event(&mut s, SessionEvent::ArmAnimation).unwrap();
        assert!(s.animation_armed);

        let arm = apply_event(&mut s, SessionEvent::Select(1)).unwrap();
        assert_eq!(arm, Some(ArmTimer::AfterSelect));
        assert_eq!(s.selected, Some(1));
        assert!(!s.animation_armed);

        apply_event(&mut s, SessionEvent::ArmAnimation).unwrap();
        apply_event(&mut s, SessionEvent::ArmAnimation).unwrap();
        assert!(s.animation_armed);
    }

    #[test]
    fn reselecting_the_same_conflict_replays() {
        let mut s = SelectionState::new();
        apply_event(&mut s, SessionEvent::IngestCompleted(loaded(fallback_conflicts(), false))).unwrap();
        apply_event(&mut s, SessionEvent::ArmAnimation).unwrap();
        assert_eq!(apply_event(&mut s, SessionEvent::Select(0)).unwrap(), Some(ArmTimer::AfterSelect));
        assert!(!s.animation_armed);
    }

    #[test]
    fn invalid_transitions_leave_state_alone() {
        let mut s = SelectionState::new();
        assert_eq!(apply_event(&mut s, SessionEvent::Select(0)), Err(TransitionError::NotReady));
        apply_event(&mut s, SessionEvent::ArmAnimation).unwrap();
        assert!(!s.animation_armed);

        apply_event(&mut s, SessionEvent::IngestCompleted(loaded(fallback_conflicts(), false))).unwrap();
        let before = s.clone();
        assert_eq!(
            apply_event(&mut s, SessionEvent::Select(2)),
            Err(TransitionError::UnknownConflict { index: 2, len: 2 })
        );
        assert_eq!(
            apply_event(&mut s, SessionEvent::IngestCompleted(loaded(Vec::new(), false))),
            Err(TransitionError::AlreadyLoaded)
        );
        assert_eq!(s, before);
    }
}
