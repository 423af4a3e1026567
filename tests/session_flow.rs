use std::sync::Arc;
use std::time::Duration;

use bloodlines::config::AnimationTiming;
use bloodlines::error::TransitionError;
use bloodlines::session::{Phase, SessionController};
use bloodlines::source::{FileSource, StaticSource};
use bloodlines::SeededEntropy;

const TEXT: &str = "paid,conflict_name,start_date,peace_date,end_date
11,Alpha,1990-01-01,1992-01-01,1995-01-01
12,Beta,1980-05-01,1981-05-01,1981-06-01
13,Gamma,1970-01-01,1970-01-01,1974-01-01
";

async fn wait_until_ready(ctl: &SessionController) {
    let mut rx = ctl.subscribe();
    while rx.borrow_and_update().phase == Phase::Loading {
        rx.changed().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn startup_loads_selects_first_and_arms() {
    let ctl = SessionController::new(AnimationTiming::default());
    assert_eq!(ctl.snapshot().await.phase, Phase::Loading);

    ctl.start(
        Arc::new(StaticSource::new("inline", TEXT)),
        8,
        Box::new(SeededEntropy::new(Some(42))),
    )
    .unwrap();
    wait_until_ready(&ctl).await;

    let s = ctl.snapshot().await;
    assert_eq!(s.sample_set.len(), 3);
    assert_eq!(s.selected, Some(0));
    assert!(!s.load_failed);
    assert!(!s.animation_armed);

    tokio::time::sleep(Duration::from_millis(501)).await;
    assert!(ctl.snapshot().await.animation_armed);
}

#[tokio::test(start_paused = true)]
async fn every_selection_ends_armed() {
    let ctl = SessionController::new(AnimationTiming::default());
    ctl.start(
        Arc::new(StaticSource::new("inline", TEXT)),
        8,
        Box::new(SeededEntropy::new(Some(42))),
    )
    .unwrap();
    wait_until_ready(&ctl).await;

    for index in [2, 1, 1, 0] {
        ctl.select(index).await.unwrap();
        let s = ctl.snapshot().await;
        assert_eq!(s.selected, Some(index));
        assert!(!s.animation_armed);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(ctl.snapshot().await.animation_armed);
    }

    assert_eq!(
        ctl.select(3).await,
        Err(TransitionError::UnknownConflict { index: 3, len: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn unreadable_source_degrades_to_fallback() {
    let ctl = SessionController::new(AnimationTiming::default());
    ctl.start(
        Arc::new(FileSource::new("no/such/episodes.csv")),
        8,
        Box::new(SeededEntropy::new(None)),
    )
    .unwrap()
    .await
    .unwrap();

    let s = ctl.snapshot().await;
    assert_eq!(s.phase, Phase::Ready);
    assert!(s.load_failed);
    assert!(s.error.is_some());
    assert_eq!(s.selected_conflict().unwrap().name, "Colombian Civil War");
    ctl.select(1).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn header_only_dataset_has_no_data() {
    let ctl = SessionController::new(AnimationTiming::default());
    ctl.start(
        Arc::new(StaticSource::new("inline", "paid,conflict_name,start_date,peace_date,end_date\n")),
        8,
        Box::new(SeededEntropy::new(Some(1))),
    )
    .unwrap()
    .await
    .unwrap();

    let s = ctl.snapshot().await;
    assert_eq!(s.phase, Phase::NoData);
    assert!(s.selected.is_none());
    assert!(!s.load_failed);
    assert_eq!(ctl.select(0).await, Err(TransitionError::NoData));
}
