// src/prediction/prediction_loop/tests.rs

use super::*;
use crate::brush::BrushEngine;
use crate::classifier::FixedClassifier;
use crate::color::{Color, NamedColor};
use crate::config::DisplayMode;
use crate::display::HeadlessSurface;
use crate::grid::{CellCoords, Grid};
use crate::raster::InputTensor;
use crate::waker::NoOpWaker;
use std::sync::Mutex;
use std::thread;
use test_log::test;

fn peaked(class: usize, peak: f32) -> Vec<f32> {
    let mut dist = vec![(1.0 - peak) / 9.0; 10];
    dist[class] = peak;
    dist
}

fn config(policy: TickPolicy, mode: DisplayMode, timeout_ms: u64) -> Config {
    Config {
        tick_policy: policy,
        display_mode: mode,
        inference_timeout_ms: timeout_ms,
        ..Config::default()
    }
}

fn fixture(
    config: &Config,
    classifier: Arc<dyn Classifier>,
) -> (PredictionLoop, Session, HeadlessSurface) {
    let session = Session::from_config(config, Arc::clone(&classifier));
    let surface = HeadlessSurface::new(*session.grid(), Color::Named(NamedColor::White));
    let prediction_loop = PredictionLoop::new(config, classifier, Box::new(NoOpWaker)).unwrap();
    (prediction_loop, session, surface)
}

#[test]
fn sequential_tick_renders_argmax() {
    let config = config(TickPolicy::Sequential, DisplayMode::ArgmaxOnly, 2000);
    let classifier = Arc::new(FixedClassifier::new(peaked(7, 0.95)));
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier);

    let outcome = prediction_loop.on_tick(&session, &mut surface).unwrap();
    assert!(matches!(outcome, TickOutcome::Completed(Ok(ref r)) if r.class() == 7));
    assert_eq!(surface.prediction(), &["Predicted: 7 (95.00%)".to_string()]);
    assert_eq!(prediction_loop.state(), LoopState::Idle);
    assert_eq!(prediction_loop.stats().completed, 1);
}

#[test]
fn wrong_shape_shows_errors_and_the_next_tick_recovers() {
    let config = config(TickPolicy::Sequential, DisplayMode::FullDistribution, 2000);
    let classifier = Arc::new(
        FixedClassifier::new(peaked(2, 0.6)).with_script(vec![vec![0.2; 5]]),
    );
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier);

    let outcome = prediction_loop.on_tick(&session, &mut surface).unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Completed(Err(InferenceFailure::ShapeMismatch {
            expected: 10,
            actual: 5
        }))
    );
    assert_eq!(surface.prediction().len(), 10);
    assert!(surface.prediction().iter().all(|l| l.ends_with(": error")));
    assert_eq!(prediction_loop.state(), LoopState::Idle);

    let outcome = prediction_loop.on_tick(&session, &mut surface).unwrap();
    assert!(matches!(outcome, TickOutcome::Completed(Ok(_))));
    assert_eq!(surface.prediction()[2], "2: 60.00%");
    assert_eq!(prediction_loop.stats().failed, 1);
    assert_eq!(prediction_loop.stats().completed, 1);
}

#[test]
fn busy_ticks_are_skipped_until_the_reply_lands() {
    let config = config(TickPolicy::SkipWhileBusy, DisplayMode::ArgmaxOnly, 5000);
    let classifier = Arc::new(
        FixedClassifier::new(peaked(4, 0.8)).with_delay(Duration::from_millis(150)),
    );
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier.clone());

    assert_eq!(
        prediction_loop.on_tick(&session, &mut surface).unwrap(),
        TickOutcome::Dispatched
    );
    assert_eq!(prediction_loop.state(), LoopState::Inferring);
    assert_eq!(
        prediction_loop.on_tick(&session, &mut surface).unwrap(),
        TickOutcome::Skipped
    );

    let deadline = Instant::now() + Duration::from_secs(5);
    while prediction_loop.is_inference_in_flight() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
        prediction_loop.on_inference_ready(&mut surface).unwrap();
    }
    assert_eq!(surface.prediction(), &["Predicted: 4 (80.00%)".to_string()]);
    assert_eq!(classifier.calls(), 1);
    let stats = prediction_loop.stats();
    assert_eq!((stats.ticks, stats.skipped, stats.completed), (2, 1, 1));
}

#[test]
fn slow_classifier_times_out_without_stopping_the_loop() {
    let config = config(TickPolicy::Sequential, DisplayMode::ArgmaxOnly, 30);
    let classifier = Arc::new(
        FixedClassifier::new(peaked(1, 0.9)).with_delay(Duration::from_millis(200)),
    );
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier);

    let outcome = prediction_loop.on_tick(&session, &mut surface).unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Completed(Err(InferenceFailure::TimedOut(Duration::from_millis(30))))
    );
    assert_eq!(surface.prediction(), &["Predicted: error".to_string()]);
    assert!(!prediction_loop.is_inference_in_flight());

    // The late reply for the abandoned tick is dropped.
    thread::sleep(Duration::from_millis(250));
    prediction_loop.on_inference_ready(&mut surface).unwrap();
    assert_eq!(prediction_loop.stats().discarded_replies, 1);
    assert_eq!(surface.prediction(), &["Predicted: error".to_string()]);
}

#[test]
fn sequential_ticks_do_not_queue_behind_an_abandoned_call() {
    let config = config(TickPolicy::Sequential, DisplayMode::ArgmaxOnly, 30);
    let classifier = Arc::new(
        FixedClassifier::new(peaked(1, 0.9)).with_delay(Duration::from_millis(150)),
    );
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier.clone());

    let first = prediction_loop.on_tick(&session, &mut surface).unwrap();
    assert!(matches!(
        first,
        TickOutcome::Completed(Err(InferenceFailure::TimedOut(_)))
    ));
    for _ in 0..7 {
        assert_eq!(
            prediction_loop.on_tick(&session, &mut surface).unwrap(),
            TickOutcome::Skipped
        );
    }
    assert_eq!(prediction_loop.stats().skipped, 7);

    // Nothing was left queued behind the abandoned call.
    thread::sleep(Duration::from_millis(400));
    assert_eq!(classifier.calls(), 1);
    prediction_loop.on_inference_ready(&mut surface).unwrap();
    assert_eq!(prediction_loop.stats().discarded_replies, 1);
}

#[test]
fn abandoned_call_keeps_skip_policy_from_queueing() {
    let config = config(TickPolicy::SkipWhileBusy, DisplayMode::ArgmaxOnly, 20);
    let classifier = Arc::new(
        FixedClassifier::new(peaked(1, 0.9)).with_delay(Duration::from_millis(300)),
    );
    let (mut prediction_loop, session, mut surface) = fixture(&config, classifier.clone());

    assert_eq!(
        prediction_loop.on_tick(&session, &mut surface).unwrap(),
        TickOutcome::Dispatched
    );
    thread::sleep(Duration::from_millis(60));
    // Expires the first call, then sees the worker still busy.
    assert_eq!(
        prediction_loop.on_tick(&session, &mut surface).unwrap(),
        TickOutcome::Skipped
    );
    assert_eq!(surface.prediction(), &["Predicted: error".to_string()]);
    assert_eq!(classifier.calls(), 1);
}

struct RecordingClassifier {
    seen: Mutex<Vec<InputTensor>>,
}

impl Classifier for RecordingClassifier {
    fn predict(&self, input: &InputTensor) -> anyhow::Result<Vec<f32>> {
        self.seen.lock().unwrap().push(input.clone());
        Ok(peaked(0, 0.5))
    }
}

#[test]
fn classifier_sees_the_buffer_as_of_the_tick() {
    let config = config(TickPolicy::Sequential, DisplayMode::ArgmaxOnly, 2000);
    let recorder = Arc::new(RecordingClassifier {
        seen: Mutex::new(Vec::new()),
    });
    let (mut prediction_loop, mut session, mut surface) = fixture(&config, recorder.clone());
    let brush = BrushEngine::from_config(&config);

    brush
        .paint(&mut session, &mut surface, CellCoords::new(1, 1))
        .unwrap();
    prediction_loop.on_tick(&session, &mut surface).unwrap();
    brush
        .paint(&mut session, &mut surface, CellCoords::new(10, 10))
        .unwrap();

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].shape(), [1, 28, 28, 1]);
    let ink: f32 = seen[0].as_slice().iter().sum();
    assert_eq!(ink, 4.0);
    let grid = Grid::new(28, 10);
    let index = |x: usize, y: usize| y * grid.dimension() + x;
    assert_eq!(seen[0].as_slice()[index(2, 2)], 1.0);
    assert_eq!(seen[0].as_slice()[index(10, 10)], 0.0);
}
