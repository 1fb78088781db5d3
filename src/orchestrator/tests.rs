// src/orchestrator/tests.rs

use super::*;
use crate::classifier::FixedClassifier;
use crate::color::{Color, NamedColor};
use crate::config::{EraseMode, TickPolicy};
use crate::display::{HeadlessSurface, SurfaceCommand};
use crate::input::{PointerButton, PointerEvent, PointerPhase};
use crate::prediction::Ticker;
use crate::raster::{BACKGROUND, INK};
use crate::waker::NoOpWaker;
use test_log::test;

fn peaked(class: usize) -> Vec<f32> {
    let mut dist = vec![0.01; 10];
    dist[class] = 0.91;
    dist
}

fn orchestrator(config: &Config, classifier: FixedClassifier) -> Orchestrator<HeadlessSurface> {
    let session = Session::from_config(config, Arc::new(classifier));
    let surface = HeadlessSurface::new(*session.grid(), Color::Named(NamedColor::White));
    let mut orchestrator =
        Orchestrator::new(config, session, surface, Box::new(NoOpWaker)).unwrap();
    orchestrator.initialize().unwrap();
    orchestrator.surface_mut().take_commands();
    orchestrator
}

fn primary(phase: PointerPhase, x: i64, y: i64) -> ControlEvent {
    ControlEvent::Pointer(PointerEvent::new(PointerButton::Primary, phase, x, y))
}

#[test]
fn initialize_clears_the_surface() {
    let config = Config::default();
    let session = Session::from_config(&config, Arc::new(FixedClassifier::uniform(10)));
    let surface = HeadlessSurface::new(*session.grid(), Color::Named(NamedColor::Gray));
    let mut orchestrator =
        Orchestrator::new(&config, session, surface, Box::new(NoOpWaker)).unwrap();
    orchestrator.initialize().unwrap();
    assert_eq!(
        orchestrator.surface().commands(),
        &[
            SurfaceCommand::ClearAll {
                color: Color::Named(NamedColor::White)
            },
            SurfaceCommand::Present
        ]
    );
}

#[test]
fn pointer_events_paint_and_clear_key_resets() {
    let mut orchestrator = orchestrator(&Config::default(), FixedClassifier::uniform(10));
    let status = orchestrator
        .process_event(primary(PointerPhase::Press, 15, 15))
        .unwrap();
    assert_eq!(status, OrchestratorStatus::Running);
    orchestrator
        .process_event(primary(PointerPhase::Drag, 35, 15))
        .unwrap();
    let buffer = orchestrator.session().buffer();
    assert_eq!(buffer.get(1, 1), Some(INK));
    assert_eq!(buffer.get(4, 2), Some(INK));
    assert_eq!(buffer.ink_count(), 8);

    orchestrator
        .process_event(ControlEvent::Key(KeyCommand::Clear))
        .unwrap();
    assert_eq!(orchestrator.session().buffer().ink_count(), 0);
    assert_eq!(orchestrator.session().buffer().get(1, 1), Some(BACKGROUND));
}

#[test]
fn quit_key_and_shutdown_event_stop_the_loop() {
    let mut orchestrator = orchestrator(&Config::default(), FixedClassifier::uniform(10));
    assert_eq!(
        orchestrator
            .process_event(ControlEvent::Key(KeyCommand::Quit))
            .unwrap(),
        OrchestratorStatus::Shutdown
    );
    assert_eq!(
        orchestrator.process_event(ControlEvent::Shutdown).unwrap(),
        OrchestratorStatus::Shutdown
    );
}

#[test]
fn sequential_tick_renders_the_prediction() {
    let config = Config {
        tick_policy: TickPolicy::Sequential,
        ..Config::default()
    };
    let mut orchestrator = orchestrator(&config, FixedClassifier::new(peaked(3)));
    orchestrator.process_event(ControlEvent::Tick(1)).unwrap();
    assert_eq!(
        orchestrator.surface().prediction(),
        &["Predicted: 3 (91.00%)".to_string()]
    );
}

#[test]
fn full_clear_mode_clears_on_secondary_press() {
    let config = Config {
        erase_mode: EraseMode::FullClear,
        ..Config::default()
    };
    let mut orchestrator = orchestrator(&config, FixedClassifier::uniform(10));
    orchestrator
        .process_event(primary(PointerPhase::Press, 15, 15))
        .unwrap();
    orchestrator
        .process_event(ControlEvent::Pointer(PointerEvent::new(
            PointerButton::Secondary,
            PointerPhase::Press,
            200,
            200,
        )))
        .unwrap();
    assert_eq!(orchestrator.session().buffer().ink_count(), 0);
}

#[test]
fn run_renders_replies_woken_through_the_channel() {
    let config = Config::default();
    let (tx, rx) = create_orchestrator_channel();
    let session = Session::from_config(&config, Arc::new(FixedClassifier::new(peaked(8))));
    let surface = HeadlessSurface::new(*session.grid(), Color::Named(NamedColor::White));
    let mut orchestrator = Orchestrator::new(
        &config,
        session,
        surface,
        Box::new(ChannelWaker::new(tx.clone())),
    )
    .unwrap();
    orchestrator.initialize().unwrap();

    tx.send(ControlEvent::Tick(1)).unwrap();
    // The worker's wake-up lands behind this tick; quit once it is handled.
    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        tx.send(KeyCommand::Quit).unwrap();
    });
    orchestrator.run(&rx).unwrap();
    quitter.join().unwrap();

    assert_eq!(
        orchestrator.surface().prediction(),
        &["Predicted: 8 (91.00%)".to_string()]
    );
    assert_eq!(orchestrator.prediction_loop().stats().completed, 1);
    orchestrator.shutdown();
}

#[test]
fn run_ends_when_every_sender_is_gone() {
    let config = Config::default();
    let (tx, rx) = create_orchestrator_channel();
    let mut orchestrator = orchestrator(&config, FixedClassifier::uniform(10));
    tx.send(primary(PointerPhase::Press, 15, 15)).unwrap();
    drop(tx);
    orchestrator.run(&rx).unwrap();
    assert_eq!(orchestrator.session().buffer().ink_count(), 4);
}

#[test]
fn slow_sequential_inference_does_not_back_up_ticks() {
    let config = Config {
        tick_policy: TickPolicy::Sequential,
        tick_interval_ms: 10,
        ..Config::default()
    };
    let classifier = FixedClassifier::new(peaked(5)).with_delay(Duration::from_millis(50));
    let (tx, rx) = create_orchestrator_channel();
    let mut orchestrator = orchestrator(&config, classifier);
    let mut ticker = Ticker::spawn(
        config.tick_interval(),
        orchestrator.tick_gate().forwarder(tx.clone()),
    )
    .unwrap();

    let quitter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(1000));
        tx.send(KeyCommand::Quit).unwrap();
    });
    orchestrator.run(&rx).unwrap();
    quitter.join().unwrap();
    ticker.stop();

    let pending_ticks = rx
        .try_iter()
        .filter(|event| matches!(event, ControlEvent::Tick(_)))
        .count();
    assert!(pending_ticks <= 1, "{} ticks left queued", pending_ticks);
    // Roughly one tick per inference, not one per interval.
    let handled = orchestrator.prediction_loop().stats().ticks;
    assert!(handled <= 25, "handled {} ticks", handled);
    assert_eq!(
        orchestrator.surface().prediction(),
        &["Predicted: 5 (91.00%)".to_string()]
    );
    orchestrator.shutdown();
}
