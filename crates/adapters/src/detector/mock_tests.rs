// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mxbi_core::DetectorEvent;
use yare::parameterized;

fn detector(enter_on_start: bool) -> (MockDetector, Arc<Mutex<Vec<DetectorEvent>>>) {
    let detector = MockDetector::new(
        vec!["alpha".to_string(), "beta".to_string()],
        Duration::ZERO,
        enter_on_start,
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in DetectorEventKind::ALL {
        let sink = Arc::clone(&seen);
        detector.register(
            kind,
            Arc::new(move |event: &DetectorEvent| sink.lock().unwrap().push(event.clone())),
        );
    }
    (detector, seen)
}

fn entered(name: &str) -> DetectorEvent {
    DetectorEvent::AnimalEntered {
        name: name.to_string(),
    }
}

#[parameterized(
    first = { 'p', Some(MockCommand::EnterFirst) },
    second = { 'o', Some(MockCommand::EnterSecond) },
    leave = { 'l', Some(MockCommand::Leave) },
    cycle = { 'c', Some(MockCommand::Cycle) },
    error = { 'e', Some(MockCommand::Error) },
    unbound = { 'x', None },
)]
fn key_bindings(key: char, expected: Option<MockCommand>) {
    assert_eq!(MockCommand::from_key(key), expected);
}

#[test]
fn start_reports_first_animal() {
    let (detector, seen) = detector(true);
    detector.start().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![entered("alpha")]);
}

#[test]
fn start_without_entry_is_silent() {
    let (detector, seen) = detector(false);
    detector.start().unwrap();
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn command_sequence_follows_presence() {
    let (detector, seen) = detector(false);
    let control = detector.control();
    detector.start().unwrap();

    assert!(control.send(MockCommand::EnterFirst));
    assert!(control.send(MockCommand::EnterFirst));
    assert!(control.send(MockCommand::EnterSecond));
    assert!(control.send(MockCommand::Leave));
    assert!(control.send(MockCommand::Cycle));
    assert!(control.send(MockCommand::Error));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            entered("alpha"),
            DetectorEvent::AnimalStayed,
            DetectorEvent::AnimalChanged {
                name: "beta".to_string()
            },
            DetectorEvent::AnimalLeft,
            entered("alpha"),
            DetectorEvent::ErrorDetected,
        ]
    );
}

#[test]
fn leave_with_nobody_present_emits_nothing() {
    let (detector, seen) = detector(false);
    detector.start().unwrap();
    assert!(detector.control().send(MockCommand::Leave));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn second_animal_missing_is_ignored() {
    let detector = MockDetector::new(vec!["alpha".to_string()], Duration::ZERO, false);
    detector.start().unwrap();
    assert!(!detector.control().send(MockCommand::EnterSecond));
}

#[test]
fn commands_after_stop_are_dropped() {
    let (detector, seen) = detector(true);
    let control = detector.control();
    detector.start().unwrap();
    detector.stop();
    detector.stop();

    assert!(!control.send(MockCommand::Leave));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn double_start_is_rejected() {
    let (detector, _seen) = detector(false);
    detector.start().unwrap();
    assert!(matches!(detector.start(), Err(DetectorError::AlreadyStarted)));
}
