// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::reward::FakeRewarder;
use crate::task::FakeTaskFactory;
use mxbi_core::StageTable;
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn ctx() -> SessionContext {
    SessionContext::new(StageTable::new(), Arc::new(crate::reward::NoOpRewarder))
}

#[test]
fn traced_task_logs_start_and_finish_with_timing() {
    let fake = FakeTaskFactory::new().with_trial_duration(Duration::ZERO);
    fake.script([Feedback::Correct]);
    let traced = TracedTaskFactory::new(fake);

    let (logs, feedback) = with_tracing(|| async {
        let task = traced
            .create(&ctx(), &AnimalState::new("alpha", TaskKind::Mock, 0))
            .unwrap();
        task.start().await
    });

    assert_eq!(feedback, Feedback::Correct);
    assert!(logs.contains("task.start"), "logs: {logs}");
    assert!(logs.contains("animal=alpha"), "logs: {logs}");
    assert!(logs.contains("starting"), "logs: {logs}");
    assert!(logs.contains("elapsed_ms"), "logs: {logs}");
}

#[test]
fn traced_factory_logs_create_failure() {
    let fake = FakeTaskFactory::new();
    fake.fail_create(TaskKind::Mock);
    let traced = TracedTaskFactory::new(fake);

    let (logs, result) = with_tracing(|| async {
        traced
            .create(&ctx(), &AnimalState::new("alpha", TaskKind::Mock, 0))
            .map(|_| ())
    });

    assert!(result.is_err());
    assert!(logs.contains("create failed"), "logs: {logs}");
    assert!(logs.contains("ERROR"), "logs: {logs}");
}

#[test]
fn traced_quit_failure_is_a_warning() {
    let fake = FakeTaskFactory::new();
    fake.set_quit_fails(true);
    let traced = TracedTaskFactory::new(fake);

    let (logs, result) = with_tracing(|| async {
        let task = traced
            .create(&ctx(), &AnimalState::new("alpha", TaskKind::Mock, 0))
            .unwrap();
        task.quit()
    });

    assert!(result.is_err());
    assert!(logs.contains("quit failed"), "logs: {logs}");
    assert!(logs.contains("WARN"), "logs: {logs}");
}

#[test]
fn traced_rewarder_logs_failures() {
    let fake = FakeRewarder::new();
    fake.set_failing(true);
    let traced = TracedRewarder::new(fake.clone());

    let (logs, result) =
        with_tracing(|| async { traced.give_reward(Duration::from_millis(250)).await });

    assert!(result.is_err());
    assert!(logs.contains("reward failed"), "logs: {logs}");
    assert!(logs.contains("duration_ms=250"), "logs: {logs}");
    assert!(fake.rewards().is_empty());
}

#[test]
fn traced_rewarder_passes_deliveries_through() {
    let fake = FakeRewarder::new();
    let traced = TracedRewarder::new(fake.clone());

    let (_logs, result) =
        with_tracing(|| async { traced.give_reward(Duration::from_millis(100)).await });

    assert!(result.is_ok());
    assert_eq!(fake.rewards(), vec![Duration::from_millis(100)]);
}
