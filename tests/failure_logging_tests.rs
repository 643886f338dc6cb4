mod common;

use common::{FakeEvent, FakeReply, PanickingCollector, RecordingCollector};
use pretty_assertions::assert_eq;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use dashbot_tracking::binder::HookRole;
use dashbot_tracking::services::collector::CollectorTransport;
use dashbot_tracking::tracking::context::FlushReport;
use dashbot_tracking::{PluginConfig, PluginOptions, TrackedEvent, Tracker};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn count(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run incoming + one custom event + outgoing with logs captured on this thread.
async fn run_logged(print_errors: bool, transport: Arc<dyn CollectorTransport>) -> (LogBuffer, FlushReport) {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = PluginConfig::from_options(PluginOptions {
        api_key: Some("some_api_key".into()),
        print_errors: Some(print_errors),
        ..Default::default()
    })
    .unwrap();
    let tracker = Tracker::new(config, transport);

    let event = FakeEvent::alexa("user-id", "LaunchRequest");
    assert!(tracker.request_started(&event));
    event.slot.track_event(TrackedEvent::custom("CUSTOM EVENT"));
    let mut reply = FakeReply::speech("Hello!");
    let report = tracker
        .before_reply(&event, &mut reply, None, HookRole::BeforeReply)
        .await
        .unwrap();

    (logs, report)
}

// The default tokio test runtime is single-threaded, so spawned sends log
// through the thread-local subscriber.
#[tokio::test]
async fn test_each_failure_logged_once_when_enabled() {
    let (logs, report) = run_logged(true, RecordingCollector::failing()).await;
    assert_eq!(report.failed, 3);
    assert_eq!(logs.count("Dashbot submission failed"), 3);

    let (logs, report) = run_logged(false, RecordingCollector::failing()).await;
    assert_eq!(report.failed, 3);
    assert_eq!(logs.count("Dashbot submission failed"), 0);
}

#[tokio::test]
async fn test_aborted_send_respects_print_errors() {
    let (logs, report) = run_logged(false, Arc::new(PanickingCollector)).await;
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 3);
    assert_eq!(logs.count("Send task aborted"), 0);

    let (logs, report) = run_logged(true, Arc::new(PanickingCollector)).await;
    assert_eq!(report.failed, 3);
    assert_eq!(logs.count("Send task aborted"), 3);
}
