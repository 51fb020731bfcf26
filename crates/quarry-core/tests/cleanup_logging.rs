use quarry_core::errors::{log_cleanup_failure, CleanupError};
use std::sync::{Arc, Mutex};

#[test]
fn test_cleanup_failure_emits_structured_warning() {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let buffer_clone = buffer.clone();

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_writer(move || MockWriter(buffer_clone.clone()))
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        log_cleanup_failure(CleanupError::new(
            "query connection",
            anyhow::anyhow!("connection reset by peer"),
        ));
    });

    let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(output.contains("\"event\":\"quarry.cleanup.failed\""));
    assert!(output.contains("\"what\":\"query connection\""));
    assert!(output.contains("connection reset by peer"));
    assert!(output.contains("\"level\":\"WARN\""));
}

struct MockWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
