//! The single writer stdout is funneled through (`spec.md` §4.1
//! "Backpressure"): both responses and notifications enqueue an
//! already-serialized line onto one unbounded channel; one background task
//! owns the actual writes, so lines are never interleaved mid-write and a
//! stalled stdout pipe backs up the channel rather than the many tasks
//! producing lines.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

use crate::codec::write_line;

/// A handle producers clone to enqueue a pre-serialized line for delivery.
#[derive(Clone)]
pub struct OutputSink {
    sender: mpsc::UnboundedSender<String>,
}

impl OutputSink {
    /// Enqueue `line` for delivery. Synchronous and non-blocking; the
    /// actual write happens on the writer task driven by [`channel`]'s
    /// returned future.
    pub fn send_line(&self, line: String) {
        if self.sender.send(line).is_err() {
            tracing::warn!("output writer has shut down; dropping line");
        }
    }
}

/// Build a connected `(OutputSink, writer future)` pair. Await the
/// returned future on its own task; it runs until every [`OutputSink`]
/// clone is dropped.
pub fn channel<W: AsyncWrite + Unpin>(writer: W) -> (OutputSink, impl std::future::Future<Output = ()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (OutputSink { sender }, run_writer(receiver, writer))
}

async fn run_writer<W: AsyncWrite + Unpin>(mut receiver: mpsc::UnboundedReceiver<String>, mut writer: W) {
    while let Some(line) = receiver.recv().await {
        if let Err(e) = write_line(&mut writer, &line).await {
            tracing::error!(error = %e, "failed to write stdout line; stopping output writer");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_are_written_in_send_order() {
        let mut out = Vec::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = OutputSink { sender };
        sink.send_line("first".to_string());
        sink.send_line("second".to_string());
        drop(sink);

        run_writer(receiver, &mut out).await;
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }
}
