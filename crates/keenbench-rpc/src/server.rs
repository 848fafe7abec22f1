//! The request loop: read a line, parse it, dispatch, write the response
//! (`spec.md` §4.1, §5 "Each JSON-RPC request is handled by an independent
//! task").

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{buffered, read_line, CodecError};
use crate::handler::RpcHandler;
use crate::message::{parse_incoming, IncomingMessage, RpcResponse, INVALID_REQUEST_CODE};
use crate::notify::NotificationSink;
use crate::output::{self, OutputSink};

/// Drive the stdio request loop until stdin closes and every in-flight
/// request has written its response.
///
/// Each parsed request is dispatched on its own spawned task (`spec.md`
/// §5's "independent task" scheduling model), so one slow method never
/// blocks the next line from being read. The returned future itself is
/// not spawned by this function — the caller spawns it (real stdio is
/// always `'static`), which keeps `serve` usable with borrowed,
/// non-`'static` reader/writer pairs in tests.
pub fn serve<R, W>(reader: R, writer: W, handler: Arc<dyn RpcHandler>) -> (NotificationSink, impl std::future::Future<Output = ()>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (output, writer_fut) = output::channel(writer);
    let notifications = NotificationSink::new(output.clone());

    let loop_future = async move {
        let reader_fut = run_read_loop(reader, output, handler);
        tokio::pin!(reader_fut);
        tokio::pin!(writer_fut);
        // Polling both concurrently lets responses and notifications reach
        // stdout as they're produced rather than only after stdin closes;
        // the writer half only finishes once every `OutputSink` clone
        // (including ones held by in-flight spawned request tasks) drops.
        tokio::join!(reader_fut, writer_fut);
    };

    (notifications, loop_future)
}

async fn run_read_loop<R>(reader: R, output: OutputSink, handler: Arc<dyn RpcHandler>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = buffered(reader);

    loop {
        let line = match read_line(&mut reader).await {
            Ok(line) => line,
            Err(CodecError::Closed) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed; shutting down request loop");
                break;
            }
        };

        let message = match parse_incoming(&line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "malformed JSON-RPC line, ignoring");
                let response =
                    RpcResponse::transport_error(serde_json::Value::Null, INVALID_REQUEST_CODE, format!("invalid request: {e}"));
                send_response(&output, &response);
                continue;
            }
        };

        match message {
            IncomingMessage::Request(request) => {
                let output = output.clone();
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let response = match handler.handle(&request.method, request.params).await {
                        Ok(result) => RpcResponse::success(request.id, result),
                        Err(err) => RpcResponse::error(request.id, err.to_info()),
                    };
                    send_response(&output, &response);
                });
            }
            IncomingMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "ignoring inbound notification: no UI-to-engine notifications are defined");
            }
        }
    }
}

fn send_response(output: &OutputSink, response: &RpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => output.send_line(line),
        Err(e) => tracing::error!(error = %e, "failed to serialize response"),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use keenbench_error::{EngineError, ErrorCode};
    use serde_json::Value;

    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl RpcHandler for EchoHandler {
        async fn handle(&self, method: &str, params: Value) -> Result<Value, EngineError> {
            if method == "Fail" {
                return Err(EngineError::new(ErrorCode::NotFound, "nope"));
            }
            Ok(serde_json::json!({"echo": method, "params": params}))
        }
    }

    #[tokio::test]
    async fn dispatches_a_request_and_writes_its_response() {
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"Ping\",\"params\":{}}\n".to_vec();
        let mut out = Vec::new();
        {
            let (_notifications, loop_future) = serve(std::io::Cursor::new(input), &mut out, Arc::new(EchoHandler));
            loop_future.await;
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"echo\":\"Ping\""));
    }

    #[tokio::test]
    async fn handler_error_becomes_structured_error_response() {
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"Fail\",\"params\":{}}\n".to_vec();
        let mut out = Vec::new();
        {
            let (_notifications, loop_future) = serve(std::io::Cursor::new(input), &mut out, Arc::new(EchoHandler));
            loop_future.await;
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"error_code\":\"NOT_FOUND\""));
    }

    #[tokio::test]
    async fn malformed_line_gets_an_invalid_request_response() {
        let input = b"not json\n".to_vec();
        let mut out = Vec::new();
        {
            let (_notifications, loop_future) = serve(std::io::Cursor::new(input), &mut out, Arc::new(EchoHandler));
            loop_future.await;
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&INVALID_REQUEST_CODE.to_string()));
    }
}
