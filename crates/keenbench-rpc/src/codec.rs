//! Line-delimited JSON reader/writer over async stdio.
//!
//! Adapted from `keenbench-toolworker::process`'s `BufReader`-over-lines
//! approach (itself adapted from `sidecar-kit`'s `SidecarProcess`) and
//! `abp-protocol::JsonlCodec`'s encode-with-trailing-newline convention,
//! applied here to the engine's own stdin/stdout rather than a worker
//! subprocess's piped handles.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Errors reading or writing a line on the stdio transport.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The underlying reader failed.
    #[error("failed to read stdio line: {0}")]
    Read(#[source] std::io::Error),
    /// The underlying writer failed.
    #[error("failed to write stdio line: {0}")]
    Write(#[source] std::io::Error),
    /// Stdin closed (EOF).
    #[error("stdin closed")]
    Closed,
}

/// Read the next non-blank line from `reader`, or [`CodecError::Closed`] on EOF.
pub async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<String, CodecError> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.map_err(CodecError::Read)?;
        if n == 0 {
            return Err(CodecError::Closed);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
}

/// Write `line` to `writer` with a trailing newline, flushing immediately
/// so a reader blocked on `read_line` observes it without delay.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<(), CodecError> {
    writer.write_all(line.as_bytes()).await.map_err(CodecError::Write)?;
    writer.write_all(b"\n").await.map_err(CodecError::Write)?;
    writer.flush().await.map_err(CodecError::Write)
}

/// Wrap a raw `AsyncRead` in the buffered line reader the server loop uses.
pub fn buffered<R: tokio::io::AsyncRead>(reader: R) -> BufReader<R> {
    BufReader::new(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_line_skips_blank_lines() {
        let input = b"\n\n{\"a\":1}\n".to_vec();
        let mut reader = buffered(std::io::Cursor::new(input));
        let line = read_line(&mut reader).await.unwrap();
        assert_eq!(line, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn read_line_errors_on_eof() {
        let mut reader = buffered(std::io::Cursor::new(Vec::new()));
        let err = read_line(&mut reader).await.unwrap_err();
        assert!(matches!(err, CodecError::Closed));
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, r#"{"b":2}"#).await.unwrap();
        assert_eq!(out, b"{\"b\":2}\n");
    }
}
