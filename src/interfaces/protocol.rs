//! JSON Lines framing for the parent process.
//!
//! Inbound: one `{"text": ...}` object per line. Outbound: one status,
//! result or error object per line, flushed as soon as it is written.

use crate::domain::error::{BridgeError, ParseError};
use crate::domain::model::{Request, StatusEvent};
use crate::domain::traits::StatusReporter;
use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    DownloadingModel,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Status { status: Status },
    Text { text: String },
    Error { error: String },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }
}

impl From<StatusEvent> for OutboundMessage {
    fn from(event: StatusEvent) -> Self {
        match event {
            StatusEvent::DownloadingModel => Self::Status {
                status: Status::DownloadingModel,
            },
            StatusEvent::Ready => Self::Status {
                status: Status::Ready,
            },
            StatusEvent::Error(message) => Self::Error { error: message },
        }
    }
}

/// Parse one input line into a request.
pub fn parse_line(line: &[u8]) -> Result<Request, ParseError> {
    let value: Value = serde_json::from_slice(line).map_err(ParseError::Malformed)?;
    let Value::Object(mut fields) = value else {
        return Err(ParseError::NotAnObject);
    };

    match fields.remove("text") {
        None | Some(Value::Null) => Ok(Request { text: None }),
        Some(Value::String(text)) => Ok(Request { text: Some(text) }),
        Some(_) => Err(ParseError::InvalidText),
    }
}

/// Lazily read and parse requests, one line at a time, until end of input.
///
/// The outer `Result` carries read failures on the input channel.
pub fn requests<R>(
    reader: R,
) -> impl Stream<Item = Result<Result<Request, ParseError>, std::io::Error>>
where
    R: AsyncBufRead + Unpin,
{
    stream::unfold((reader, Vec::new()), |(mut reader, mut buf)| async move {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                let parsed = parse_line(&buf);
                Some((Ok(parsed), (reader, buf)))
            }
            Err(e) => Some((Err(e), (reader, buf))),
        }
    })
}

/// Writes protocol messages, one flushed line each.
///
/// `downloading_model` and `ready` are sent at most once.
pub struct ProtocolWriter<W> {
    out: W,
    downloading_sent: bool,
    ready_sent: bool,
}

impl<W: AsyncWrite + Unpin + Send> ProtocolWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            downloading_sent: false,
            ready_sent: false,
        }
    }

    pub async fn send(&mut self, message: &OutboundMessage) -> Result<(), BridgeError> {
        if let OutboundMessage::Status { status } = message {
            let seen = match status {
                Status::DownloadingModel => &mut self.downloading_sent,
                Status::Ready => &mut self.ready_sent,
            };
            if *seen {
                warn!("Status {:?} already sent, dropping duplicate", status);
                return Ok(());
            }
            *seen = true;
        }

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.out.write_all(&line).await?;
        self.out.flush().await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> StatusReporter for ProtocolWriter<W> {
    async fn report(&mut self, event: StatusEvent) -> Result<(), BridgeError> {
        self.send(&event.into()).await
    }
}
