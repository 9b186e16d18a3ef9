use crate::domain::error::BridgeError;
use crate::domain::traits::Translator;
use crate::interfaces::protocol::{requests, OutboundMessage, ProtocolWriter};
use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Per-run counters, logged when the input is exhausted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeSummary {
    pub translated: usize,
    pub empty: usize,
    pub failed: usize,
    pub rejected: usize,
    pub skipped: usize,
}

/// Serve requests from `input` until end of stream.
///
/// Lines that are not JSON are dropped. Every other line gets exactly one
/// reply, in input order. Only I/O failures on the channels end the loop
/// early.
pub async fn serve<R, W>(
    engine: &dyn Translator,
    input: R,
    out: &mut ProtocolWriter<W>,
) -> Result<ServeSummary, BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let mut summary = ServeSummary::default();
    let mut lines = std::pin::pin!(requests(input));

    while let Some(item) = lines.next().await {
        let request = match item? {
            Ok(request) => request,
            Err(e) if e.is_noise() => {
                debug!("Skipping line: {}", e);
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Rejected request: {}", e);
                summary.rejected += 1;
                out.send(&OutboundMessage::error(e.to_string())).await?;
                continue;
            }
        };

        let text = request.text();
        if text.is_empty() {
            summary.empty += 1;
            out.send(&OutboundMessage::text("")).await?;
            continue;
        }

        let reply = match engine.translate(text).await {
            Ok(translated) => {
                summary.translated += 1;
                OutboundMessage::text(translated)
            }
            Err(e) => {
                warn!("Translation failed: {}", e);
                summary.failed += 1;
                OutboundMessage::error(e.message)
            }
        };
        out.send(&reply).await?;
    }

    info!(
        "Input closed: {} translated, {} empty, {} failed, {} rejected, {} skipped",
        summary.translated, summary.empty, summary.failed, summary.rejected, summary.skipped
    );
    Ok(summary)
}
