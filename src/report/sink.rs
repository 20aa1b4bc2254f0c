//! Message sink: writes console messages to an output stream, one per line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;

/// Writes every received message followed by a newline, in delivery order.
///
/// Each line is flushed as it is written. Returns the writer once the channel
/// is closed and drained.
///
/// # Errors
///
/// Returns the first IO error from `out`; remaining messages are dropped.
pub async fn drain_messages<W>(
    mut messages: UnboundedReceiver<String>,
    mut out: W,
) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        out.write_all(message.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(out)
}
