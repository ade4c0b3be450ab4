//! Downstream stage: one JSON object per line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::model::LogRecord;

/// Write every record from `records` as a JSON line until all senders are gone.
/// Returns the number of records written.
pub async fn write_records<W>(mut records: mpsc::Receiver<LogRecord>, mut out: W) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(record) = records.recv().await {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        written += 1;
    }
    out.flush().await?;
    Ok(written)
}
