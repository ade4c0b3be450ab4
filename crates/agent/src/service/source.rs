//! Line sources: a file (optionally followed) or stdin.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::Stream;

use crate::error::SourceError;
use crate::model::PhysicalLine;

/// Path that selects standard input.
pub const STDIN_SOURCE: &str = "-";

/// Reads physical lines from one file or stdin.
#[derive(Debug, Clone)]
pub struct LineSource {
    path: String,
    follow: bool,
    poll_interval: Duration,
}

impl LineSource {
    pub fn new(path: impl Into<String>, follow: bool, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            follow,
            poll_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.path
    }

    pub fn is_stdin(&self) -> bool {
        self.path == STDIN_SOURCE
    }

    async fn open(&self) -> Result<Box<dyn AsyncBufRead + Send + Unpin>, SourceError> {
        if self.is_stdin() {
            return Ok(Box::new(BufReader::new(tokio::io::stdin())));
        }
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| SourceError::Open {
                path: PathBuf::from(&self.path),
                source,
            })?;
        Ok(Box::new(BufReader::new(file)))
    }

    /// Stream of sequence-numbered lines, `seq` starting at 0.
    ///
    /// Terminators (`\n`, `\r\n`) are removed and invalid UTF-8 is replaced
    /// lossily. At end of file a follow-mode source keeps polling and never
    /// emits a partial line; otherwise a trailing unterminated line is emitted
    /// and the stream ends. The first I/O error ends the stream.
    pub fn lines(self) -> impl Stream<Item = Result<PhysicalLine, SourceError>> + Send {
        async_stream::try_stream! {
            let mut reader = self.open().await?;
            let follow = self.follow && !self.is_stdin();
            let mut buf = Vec::with_capacity(256);
            let mut seq = 0u64;

            loop {
                reader.read_until(b'\n', &mut buf).await?;

                if buf.last() != Some(&b'\n') {
                    // EOF, possibly with an unterminated tail in `buf`
                    if follow {
                        tokio::time::sleep(self.poll_interval).await;
                        continue;
                    }
                    if !buf.is_empty() {
                        yield PhysicalLine::new(seq, decode_line(&buf));
                    }
                    break;
                }

                yield PhysicalLine::new(seq, decode_line(&buf));
                seq += 1;
                buf.clear();
            }

            tracing::debug!(source = %self.path, lines = seq, "source reached end of input");
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
