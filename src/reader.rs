//! Incremental framing of a streaming response body into discrete records.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt as _};

use crate::Result;

/// Reads newline-delimited records off a chunked byte stream.
///
/// Records may arrive split across network reads; partial data is buffered
/// until the terminating newline shows up. Keep-alive blank lines come back
/// as empty records so the caller can reset liveness without queueing them.
///
/// A reader is restartable across calls on the same body, not across
/// connections; reconnecting means constructing a fresh reader.
pub(crate) struct RecordReader<S> {
    chunks: S,
    buffer: BytesMut,
    eof: bool,
}

impl<S> RecordReader<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    pub(crate) fn new(chunks: S) -> Self {
        Self {
            chunks,
            buffer: BytesMut::new(),
            eof: false,
        }
    }

    /// Returns the next record, empty for a keep-alive line, or `None` when
    /// the body ended cleanly. Read faults are surfaced as errors, so a
    /// truncated-by-fault stream is distinguishable from a clean stop.
    pub(crate) async fn read_next(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(record) = self.take_record() {
                return Ok(Some(record));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                // trailing record without a final newline
                return Ok(Some(trim_cr(self.buffer.split())));
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(e),
                None => self.eof = true,
            }
        }
    }

    fn take_record(&mut self) -> Option<Bytes> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(newline + 1);
        line.truncate(newline);
        Some(trim_cr(line))
    }
}

fn trim_cr(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}
