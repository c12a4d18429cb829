//! Stream-based batch source.
//!
//! Reads newline-delimited JSON rows from an async byte stream (stdin, a
//! socket, a pipe) until EOF, or whole documents from a bytes channel.

use std::fmt;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use super::{parse_document, parse_line, BatchSource, LoadedBatch};

enum Input {
    Reader(Box<dyn AsyncRead + Unpin + Send>),
    Bytes(mpsc::Receiver<Vec<u8>>),
    Consumed,
}

/// A batch source that drains an async stream.
///
/// A stream can only be loaded once; a second [`load`](BatchSource::load)
/// fails.
///
/// # Example with a byte stream
///
/// ```
/// use std::io::Cursor;
/// use provwatch::{BatchSource, StreamSource};
///
/// # tokio_test::block_on(async {
/// let data = b"{\"event_id\": \"e1\", \"flowfile_id\": \"ff-1\"}\n";
/// let mut source = StreamSource::new(Cursor::new(data.to_vec()), "example");
/// let batch = source.load().await.unwrap();
/// assert_eq!(batch.records.len(), 1);
/// # });
/// ```
pub struct StreamSource {
    input: Input,
    description: String,
}

impl StreamSource {
    /// Read NDJSON rows from the given async reader.
    pub fn new<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            input: Input::Reader(Box::new(reader)),
            description: format!("stream: {}", description),
        }
    }

    /// Read NDJSON rows from standard input.
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "stdin")
    }

    /// Create a StreamSource from a raw bytes channel.
    ///
    /// Each message is one document in any format the file source accepts.
    /// The batch ends when every sender has been dropped.
    pub fn from_bytes_channel(rx: mpsc::Receiver<Vec<u8>>, description: &str) -> Self {
        Self {
            input: Input::Bytes(rx),
            description: format!("stream: {}", description),
        }
    }

    async fn read_lines(
        description: String,
        reader: Box<dyn AsyncRead + Unpin + Send>,
    ) -> Result<LoadedBatch> {
        let mut batch = LoadedBatch::new(description);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;
            let origin = format!("line {}", line_no);
            match std::str::from_utf8(&buf) {
                Ok(line) => parse_line(line, &origin, &mut batch),
                Err(e) => batch.skip(origin, format!("Parse error: {}", e)),
            }
        }
        Ok(batch)
    }

    async fn read_messages(description: String, mut rx: mpsc::Receiver<Vec<u8>>) -> LoadedBatch {
        let mut batch = LoadedBatch::new(description);
        let mut message_no = 0;

        while let Some(bytes) = rx.recv().await {
            message_no += 1;
            let origin = format!("message {}", message_no);
            match std::str::from_utf8(&bytes) {
                Ok(text) => batch.merge(parse_document(text, &origin)),
                Err(e) => batch.skip(origin, format!("Parse error: {}", e)),
            }
        }
        batch
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.input {
            Input::Reader(_) => "reader",
            Input::Bytes(_) => "channel",
            Input::Consumed => "consumed",
        };
        f.debug_struct("StreamSource")
            .field("description", &self.description)
            .field("input", &state)
            .finish()
    }
}

#[async_trait]
impl BatchSource for StreamSource {
    async fn load(&mut self) -> Result<LoadedBatch> {
        let batch = match std::mem::replace(&mut self.input, Input::Consumed) {
            Input::Reader(reader) => Self::read_lines(self.description.clone(), reader).await?,
            Input::Bytes(rx) => Self::read_messages(self.description.clone(), rx).await,
            Input::Consumed => bail!("{} has already been read", self.description),
        };

        info!(
            source = %self.description,
            records = batch.records.len(),
            skipped = batch.skipped.len(),
            "batch loaded"
        );
        Ok(batch)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
