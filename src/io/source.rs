use std::mem;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use futures::io::{AsyncBufRead, AsyncRead, BufReader};
use pin_project_lite::pin_project;
use tokio::fs::File;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use super::error::IoError;
use crate::message::Message;

/// Type alias for a boxed message source
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, IoError>> + Send>>;

pin_project! {
    /// Async stream of messages, one per non-empty line of input
    ///
    /// Lines are split on `\n` as raw bytes; a trailing `\r` is removed and
    /// no text encoding is assumed.
    ///
    /// # Example
    /// ```rust,ignore
    /// let source = LineSource::from_file("events.jsonl").await?;
    /// let running = Orchestrator::start(source, executor, WriterSink::stdout());
    /// ```
    pub struct LineSource<R> {
        #[pin]
        reader: R,
        line: Vec<u8>,
        metadata: Option<Vec<u8>>,
    }
}

impl<R: AsyncBufRead> LineSource<R> {
    /// Create a source from a buffered futures reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            metadata: None,
        }
    }

    /// Attach the same metadata to every message produced
    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

impl<R: AsyncRead> LineSource<BufReader<R>> {
    /// Create a source from an unbuffered futures reader
    pub fn from_reader(reader: R) -> Self {
        Self::new(BufReader::new(reader))
    }
}

impl LineSource<BufReader<Compat<File>>> {
    /// Open a file as a line source
    ///
    /// Bridges the tokio file handle into a futures reader internally.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::from_reader(file.compat()))
    }
}

impl LineSource<BufReader<Compat<tokio::io::Stdin>>> {
    pub fn stdin() -> Self {
        Self::from_reader(tokio::io::stdin().compat())
    }
}

impl<R: AsyncBufRead> Stream for LineSource<R> {
    type Item = Result<Message, IoError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            let (consumed, complete) = {
                let available = match ready!(this.reader.as_mut().poll_fill_buf(cx)) {
                    Ok(available) => available,
                    Err(e) => return Poll::Ready(Some(Err(e.into()))),
                };
                if available.is_empty() {
                    // End of input: a final unterminated line still counts.
                    (0, true)
                } else {
                    match available.iter().position(|b| *b == b'\n') {
                        Some(end) => {
                            this.line.extend_from_slice(&available[..end]);
                            (end + 1, true)
                        }
                        None => {
                            this.line.extend_from_slice(available);
                            (available.len(), false)
                        }
                    }
                }
            };
            let eof = consumed == 0;
            this.reader.as_mut().consume(consumed);
            if !complete {
                continue;
            }

            let mut line = mem::take(this.line);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                if eof {
                    return Poll::Ready(None);
                }
                continue;
            }

            let mut message = Message::new().with_data(line);
            if let Some(metadata) = this.metadata.as_ref() {
                message.set_metadata(metadata.clone());
            }
            return Poll::Ready(Some(Ok(message)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::io::Cursor;

    #[tokio::test]
    async fn yields_one_message_per_line() {
        let input = "{\"a\":1}\n\n{\"a\":2}\r\nlast";
        let source = LineSource::from_reader(Cursor::new(input.as_bytes()));

        let messages: Vec<_> = source.map(|m| m.unwrap().to_string()).collect().await;
        assert_eq!(messages, vec!["{\"a\":1}", "{\"a\":2}", "last"]);
    }

    #[tokio::test]
    async fn non_utf8_lines_pass_through_as_bytes() {
        let input = &b"ok\n\xff\xfe latin1\r\nafter\n"[..];
        let source = LineSource::from_reader(Cursor::new(input));

        let messages: Vec<_> = source.map(|m| m.unwrap().data().to_vec()).collect().await;
        assert_eq!(
            messages,
            vec![b"ok".to_vec(), b"\xff\xfe latin1".to_vec(), b"after".to_vec()]
        );
    }

    #[tokio::test]
    async fn long_lines_span_reader_buffers() {
        let long = "x".repeat(20_000);
        let input = format!("{long}\nshort");
        let source = LineSource::new(BufReader::with_capacity(64, Cursor::new(input.into_bytes())));

        let messages: Vec<_> = source.map(|m| m.unwrap().data().len()).collect().await;
        assert_eq!(messages, vec![20_000, 5]);
    }

    #[tokio::test]
    async fn attaches_metadata() {
        let source = LineSource::from_reader(Cursor::new(&b"x\n"[..])).with_metadata(r#"{"src":"t"}"#);
        let messages: Vec<_> = source.collect().await;
        let message = messages[0].as_ref().unwrap();
        assert_eq!(message.get_meta_value("src").as_string(), "t");
    }

    #[tokio::test]
    async fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        tokio::fs::write(&path, "one\ntwo\n").await.unwrap();

        let source = LineSource::from_file(&path).await.unwrap();
        let messages: Vec<_> = source.map(|m| m.unwrap().to_string()).collect().await;
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = LineSource::from_file("/definitely/not/here.jsonl").await;
        assert!(matches!(result, Err(IoError::Io(_))));
    }
}
