//! Background capture of the server's output streams.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt as _, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use super::CAPTURE_LIMIT;

/// Drains one output stream into a bounded tail buffer.
///
/// The stream is read continuously so the server never blocks on a full pipe.
/// Every line is also logged at debug level.
pub(crate) struct OutputCapture {
    buffer: Arc<Mutex<String>>,
    task: Option<JoinHandle<()>>,
}

impl OutputCapture {
    pub(crate) fn spawn<R>(reader: R, label: String) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&buffer);

        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        log::debug!("[{}] {}", label, text.trim_end());
                        let mut buf = sink.lock().unwrap_or_else(|e| e.into_inner());
                        append_bounded(&mut buf, &text, CAPTURE_LIMIT);
                    }
                }
            }
        });

        Self {
            buffer,
            task: Some(task),
        }
    }

    /// Everything captured so far.
    pub(crate) fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Wait up to `timeout` for the stream to reach EOF, then close it and
    /// return the captured text.
    pub(crate) async fn drain(mut self, timeout: Duration) -> String {
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(timeout, &mut task).await.is_err() {
                log::debug!("Output stream still open after {:?}, closing", timeout);
                task.abort();
            }
        }
        self.contents()
    }

    /// Close the stream without waiting for EOF.
    pub(crate) fn close(mut self) -> String {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.contents()
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Append `text`, dropping the oldest bytes beyond `limit`.
fn append_bounded(buf: &mut String, text: &str, limit: usize) {
    buf.push_str(text);
    if buf.len() > limit {
        let mut cut = buf.len() - limit;
        while !buf.is_char_boundary(cut) {
            cut += 1;
        }
        buf.drain(..cut);
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt as _;

    use super::*;

    #[tokio::test]
    async fn drain_collects_until_eof() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let capture = OutputCapture::spawn(reader, "test".to_string());

        writer.write_all(b"LOG:  starting\nLOG:  ready").await.unwrap();
        drop(writer);

        let text = capture.drain(Duration::from_secs(5)).await;
        assert_eq!(text, "LOG:  starting\nLOG:  ready");
    }

    #[tokio::test]
    async fn drain_gives_up_on_open_stream() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let capture = OutputCapture::spawn(reader, "test".to_string());

        writer.write_all(b"partial\n").await.unwrap();
        tokio::task::yield_now().await;

        let text = capture.drain(Duration::from_millis(50)).await;
        assert!(text.is_empty() || text == "partial\n");
        drop(writer);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let capture = OutputCapture::spawn(reader, "test".to_string());

        writer.write_all(b"bad \xff byte\n").await.unwrap();
        drop(writer);

        let text = capture.drain(Duration::from_secs(5)).await;
        assert_eq!(text, "bad \u{fffd} byte\n");
    }

    #[test]
    fn append_bounded_keeps_tail() {
        let mut buf = String::new();
        append_bounded(&mut buf, "abcdef", 4);
        assert_eq!(buf, "cdef");
        append_bounded(&mut buf, "gh", 4);
        assert_eq!(buf, "efgh");
    }

    #[test]
    fn append_bounded_respects_char_boundaries() {
        let mut buf = String::new();
        append_bounded(&mut buf, "aé", 2);
        assert_eq!(buf, "é");
    }
}
