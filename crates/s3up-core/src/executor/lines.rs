use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Longest line handed out; longer runs are split into chunks of this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines on `\n` and `\r`.
///
/// The AWS CLI redraws its progress line with a bare carriage return, so
/// splitting on `\n` alone would only surface the last sample of each file.
/// Empty segments (e.g. from `\r\n`) are skipped.
pub struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
    limit: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_LINE_BYTES)
    }

    /// Like [`LineReader::new`] with a custom line length cap (at least 1).
    pub fn with_limit(reader: R, limit: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            pending: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Next non-empty line, lossily decoded; `None` at end of stream.
    ///
    /// Cancel safe: partial data stays buffered if the future is dropped.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }
            // `pending` is always shorter than `limit` here.
            let room = self.limit - self.pending.len();
            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(i) if i <= room => {
                    self.pending.extend_from_slice(&available[..i]);
                    self.inner.consume(i + 1);
                    if !self.pending.is_empty() {
                        return Ok(Some(self.take_pending()));
                    }
                }
                _ => {
                    let n = available.len().min(room);
                    self.pending.extend_from_slice(&available[..n]);
                    self.inner.consume(n);
                    if self.pending.len() >= self.limit {
                        tracing::trace!(limit = self.limit, "splitting overlong output line");
                        return Ok(Some(self.take_pending()));
                    }
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut reader = LineReader::new(input);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn splits_on_newline_and_carriage_return() {
        let input = b"upload: a.jpg\nCompleted 1.0 MiB/2.0 MiB (1.0 MiB/s)\rCompleted 2.0 MiB/2.0 MiB (1.0 MiB/s)\r\ndone";
        assert_eq!(
            collect(input).await,
            vec![
                "upload: a.jpg",
                "Completed 1.0 MiB/2.0 MiB (1.0 MiB/s)",
                "Completed 2.0 MiB/2.0 MiB (1.0 MiB/s)",
                "done",
            ]
        );
    }

    #[tokio::test]
    async fn empty_stream() {
        assert!(collect(b"").await.is_empty());
        assert!(collect(b"\r\n\n").await.is_empty());
    }

    #[tokio::test]
    async fn overlong_run_is_split_at_the_cap() {
        let mut input = vec![b'x'; 200];
        input.extend_from_slice(b"\nCompleted 1.0 MiB/2.0 MiB (1.0 MiB/s)\n");
        let mut reader = LineReader::with_limit(&input[..], 64);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            lines.push(line);
        }

        assert!(lines.iter().all(|l| l.len() <= 64), "{lines:?}");
        let filler: Vec<usize> = lines[..lines.len() - 1].iter().map(String::len).collect();
        assert_eq!(filler, vec![64, 64, 64, 8]);
        let last = lines.last().unwrap();
        assert!(crate::progress::parse_line(last).is_some(), "{last}");
    }

    #[tokio::test]
    async fn line_exactly_at_the_cap_is_kept_whole() {
        let mut reader = LineReader::with_limit(&b"abcd\nef"[..], 4);
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("abcd"));
        assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("ef"));
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_lossy() {
        assert_eq!(collect(b"a\xffb\n").await, vec!["a\u{fffd}b"]);
    }
}
