//! Push-channel sources.
//!
//! An [`EventSource`] yields raw text frames in arrival order. A source may be
//! reconnected after it closes; sources that can never produce more frames
//! report [`EventSource::exhausted`] so the channel driver stops retrying.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Abstraction over the push-channel connection.
pub trait EventSource {
    /// Error type for connect/read operations.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Open (or reopen) the connection.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Next raw frame, or `None` once the connection has closed.
    fn next_frame(&mut self) -> Result<Option<String>, Self::Error>;

    /// `true` when reconnecting can never yield further frames.
    fn exhausted(&self) -> bool {
        false
    }
}

/// JSON-lines frames read from any buffered reader; blank lines are skipped.
///
/// The reader is consumed once. After end of input the source is exhausted
/// and further connects fail.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    connected: bool,
    finished: bool,
    line: String,
}

impl<R: BufRead> ReaderSource<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            connected: false,
            finished: false,
            line: String::new(),
        }
    }
}

impl ReaderSource<BufReader<File>> {
    /// Source over a JSON-lines capture file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> EventSource for ReaderSource<R> {
    type Error = io::Error;

    fn connect(&mut self) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "event stream already consumed",
            ));
        }
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> io::Result<Option<String>> {
        if !self.connected {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "event stream is not connected",
            ));
        }

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.finished = true;
                self.connected = false;
                return Ok(None);
            }
            let frame = self.line.trim();
            if !frame.is_empty() {
                return Ok(Some(frame.to_string()));
            }
        }
    }

    fn exhausted(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn yields_non_blank_lines_then_closes() {
        let mut source = ReaderSource::new(Cursor::new("a\n\n  b  \r\n\nc"));
        source.connect().expect("connect");

        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().expect("read") {
            frames.push(frame);
        }
        assert_eq!(frames, ["a", "b", "c"]);
        assert!(source.exhausted());
    }

    #[test]
    fn reading_before_connect_fails() {
        let mut source = ReaderSource::new(Cursor::new("a\n"));
        let err = source.next_frame().expect_err("must connect first");
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn reconnect_after_end_of_input_fails() {
        let mut source = ReaderSource::new(Cursor::new(""));
        source.connect().expect("first connect");
        assert_eq!(source.next_frame().expect("read"), None);
        assert!(source.connect().is_err());
    }
}
