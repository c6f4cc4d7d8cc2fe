//! Line reader for extract streams
//!
//! Reads raw bytes up to each `\n` so a single undecodable line (legacy tape
//! exports are not always clean UTF-8) is reported as a bad line instead of
//! failing the whole stream the way `BufRead::lines` would.

use std::io::{self, BufRead};

/// Content of one extract line, terminator removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractLine {
    /// Decoded line text, verbatim apart from the `\n` / `\r\n` terminator
    Text(String),
    /// Empty or whitespace-only line
    Blank,
    /// Line bytes are not valid UTF-8
    Undecodable,
}

/// Extract line with its 1-based position in the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedLine {
    pub number: usize,
    pub line: ExtractLine,
}

/// Iterator over the lines of an already-opened extract reader
pub struct ExtractLines<R> {
    reader: R,
    buf: Vec<u8>,
    number: usize,
}

impl<R: BufRead> ExtractLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            number: 0,
        }
    }
}

impl<R: BufRead> Iterator for ExtractLines<R> {
    type Item = io::Result<NumberedLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.number += 1;

                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }

                let line = match std::str::from_utf8(&self.buf) {
                    Ok(text) if text.trim().is_empty() => ExtractLine::Blank,
                    Ok(text) => ExtractLine::Text(text.to_string()),
                    Err(_) => ExtractLine::Undecodable,
                };

                Some(Ok(NumberedLine {
                    number: self.number,
                    line,
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &[u8]) -> Vec<NumberedLine> {
        ExtractLines::new(Cursor::new(input.to_vec()))
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_strips_lf_and_crlf() {
        let lines = collect(b"a\nb\r\nc");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].line, ExtractLine::Text("a".to_string()));
        assert_eq!(lines[1].line, ExtractLine::Text("b".to_string()));
        assert_eq!(lines[2].line, ExtractLine::Text("c".to_string()));
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn test_preserves_inner_whitespace() {
        let lines = collect(b"  a ## b  \n");
        assert_eq!(lines[0].line, ExtractLine::Text("  a ## b  ".to_string()));
    }

    #[test]
    fn test_blank_lines() {
        let lines = collect(b"\n   \r\nx\n");
        assert_eq!(lines[0].line, ExtractLine::Blank);
        assert_eq!(lines[1].line, ExtractLine::Blank);
        assert_eq!(lines[2].line, ExtractLine::Text("x".to_string()));
    }

    #[test]
    fn test_undecodable_line_does_not_stop_stream() {
        let lines = collect(b"ok\n\xff\xfe bad\nstill ok\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].line, ExtractLine::Undecodable);
        assert_eq!(lines[2].line, ExtractLine::Text("still ok".to_string()));
    }

    #[test]
    fn test_empty_input() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn test_read_error_is_surfaced() {
        struct FailingReader;
        impl io::Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "tape offline"))
            }
        }

        let mut lines = ExtractLines::new(io::BufReader::new(FailingReader));
        let err = lines.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
