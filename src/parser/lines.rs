//! Line scanner and block assembler
//!
//! A block is a run of lines between blank lines. Lines that only hold a comment are not blank
//! and stay in their block.

use std::io;
use std::io::BufRead;

use super::tokenizers::comment::split_comment;

/// A line with its comment taken apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    /// 1-based
    pub number: usize,
    pub text: String,
    pub comment: String,
}

impl Line {
    pub(crate) fn is_blank(&self) -> bool {
        self.text.is_empty() && self.comment.is_empty()
    }
}

/// Reads lines one at a time and keeps count of them, blank ones included
pub(crate) struct LineScanner<R> {
    reader: R,
    source: String,
    line: usize,
    buffer: Vec<u8>,
}

impl<R: BufRead> LineScanner<R> {
    pub(crate) fn new(source: &str, reader: R) -> LineScanner<R> {
        LineScanner {
            reader,
            source: source.to_string(),
            line: 0,
            buffer: Vec::new(),
        }
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    #[cfg(test)]
    pub(crate) fn line_number(&self) -> usize {
        self.line
    }

    pub(crate) fn next_line(&mut self) -> io::Result<Option<Line>> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        let raw = String::from_utf8_lossy(&self.buffer);
        let (text, comment) = split_comment(raw.trim_end_matches(&['\n', '\r'][..]));
        Ok(Some(Line {
            number: self.line,
            text: text.to_string(),
            comment: comment.to_string(),
        }))
    }
}

/// A contiguous run of non-blank lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub source: String,
    /// Line number of the first line
    pub line_number: usize,
    pub lines: Vec<Line>,
}

impl Block {
    pub(crate) fn last_line_number(&self) -> usize {
        self.lines.last().map_or(self.line_number, |l| l.number)
    }

    /// Index of the first line with something other than a comment
    pub(crate) fn header_index(&self) -> Option<usize> {
        self.lines.iter().position(|l| !l.text.is_empty())
    }
}

/// Groups the lines of a scanner into blocks
pub(crate) struct BlockReader<R> {
    scanner: LineScanner<R>,
}

impl<R: BufRead> BlockReader<R> {
    pub(crate) fn new(source: &str, reader: R) -> BlockReader<R> {
        BlockReader {
            scanner: LineScanner::new(source, reader),
        }
    }

    pub(crate) fn source(&self) -> &str {
        self.scanner.source()
    }

    pub(crate) fn next_block(&mut self) -> io::Result<Option<Block>> {
        let mut lines: Vec<Line> = Vec::new();
        while let Some(line) = self.scanner.next_line()? {
            if line.is_blank() {
                if lines.is_empty() {
                    continue;
                }
                break;
            }
            lines.push(line);
        }
        let line_number = match lines.first() {
            None => return Ok(None),
            Some(first) => first.number,
        };
        Ok(Some(Block {
            source: self.scanner.source().to_string(),
            line_number,
            lines,
        }))
    }

    #[cfg(test)]
    fn line_number(&self) -> usize {
        self.scanner.line_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(content: &str) -> BlockReader<Cursor<Vec<u8>>> {
        BlockReader::new("simple", Cursor::new(content.as_bytes().to_vec()))
    }

    #[test]
    fn empty_input_has_no_blocks() {
        assert_eq!(reader("").next_block().unwrap(), None);
        let mut blank = reader("\n\n  \n\t\n\n");
        assert_eq!(blank.next_block().unwrap(), None);
        assert_eq!(blank.line_number(), 5);
    }

    #[test]
    fn lines_are_counted_and_trimmed() {
        let mut scanner = LineScanner::new("", Cursor::new(b"a\r\n\n   b  ; c\n".to_vec()));
        let first = scanner.next_line().unwrap().unwrap();
        assert_eq!((first.number, first.text.as_str()), (1, "a"));
        assert!(scanner.next_line().unwrap().unwrap().is_blank());
        let third = scanner.next_line().unwrap().unwrap();
        assert_eq!(third.number, 3);
        assert_eq!(third.text, "b");
        assert_eq!(third.comment, "; c");
        assert_eq!(scanner.next_line().unwrap(), None);
        assert_eq!(scanner.line_number(), 3);
    }

    #[test]
    fn blocks() {
        let mut blocks = reader(
            "; test
account bam:bam
	subacc line  ; sub comment
	another subacc line

1970/01/01 Payee
	Assets       50
	Expenses



account endofledger",
        );
        let first = blocks.next_block().unwrap().unwrap();
        assert_eq!(first.source, "simple");
        assert_eq!(first.line_number, 1);
        assert_eq!(first.last_line_number(), 4);
        let texts: Vec<&str> = first.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["", "account bam:bam", "subacc line", "another subacc line"]
        );
        assert_eq!(first.lines[0].comment, "; test");
        assert_eq!(first.header_index(), Some(1));

        let second = blocks.next_block().unwrap().unwrap();
        assert_eq!(second.line_number, 6);
        assert_eq!(second.lines.len(), 3);
        assert_eq!(second.header_index(), Some(0));

        let third = blocks.next_block().unwrap().unwrap();
        assert_eq!(third.line_number, 12);
        assert_eq!(third.lines[0].text, "account endofledger");
        assert_eq!(blocks.next_block().unwrap(), None);
    }

    #[test]
    fn comment_only_block() {
        let mut blocks = reader("; one\n; two\n\n");
        let block = blocks.next_block().unwrap().unwrap();
        assert_eq!(block.header_index(), None);
        assert_eq!(block.lines.len(), 2);
    }
}
