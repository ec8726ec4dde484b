//! Parser module
//!
//! The parser reads a journal block by block. The first line of a block tells what it is:
//! - Directive account (skipped)
//! - Directive include (the matching files are parsed in place)
//! - A transaction, whose header is a date and a payee, followed by its postings
//!
//! Parsing runs on its own thread and delivers results through a channel, see [`ParseStream`].

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use std::sync::mpsc::{channel, sync_channel};
use std::thread;

use log::{debug, trace};

use crate::models::Transaction;
use crate::{Error, ParserError};

pub mod expressions;
mod include;
mod lines;
mod stream;
mod tokenizers;
mod utils;

use include::Context;
use lines::{Block, BlockReader};
pub use stream::{CancellationToken, ParseStream};
use stream::{Output, Sink};
use tokenizers::payee::Header;
use tokenizers::{payee, transaction};
use utils::DateParser;

#[derive(Parser)]
#[grammar = "grammar/grammar.pest"]
pub struct GrammarParser;

/// Knobs of a parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// How many transactions may wait in the channel before the parser blocks
    pub channel_capacity: usize,
    /// Parse the files matched by one `include` line in parallel
    pub concurrent_includes: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            channel_capacity: 100,
            concurrent_includes: true,
        }
    }
}

/// Entry point for parsing journals
///
/// The `parse_*` methods stop at the first error of any kind and return it, discarding what was
/// parsed so far. The `stream_*` methods keep going past errors in single blocks and hand out
/// everything they find; only fatal errors (see [`Error::is_fatal`]) end them early.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Parser {
        Parser { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses a file; includes are relative to its directory
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Transaction>, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::cannot_read(path, e))?;
        self.parse_source(&path.to_string_lossy(), BufReader::new(file))
    }

    /// Parses an anonymous source; includes are relative to the working directory
    pub fn parse_reader<R: BufRead + Send>(&self, reader: R) -> Result<Vec<Transaction>, Error> {
        self.parse_source("", reader)
    }

    pub fn parse_str(&self, content: &str) -> Result<Vec<Transaction>, Error> {
        self.parse_reader(Cursor::new(content.as_bytes()))
    }

    /// Starts parsing a file in the background
    ///
    /// The file is opened before returning, so a missing file is reported here and not through
    /// the stream.
    pub fn stream_file<P: AsRef<Path>>(&self, path: P) -> Result<ParseStream, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::cannot_read(path, e))?;
        Ok(self.stream_source(path.to_string_lossy().into_owned(), BufReader::new(file)))
    }

    /// Starts parsing an anonymous source in the background
    pub fn stream_reader<R: BufRead + Send + 'static>(&self, reader: R) -> ParseStream {
        self.stream_source(String::new(), reader)
    }

    fn parse_source<R: BufRead + Send>(
        &self,
        source: &str,
        reader: R,
    ) -> Result<Vec<Transaction>, Error> {
        let (sender, receiver) = sync_channel(self.options.channel_capacity);
        let token = CancellationToken::new();
        let sink = Sink::new(Output::Combined(sender), token.clone());

        thread::scope(|scope| {
            let producer = scope.spawn(move || self.produce(source, reader, sink));
            let mut transactions = Vec::new();
            let mut first_error = None;
            for result in receiver.iter() {
                match result {
                    Ok(transaction) => transactions.push(transaction),
                    Err(err) => {
                        debug!("Stopping at first error: {}", err);
                        token.cancel();
                        first_error = Some(err);
                        break;
                    }
                }
            }
            drop(receiver);
            if let Err(panic) = producer.join() {
                std::panic::resume_unwind(panic);
            }
            match first_error {
                Some(err) => Err(err),
                None => Ok(transactions),
            }
        })
    }

    fn stream_source<R: BufRead + Send + 'static>(&self, source: String, reader: R) -> ParseStream {
        let (transactions, transaction_receiver) = sync_channel(self.options.channel_capacity);
        let (errors, error_receiver) = channel();
        let token = CancellationToken::new();
        let sink = Sink::new(
            Output::Split {
                transactions,
                errors,
            },
            token.clone(),
        );
        let parser = self.clone();
        let handle = thread::spawn(move || parser.produce(&source, reader, sink));
        ParseStream::new(transaction_receiver, error_receiver, token, handle)
    }

    /// Runs a whole parse, sending results and the fatal error, if any, to the sink
    fn produce<R: BufRead>(&self, source: &str, reader: R, sink: Sink) {
        let context = Context::root(source);
        let mut tokenizer = Tokenizer::new(source, reader, &context, &self.options, &sink);
        if let Err(err) = tokenizer.tokenize() {
            sink.abort();
            sink.fatal(err);
        }
        debug!("Done parsing {:?}", source);
    }
}

/// Parses a file with the default options
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>, Error> {
    Parser::default().parse_file(path)
}

/// Parses an anonymous source with the default options
pub fn parse_reader<R: BufRead + Send>(reader: R) -> Result<Vec<Transaction>, Error> {
    Parser::default().parse_reader(reader)
}

/// Parses a string with the default options
pub fn parse_str(content: &str) -> Result<Vec<Transaction>, Error> {
    Parser::default().parse_str(content)
}

/// Parses an anonymous source in the background with the default options
pub fn parse_stream<R: BufRead + Send + 'static>(reader: R) -> ParseStream {
    Parser::default().stream_reader(reader)
}

/// Walks the blocks of one source
///
/// Transactions and the errors of single blocks go to the sink as they are found. Fatal errors
/// are returned and end the walk.
struct Tokenizer<'a, R> {
    blocks: BlockReader<R>,
    dates: DateParser,
    context: &'a Context<'a>,
    options: &'a ParserOptions,
    sink: &'a Sink,
    /// Comments waiting for the next transaction of this source
    pending_comments: Vec<String>,
}

impl<'a, R: BufRead> Tokenizer<'a, R> {
    fn new(
        source: &str,
        reader: R,
        context: &'a Context<'a>,
        options: &'a ParserOptions,
        sink: &'a Sink,
    ) -> Self {
        Tokenizer {
            blocks: BlockReader::new(source, reader),
            dates: DateParser::new(),
            context,
            options,
            sink,
            pending_comments: Vec::new(),
        }
    }

    fn source(&self) -> &str {
        self.blocks.source()
    }

    fn tokenize(&mut self) -> Result<(), Error> {
        loop {
            if self.sink.stopped() {
                debug!("Stopping parse of {:?}", self.source());
                return Ok(());
            }
            let block = match self.blocks.next_block() {
                Ok(Some(block)) => block,
                Ok(None) => return Ok(()),
                Err(e) => return Err(Error::cannot_read(self.source(), e)),
            };
            trace!(
                "{}:{}-{}: block",
                block.source,
                block.line_number,
                block.last_line_number()
            );
            if !self.block(block)? {
                return Ok(());
            }
        }
    }

    /// Handles a block, returns false when results are no longer wanted
    fn block(&mut self, block: Block) -> Result<bool, Error> {
        let header_index = match block.header_index() {
            Some(index) => index,
            None => {
                self.hold_comments(&block, block.lines.len());
                return Ok(true);
            }
        };
        let header = &block.lines[header_index];
        match payee::parse(&header.text, &mut self.dates) {
            Err(e) => {
                // A header without a payee still hands its own comment on
                let held = match e {
                    ParserError::PayeeLine(_) => header_index + 1,
                    _ => header_index,
                };
                self.hold_comments(&block, held);
                Ok(self.sink.error(Error::transaction(
                    &block.source,
                    header.number,
                    e,
                )))
            }
            Ok(Header::Account) => {
                debug!(
                    "{}:{}: skipping account directive",
                    block.source, header.number
                );
                self.hold_comments(&block, header_index);
                Ok(true)
            }
            Ok(Header::Include { pattern }) => {
                self.hold_comments(&block, header_index);
                self.include(pattern, header.number)?;
                for line in &block.lines[header_index + 1..] {
                    match line.text.split_once(' ') {
                        Some(("include", pattern)) => self.include(pattern.trim(), line.number)?,
                        _ if line.text.is_empty() => {}
                        _ => debug!(
                            "{}:{}: ignoring line in include block",
                            block.source, line.number
                        ),
                    }
                }
                Ok(true)
            }
            Ok(Header::Transaction { date, payee }) => {
                let mut comments = self.pending_comments.clone();
                comments.extend(
                    block.lines[..header_index]
                        .iter()
                        .map(|line| line.comment.clone()),
                );
                let parsed = transaction::parse(
                    date,
                    payee,
                    &header.comment,
                    &block.lines[header_index + 1..],
                    block.last_line_number(),
                    comments,
                );
                match parsed {
                    Ok(transaction) => {
                        self.pending_comments.clear();
                        Ok(self.sink.transaction(transaction))
                    }
                    Err((line, cause)) => {
                        Ok(self.sink.error(Error::transaction(&block.source, line, cause)))
                    }
                }
            }
        }
    }

    /// Keeps the comments of the first `count` lines for the next transaction
    fn hold_comments(&mut self, block: &Block, count: usize) {
        self.pending_comments.extend(
            block.lines[..count]
                .iter()
                .filter(|line| !line.comment.is_empty())
                .map(|line| line.comment.clone()),
        );
    }
}
