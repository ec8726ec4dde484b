//! Delivery of parse results
//!
//! Producers run on their own threads and hand results over through channels. The transactions
//! channel is bounded: a producer that gets ahead of its consumer blocks until there is room or
//! the consumer drops its receiver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::models::Transaction;
use crate::Error;

/// A shared flag telling producers to stop
///
/// Producers look at it between blocks and before every send.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Output {
    /// Everything in one queue, for the batch entry points
    Combined(SyncSender<Result<Transaction, Error>>),
    /// Transactions and errors apart, for [`ParseStream`]
    Split {
        transactions: SyncSender<Transaction>,
        errors: Sender<Error>,
    },
    /// Held back until the branch it belongs to is replayed
    Buffered(Sender<Result<Transaction, Error>>),
}

/// Where producers put their results
///
/// Clones share the output and both stop flags: `cancelled` is raised by the consumer, `aborted`
/// by a producer that hit a fatal error.
#[derive(Debug, Clone)]
pub(crate) struct Sink {
    output: Output,
    cancelled: CancellationToken,
    aborted: Arc<AtomicBool>,
}

impl Sink {
    pub(crate) fn new(output: Output, cancelled: CancellationToken) -> Sink {
        Sink {
            output,
            cancelled,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether producers should stop at the next block boundary
    pub(crate) fn stopped(&self) -> bool {
        self.cancelled.is_cancelled() || self.aborted.load(Ordering::SeqCst)
    }

    /// Tells every producer sharing this sink to stop
    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether results of parallel producers may reach the consumer in any order
    ///
    /// Only a stream does; batch results keep the order a sequential parse gives.
    pub(crate) fn interleaves(&self) -> bool {
        matches!(self.output, Output::Split { .. })
    }

    /// A sink buffering everything for one parallel branch
    ///
    /// The branch follows the consumer's cancellation but has its own abort flag, so a sibling
    /// failing does not stop it. The buffer goes to [`Sink::replay`] once the branch is done.
    pub(crate) fn branch(&self) -> (Sink, Receiver<Result<Transaction, Error>>) {
        let (sender, receiver) = channel();
        (Sink::new(Output::Buffered(sender), self.cancelled.clone()), receiver)
    }

    /// Forwards what a finished branch buffered, returns false if the producer should stop
    pub(crate) fn replay(&self, buffer: Receiver<Result<Transaction, Error>>) -> bool {
        for result in buffer.try_iter() {
            let delivered = match result {
                Ok(transaction) => self.transaction(transaction),
                Err(error) => self.error(error),
            };
            if !delivered {
                return false;
            }
        }
        true
    }

    /// Sends a transaction, returns false if the producer should stop
    pub(crate) fn transaction(&self, transaction: Transaction) -> bool {
        if self.stopped() {
            return false;
        }
        match &self.output {
            Output::Combined(sender) => send(sender, Ok(transaction), &self.cancelled),
            Output::Split { transactions, .. } => send(transactions, transaction, &self.cancelled),
            Output::Buffered(sender) => buffer(sender, Ok(transaction)),
        }
    }

    /// Sends an error that only cost one block, returns false if the producer should stop
    pub(crate) fn error(&self, error: Error) -> bool {
        if self.stopped() {
            return false;
        }
        self.deliver(error)
    }

    /// Sends the error that ended the parse
    ///
    /// Unlike [`Sink::error`] this goes through after [`Sink::abort`], only a cancelled consumer
    /// drops it.
    pub(crate) fn fatal(&self, error: Error) {
        if self.cancelled.is_cancelled() {
            debug!("Dropping fatal error, parse was cancelled: {}", error);
            return;
        }
        self.deliver(error);
    }

    fn deliver(&self, error: Error) -> bool {
        match &self.output {
            Output::Combined(sender) => send(sender, Err(error), &self.cancelled),
            Output::Split { errors, .. } => match errors.send(error) {
                Ok(()) => true,
                Err(_) => {
                    warn!("Error receiver is gone, stopping");
                    false
                }
            },
            Output::Buffered(sender) => buffer(sender, Err(error)),
        }
    }
}

/// Blocks until the value is queued; a cancelled parse or a dropped receiver stops the producer
fn send<T>(sender: &SyncSender<T>, value: T, cancelled: &CancellationToken) -> bool {
    if cancelled.is_cancelled() {
        debug!("Parse cancelled, not sending");
        return false;
    }
    match sender.send(value) {
        Ok(()) => true,
        Err(_) => {
            debug!("Receiver is gone, stopping");
            false
        }
    }
}

fn buffer(sender: &Sender<Result<Transaction, Error>>, value: Result<Transaction, Error>) -> bool {
    match sender.send(value) {
        Ok(()) => true,
        Err(_) => {
            debug!("Branch buffer is gone, stopping");
            false
        }
    }
}

/// The background thread of a [`ParseStream`]
///
/// Dropping it cancels the parse without waiting: the thread ends at its next block, or when the
/// receiver it is blocked on is dropped.
#[derive(Debug)]
struct Producer {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        if self.handle.take().is_some() {
            debug!("Parse stream dropped, cancelling");
            self.token.cancel();
        }
    }
}

/// A parse running in the background
///
/// Transactions arrive on `transactions` in file order (transactions from files pulled in by the
/// same `include` line may interleave). Errors arrive on `errors`, which is unbounded so that
/// draining `transactions` first never blocks the producer. Both channels close when the parse
/// is over.
///
/// The receivers can be moved out and read on different threads. Dropping the stream, or
/// whatever is left of it, cancels the parse.
#[derive(Debug)]
pub struct ParseStream {
    pub transactions: Receiver<Transaction>,
    pub errors: Receiver<Error>,
    producer: Producer,
}

impl ParseStream {
    pub(crate) fn new(
        transactions: Receiver<Transaction>,
        errors: Receiver<Error>,
        token: CancellationToken,
        handle: JoinHandle<()>,
    ) -> ParseStream {
        ParseStream {
            transactions,
            errors,
            producer: Producer {
                token,
                handle: Some(handle),
            },
        }
    }

    /// Asks the producers to stop; results already queued can still be read
    pub fn cancel(&self) {
        self.producer.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.producer.token.clone()
    }

    /// Waits for the parse to finish and returns everything it produced
    pub fn collect(self) -> (Vec<Transaction>, Vec<Error>) {
        let ParseStream {
            transactions,
            errors,
            producer,
        } = self;
        let transactions: Vec<Transaction> = transactions.iter().collect();
        let errors: Vec<Error> = errors.iter().collect();
        producer.join();
        (transactions, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::mpsc::sync_channel;
    use std::thread;
    use std::time::Duration;

    fn transaction(payee: &str) -> Transaction {
        Transaction::new(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(), payee)
    }

    #[test]
    fn token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn dropped_receiver_unblocks_full_channel() {
        let (sender, receiver) = sync_channel(1);
        let token = CancellationToken::new();
        let sink = Sink::new(Output::Combined(sender), token.clone());
        assert!(sink.transaction(transaction("first")));

        let blocked = {
            let sink = sink.clone();
            thread::spawn(move || sink.transaction(transaction("second")))
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        drop(receiver);
        assert!(!blocked.join().unwrap());
        assert!(!sink.transaction(transaction("third")));
    }

    #[test]
    fn cancelled_sink_sends_nothing() {
        let (sender, receiver) = sync_channel(10);
        let token = CancellationToken::new();
        let sink = Sink::new(Output::Combined(sender), token.clone());
        token.cancel();
        assert!(!sink.transaction(transaction("late")));
        drop(sink);
        assert_eq!(receiver.iter().count(), 0);
    }

    #[test]
    fn branch_replays_in_order() {
        let (sender, receiver) = sync_channel(10);
        let sink = Sink::new(Output::Combined(sender), CancellationToken::new());
        assert!(!sink.interleaves());

        let (branch, buffer) = sink.branch();
        assert!(branch.transaction(transaction("one")));
        assert!(branch.error(Error::transaction(
            "",
            3,
            crate::LedgerError::NoEmptyPosting
        )));
        assert!(branch.transaction(transaction("two")));
        branch.abort();
        assert!(!branch.transaction(transaction("after abort")));
        assert!(!sink.stopped());
        drop(branch);

        assert!(sink.replay(buffer));
        drop(sink);
        let received: Vec<_> = receiver.iter().collect();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0].as_ref().unwrap().payee, "one");
        assert_eq!(received[1].as_ref().unwrap_err().line(), 3);
        assert_eq!(received[2].as_ref().unwrap().payee, "two");
    }

    #[test]
    fn branch_follows_cancellation() {
        let (sender, _receiver) = sync_channel(10);
        let token = CancellationToken::new();
        let sink = Sink::new(Output::Combined(sender), token.clone());
        let (branch, _buffer) = sink.branch();
        token.cancel();
        assert!(branch.stopped());
    }

    #[test]
    fn abort_lets_fatal_error_through() {
        let (sender, receiver) = sync_channel(10);
        let sink = Sink::new(Output::Combined(sender), CancellationToken::new());
        sink.abort();
        assert!(sink.stopped());
        assert!(!sink.transaction(transaction("dropped")));
        sink.fatal(Error::cannot_read(
            "missing.journal",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
        drop(sink);
        let received: Vec<_> = receiver.iter().collect();
        assert_eq!(received.len(), 1);
        assert!(received[0].as_ref().unwrap_err().is_fatal());
    }

    #[test]
    fn split_output() {
        let (transactions, transaction_receiver) = sync_channel(1);
        let (errors, error_receiver) = channel();
        let sink = Sink::new(
            Output::Split {
                transactions,
                errors,
            },
            CancellationToken::new(),
        );
        assert!(sink.interleaves());
        assert!(sink.transaction(transaction("one")));
        for line in 1..5 {
            assert!(sink.error(Error::transaction(
                "",
                line,
                crate::LedgerError::NoEmptyPosting
            )));
        }
        drop(sink);
        assert_eq!(transaction_receiver.iter().count(), 1);
        assert_eq!(error_receiver.iter().count(), 4);
    }

    #[test]
    fn gone_receiver_stops_producer() {
        let (sender, receiver) = sync_channel(1);
        drop(receiver);
        let sink = Sink::new(Output::Combined(sender), CancellationToken::new());
        assert!(!sink.transaction(transaction("nobody")));
    }
}
