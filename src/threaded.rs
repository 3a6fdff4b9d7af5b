// threaded.rs

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use std::fmt;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

use crate::charset::CharRead;
use crate::error::{GzLinesError, Result};
use crate::line_reader::{LineRead, LineReader};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// One entry on the hand-off queue. Errors travel in order with the lines
/// read before them.
enum Handoff {
    Line(String),
    Failed(GzLinesError),
    End,
}

/// Runs a [`LineReader`] on a background thread and hands its lines to the
/// caller through a bounded queue.
///
/// The producer thread blocks when the queue is full, so at most
/// `queue_capacity` lines sit between the two threads. `line_number` counts
/// lines handed to the caller, not lines the producer has read.
///
/// Only `read_line`, `line_number`, `close` and `is_closed` are available;
/// the character-level operations return [`GzLinesError::Unsupported`].
///
/// Once the end of stream or an error has been delivered, or after `close`,
/// the reader is torn down and further `read_line` calls fail with
/// [`GzLinesError::StreamClosed`]. Lines still queued at `close` are dropped.
pub struct ThreadedLineReader {
    lines: Option<Receiver<Handoff>>,
    /// Dropped to cancel the producer.
    shutdown: Option<Sender<()>>,
    producer: Option<JoinHandle<()>>,
    line_number: u64,
    queue_capacity: usize,
    closed: bool,
}

impl fmt::Debug for ThreadedLineReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedLineReader")
            .field("line_number", &self.line_number)
            .field("queued", &self.queued())
            .field("queue_capacity", &self.queue_capacity)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ThreadedLineReader {
    pub fn new<S>(reader: LineReader<S>) -> Result<Self>
    where
        S: CharRead + Send + 'static,
    {
        Self::spawn(reader, DEFAULT_QUEUE_CAPACITY)
    }

    /// Move `reader` onto a new producer thread feeding a queue of
    /// `queue_capacity` entries.
    pub fn spawn<S>(reader: LineReader<S>, queue_capacity: usize) -> Result<Self>
    where
        S: CharRead + Send + 'static,
    {
        if queue_capacity == 0 {
            return Err(GzLinesError::InvalidArgument(
                "hand-off queue capacity must be greater than zero".into(),
            ));
        }
        let (line_tx, line_rx) = bounded(queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let producer = thread::Builder::new()
            .name("gzlines-producer".into())
            .spawn(move || produce(reader, line_tx, shutdown_rx))?;
        debug!(queue_capacity, "started background line reader");

        Ok(Self {
            lines: Some(line_rx),
            shutdown: Some(shutdown_tx),
            producer: Some(producer),
            line_number: 0,
            queue_capacity,
            closed: false,
        })
    }

    /// Lines waiting in the hand-off queue.
    pub fn queued(&self) -> usize {
        self.lines.as_ref().map_or(0, |rx| rx.len())
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    fn teardown(&mut self) {
        // Disconnect both channels before joining so a producer blocked on a
        // full queue wakes up and exits.
        drop(self.shutdown.take());
        if let Some(rx) = self.lines.take() {
            let discarded = rx.len();
            drop(rx);
            if discarded > 0 {
                trace!(discarded, "discarding queued lines");
            }
        }
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                warn!("background line reader thread panicked");
            }
        }
        self.closed = true;
    }
}

fn cancelled(shutdown: &Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

fn produce<S: CharRead>(mut reader: LineReader<S>, lines: Sender<Handoff>, shutdown: Receiver<()>) {
    trace!("producer started");
    loop {
        if cancelled(&shutdown) {
            debug!("background line reader cancelled");
            break;
        }
        let entry = match reader.read_line() {
            Ok(Some(line)) => Handoff::Line(line),
            Ok(None) => Handoff::End,
            Err(e) => Handoff::Failed(e),
        };
        let last = !matches!(entry, Handoff::Line(_));
        let delivered = select! {
            send(lines, entry) -> sent => sent.is_ok(),
            recv(shutdown) -> _ => false,
        };
        if !delivered || last {
            break;
        }
    }
    reader.close();
    trace!(lines = reader.line_number(), "producer finished");
}

impl LineRead for ThreadedLineReader {
    fn read_line(&mut self) -> Result<Option<String>> {
        let lines = self.lines.as_ref().ok_or(GzLinesError::StreamClosed)?;
        match lines.recv() {
            Ok(Handoff::Line(line)) => {
                self.line_number += 1;
                Ok(Some(line))
            }
            Ok(Handoff::End) => {
                self.teardown();
                Ok(None)
            }
            Ok(Handoff::Failed(e)) => {
                self.teardown();
                Err(e)
            }
            // The producer always sends `End` or `Failed` before hanging up
            // unless it panicked.
            Err(_) => {
                self.teardown();
                Err(GzLinesError::ProducerPanicked)
            }
        }
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn read_char(&mut self) -> Result<Option<char>> {
        Err(GzLinesError::Unsupported("read_char"))
    }

    fn read_into(&mut self, _buf: &mut [char]) -> Result<usize> {
        Err(GzLinesError::Unsupported("read_into"))
    }

    fn skip(&mut self, _n: u64) -> Result<u64> {
        Err(GzLinesError::Unsupported("skip"))
    }

    fn ready(&mut self) -> Result<bool> {
        Err(GzLinesError::Unsupported("ready"))
    }

    fn mark(&mut self, _read_ahead_limit: usize) -> Result<()> {
        Err(GzLinesError::Unsupported("mark"))
    }

    fn reset(&mut self) -> Result<()> {
        Err(GzLinesError::Unsupported("reset"))
    }

    fn close(&mut self) {
        if !self.closed {
            self.teardown();
            debug!(lines = self.line_number, "background line reader closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ThreadedLineReader {
    fn drop(&mut self) {
        self.close();
    }
}
