// src/events/mock.rs
//! Scripted in-memory connector for delivery tests

use crate::events::connection::{Connection, Connector, Endpoint};
use crate::utils::errors::{EventsError, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the next `connect` call does
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConnectScript {
    Refuse,
    Accept(WriteScript),
}

/// How an accepted connection behaves when written to
#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteScript {
    /// Accept every byte
    Full,
    /// Accept at most `n` bytes per write call
    Chunked(usize),
    /// Accept `n` bytes in total, then fail with a broken pipe
    FailAfter(usize),
    /// Accept `n` bytes in total, then report zero bytes written
    ZeroAfter(usize),
    /// Accept `n` bytes, fail one write with `Interrupted`, then accept the rest
    InterruptAfter(usize),
}

pub(crate) struct MockConnector {
    scripts: Mutex<VecDeque<ConnectScript>>,
    attempts: Arc<AtomicUsize>,
    written: Sender<Vec<u8>>,
}

/// Test-side view of a [`MockConnector`]
pub(crate) struct MockHandle {
    attempts: Arc<AtomicUsize>,
    written: Receiver<Vec<u8>>,
}

impl MockConnector {
    /// Scripts are consumed in order; once exhausted every connect succeeds
    /// with [`WriteScript::Full`].
    pub(crate) fn new(scripts: Vec<ConnectScript>) -> (Self, MockHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let attempts = Arc::new(AtomicUsize::new(0));
        let connector = Self {
            scripts: Mutex::new(scripts.into()),
            attempts: Arc::clone(&attempts),
            written: tx,
        };
        (connector, MockHandle { attempts, written: rx })
    }
}

impl Connector for MockConnector {
    fn connect(&self, endpoint: &Endpoint, _timeout: Duration) -> Result<Box<dyn Connection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or(ConnectScript::Accept(WriteScript::Full));

        match script {
            ConnectScript::Refuse => Err(EventsError::ConnectionFailed(format!(
                "{} refused",
                endpoint
            ))),
            ConnectScript::Accept(writes) => Ok(Box::new(MockConnection {
                script: writes,
                buffer: Vec::new(),
                interrupted: false,
                written: self.written.clone(),
            })),
        }
    }
}

impl MockHandle {
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Bytes received by each connection, in the order connections were
    /// dropped
    pub(crate) fn received(&self) -> Vec<Vec<u8>> {
        self.written.try_iter().collect()
    }
}

struct MockConnection {
    script: WriteScript,
    buffer: Vec<u8>,
    interrupted: bool,
    written: Sender<Vec<u8>>,
}

impl Write for MockConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = match self.script {
            WriteScript::Full => buf.len(),
            WriteScript::Chunked(n) => buf.len().min(n),
            WriteScript::FailAfter(limit) => {
                let room = limit.saturating_sub(self.buffer.len());
                if room == 0 {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"));
                }
                buf.len().min(room)
            }
            WriteScript::ZeroAfter(limit) => buf.len().min(limit.saturating_sub(self.buffer.len())),
            WriteScript::InterruptAfter(limit) => {
                let room = limit.saturating_sub(self.buffer.len());
                if room == 0 && !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
                }
                if self.interrupted {
                    buf.len()
                } else {
                    buf.len().min(room)
                }
            }
        };

        self.buffer.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for MockConnection {}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let _ = self.written.send(std::mem::take(&mut self.buffer));
    }
}
