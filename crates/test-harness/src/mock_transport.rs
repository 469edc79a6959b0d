use core_types::{Transport, TransportError};
use futures::stream::StreamExt;
use futures_channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Produces controller output in reaction to bytes written by the bridge.
///
/// Called synchronously from `write`, so replies are queued before the
/// write future completes.
pub trait Responder: Send + 'static {
    fn respond(&mut self, written: &[u8]) -> Vec<Vec<u8>>;
}

impl<F> Responder for F
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    fn respond(&mut self, written: &[u8]) -> Vec<Vec<u8>> {
        self(written)
    }
}

struct Shared {
    writes: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
}

/// In-memory transport. Reads come from [`MockHandle::inject`] (or from the
/// responder), writes are recorded and forwarded to [`MockHandle::next_write`].
pub struct MockTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    responder: Mutex<Option<Box<dyn Responder>>>,
    shared: Arc<Shared>,
}

/// Test-side handle to a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    write_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded();
        let (write_tx, write_rx) = mpsc::unbounded();
        let shared = Arc::new(Shared {
            writes: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });

        let transport = Self {
            inbound: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx: inbound_tx.clone(),
            write_tx,
            responder: Mutex::new(None),
            shared: shared.clone(),
        };
        let handle = MockHandle {
            inbound_tx,
            write_rx: Arc::new(tokio::sync::Mutex::new(write_rx)),
            shared,
        };
        (transport, handle)
    }

    /// Transport whose writes are answered by `responder`.
    pub fn with_responder(responder: impl Responder) -> (Self, MockHandle) {
        let (transport, handle) = Self::new();
        *transport
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(responder));
        (transport, handle)
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl Transport for MockTransport {
    async fn read_chunk(&self) -> Result<Vec<u8>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        let mut inbound = self.inbound.lock().await;
        loop {
            match inbound.next().await {
                Some(chunk) if chunk.is_empty() => continue,
                Some(chunk) => return Ok(chunk),
                None => return Err(TransportError::NotConnected),
            }
        }
    }

    async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::NotConnected);
        }
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.to_vec());
        let _ = self.write_tx.unbounded_send(data.to_vec());

        let replies = match self
            .responder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            Some(responder) => responder.respond(data),
            None => Vec::new(),
        };
        for reply in replies {
            let _ = self.inbound_tx.unbounded_send(reply);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shared.closed.store(true, Ordering::Release);
        self.inbound_tx.close_channel();
        self.write_tx.close_channel();
        Ok(())
    }
}

impl MockHandle {
    /// Queue raw bytes for the transport to read.
    pub fn inject(&self, bytes: &[u8]) {
        let _ = self.inbound_tx.unbounded_send(bytes.to_vec());
    }

    /// Queue one line, terminated with `\r\n` like the firmware does.
    pub fn inject_line(&self, line: &str) {
        self.inject(format!("{}\r\n", line).as_bytes());
    }

    pub fn inject_lines(&self, lines: &[&str]) {
        for line in lines {
            self.inject_line(line);
        }
    }

    /// Simulate the device going away: pending and future reads see end-of-stream.
    pub fn hang_up(&self) {
        self.inbound_tx.close_channel();
    }

    /// Wait for the next write made through the transport.
    pub async fn next_write(&self) -> Option<Vec<u8>> {
        self.write_rx.lock().await.next().await
    }

    /// Every write so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All written bytes concatenated, lossily decoded.
    pub fn written_text(&self) -> String {
        let bytes: Vec<u8> = self.writes().concat();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
