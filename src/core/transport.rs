//! Device transport collaborator
//!
//! The console never opens ports itself. It writes through a [`Transport`]
//! and is handed received chunks by whoever owns the device, typically a
//! reader thread like the one [`spawn_reader`] starts.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

/// Write side of a connected device
pub trait Transport: Send {
    /// Whether writes can currently reach the device
    fn is_connected(&self) -> bool;

    /// Write bytes, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Transport that loops every write back as received data.
///
/// Useful for local testing without hardware: written bytes can be drained
/// with [`LoopbackTransport::take_incoming`] and fed back into the console.
#[derive(Debug)]
pub struct LoopbackTransport {
    connected: bool,
    incoming: Vec<Vec<u8>>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            connected: true,
            incoming: Vec::new(),
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Chunks written since the last call
    pub fn take_incoming(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.incoming)
    }
}

impl Transport for LoopbackTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "loopback closed"));
        }
        self.incoming.push(data.to_vec());
        Ok(data.len())
    }
}

/// Background reader delivering raw chunks over a channel
pub struct ChunkReader {
    /// Received chunks in arrival order
    pub chunks: Receiver<Vec<u8>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ChunkReader {
    /// Check if the reader thread is still producing data
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the reader to stop.
    ///
    /// Only checked between reads: a read blocked on a silent device keeps
    /// the thread alive until it returns.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Stops the reader and joins its thread. Blocks until the pending read
/// returns, so close the source first if it may never produce data.
impl Drop for ChunkReader {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawn a thread reading `source` in chunks of at most `chunk_size` bytes
pub fn spawn_reader<R>(mut source: R, chunk_size: usize) -> ChunkReader
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();

    let handle = thread::spawn(move || {
        let mut buffer = vec![0u8; chunk_size.max(1)];

        while flag.load(Ordering::SeqCst) {
            match source.read(&mut buffer) {
                Ok(0) => {
                    debug!("Reader reached end of stream");
                    break;
                }
                Ok(n) => {
                    if tx.send(buffer[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Read error: {}", e);
                    break;
                }
            }
        }

        flag.store(false, Ordering::SeqCst);
    });

    ChunkReader {
        chunks: rx,
        running,
        handle: Some(handle),
    }
}
