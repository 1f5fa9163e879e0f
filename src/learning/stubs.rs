use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::learning::serial::{SerialPort, Transport};

/// Replays fixed chunks on every open.
pub struct ScriptedPort {
    chunks: Vec<Vec<u8>>,
    hold_open: bool,
    opened: AtomicUsize,
}

impl ScriptedPort {
    /// Ends the stream after the last chunk.
    pub fn closing(chunks: &[&str]) -> ScriptedPort {
        ScriptedPort::new(chunks, false)
    }

    /// Keeps the stream open after the last chunk, like an idle device.
    pub fn holding(chunks: &[&str]) -> ScriptedPort {
        ScriptedPort::new(chunks, true)
    }

    fn new(chunks: &[&str], hold_open: bool) -> ScriptedPort {
        ScriptedPort {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            hold_open,
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialPort for ScriptedPort {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn open(&self) -> io::Result<Transport> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Script {
            chunks: self.chunks.iter().cloned().collect(),
            hold_open: self.hold_open,
        }))
    }
}

struct Script {
    chunks: VecDeque<Vec<u8>>,
    hold_open: bool,
}

impl AsyncRead for Script {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                buf.put_slice(&chunk);
                Poll::Ready(Ok(()))
            }
            // Only a disconnect ends the read.
            None if self.hold_open => Poll::Pending,
            None => Poll::Ready(Ok(())),
        }
    }
}

pub struct FailingPort;

#[async_trait]
impl SerialPort for FailingPort {
    fn name(&self) -> String {
        "failing".to_string()
    }

    async fn open(&self) -> io::Result<Transport> {
        Err(io::Error::new(io::ErrorKind::NotFound, "no such device"))
    }
}
