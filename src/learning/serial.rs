use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::learning::framing::LineFramer;

const CHUNK_SIZE: usize = 256;

pub type Transport = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait SerialPort {
    fn name(&self) -> String;

    async fn open(&self) -> std::io::Result<Transport>;
}

/// Character device or plain file, `-` reads standard input.
///
/// Line settings such as the baud rate are configured on the device beforehand.
pub struct DevicePort {
    path: PathBuf,
}

impl DevicePort {
    pub fn new<P: Into<PathBuf>>(path: P) -> DevicePort {
        DevicePort { path: path.into() }
    }
}

#[async_trait]
impl SerialPort for DevicePort {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn open(&self) -> std::io::Result<Transport> {
        if self.path.as_os_str() == "-" {
            return Ok(Box::new(tokio::io::stdin()));
        }
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(Box::new(file))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Could not open serial port {port}.")]
    Open {
        port: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerialEvent {
    Line(String),
    /// The reader stopped, because of a disconnect, end of stream or a read error.
    Closed,
}

struct Session {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    reader: JoinHandle<()>,
}

/// Owns at most one background reader for the configured port.
pub struct SerialLink {
    port: Option<Arc<dyn SerialPort + Send + Sync>>,
    session: Option<Session>,
}

impl SerialLink {
    pub fn new(port: Option<Arc<dyn SerialPort + Send + Sync>>) -> SerialLink {
        SerialLink {
            port,
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |session| !session.reader.is_finished())
    }

    /// Starts reading into `events`, replacing a running session.
    ///
    /// Returns `Ok(false)` without doing anything when no port is configured.
    pub async fn connect(
        &mut self,
        events: async_channel::Sender<SerialEvent>,
    ) -> Result<bool, LinkError> {
        self.disconnect().await;
        let Some(port) = self.port.clone() else {
            log::warn!("No serial port configured, learning is unavailable");
            return Ok(false);
        };

        let name = port.name();
        let transport = port.open().await.map_err(|source| LinkError::Open {
            port: name.clone(),
            source,
        })?;
        log::info!("Connected to serial port {}", name);

        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let reader = tokio::spawn(read_loop(
            transport,
            events,
            stop.clone(),
            wake.clone(),
            name,
        ));
        self.session = Some(Session { stop, wake, reader });
        Ok(true)
    }

    /// Stops the reader and waits until it has released the transport.
    pub async fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.stop.store(true, Ordering::Release);
        session.wake.notify_one();
        if let Err(e) = session.reader.await {
            log::warn!("Serial reader ended abnormally: {}", e);
        }
    }
}

async fn read_loop(
    mut transport: Transport,
    events: async_channel::Sender<SerialEvent>,
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    port: String,
) {
    let mut framer = LineFramer::default();
    let mut chunk = [0u8; CHUNK_SIZE];

    'reading: while !stop.load(Ordering::Acquire) {
        let read = tokio::select! {
            read = transport.read(&mut chunk) => Some(read),
            _ = wake.notified() => None,
        };
        let Some(read) = read else {
            break;
        };
        match read {
            Ok(0) => {
                log::info!("Serial port {} reached end of stream", port);
                break;
            }
            Ok(size) => {
                for line in framer.push(&chunk[..size]) {
                    log::debug!("{} <- {}", port, line);
                    if events.send(SerialEvent::Line(line)).await.is_err() {
                        break 'reading;
                    }
                }
            }
            Err(e) => {
                log::warn!("Reading serial port {} failed: {}", port, e);
                break;
            }
        }
    }

    drop(transport);
    log::info!("Serial port {} closed", port);
    let _ = events.send(SerialEvent::Closed).await;
}
