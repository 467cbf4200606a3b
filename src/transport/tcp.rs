//! TCP connection: connect, serialized sends, reader task, teardown.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::codec::{encode_frame, FrameBuffer, DEFAULT_MAX_FRAME};
use crate::error::{CortexError, Result};

/// Well-known instrument port.
pub(crate) const DEFAULT_PORT: u16 = 8080;

/// How long `disconnect` waits for the reader task before aborting it.
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Socket read chunk size.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Transport tunables.
///
/// A timeout of `None` means the corresponding operation blocks
/// indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Deadline applied to each outbound frame write.
    pub send_timeout: Option<Duration>,
    /// Deadline applied to each socket read.
    pub receive_timeout: Option<Duration>,
    /// Maximum accepted payload size.
    pub max_frame_size: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            send_timeout: None,
            receive_timeout: None,
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}

/// Upward callbacks owned by the reader task.
///
/// `on_error` and `on_unexpected_disconnect` fire only when the teardown
/// was not user-requested.
pub(crate) struct ReaderHooks {
    /// Invoked once per successfully decoded payload.
    pub on_payload: Box<dyn Fn(&[u8]) + Send + Sync>,
    /// Invoked with a human-readable description of the failure.
    pub on_error: Box<dyn Fn(String) + Send + Sync>,
    /// Invoked after the stream is closed on an unexpected teardown.
    pub on_unexpected_disconnect: Box<dyn Fn() + Send + Sync>,
}

/// One live connection to the instrument.
pub(crate) struct Connection {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    local_addr: [u8; 4],
    send_timeout: Option<Duration>,
    disconnect_requested: AtomicBool,
    shutdown: Notify,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Open a TCP stream to the instrument and start the reader task.
    pub async fn open(
        addr: SocketAddr,
        config: &TransportConfig,
        hooks: ReaderHooks,
    ) -> Result<Arc<Self>> {
        let stream = match config.connect_timeout {
            Some(deadline) => timeout(deadline, TcpStream::connect(addr))
                .await
                .map_err(|_| {
                    CortexError::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "connect timed out",
                    ))
                })??,
            None => TcpStream::connect(addr).await?,
        };
        stream.set_nodelay(true).ok();

        let local_addr = match stream.local_addr()? {
            SocketAddr::V4(v4) => v4.ip().octets(),
            SocketAddr::V6(_) => [0; 4],
        };

        let (read_half, write_half) = stream.into_split();
        let connection = Arc::new(Self {
            writer: tokio::sync::Mutex::new(write_half),
            local_addr,
            send_timeout: config.send_timeout,
            disconnect_requested: AtomicBool::new(false),
            shutdown: Notify::new(),
            reader: std::sync::Mutex::new(None),
        });

        let task = tokio::spawn(read_loop(
            read_half,
            connection.clone(),
            hooks,
            config.receive_timeout,
            config.max_frame_size,
        ));
        *connection.reader.lock().expect("reader handle poisoned") = Some(task);

        tracing::debug!(%addr, "connection established");
        Ok(connection)
    }

    /// Local IPv4 address of this connection, as announced in LOGN.
    pub fn local_addr(&self) -> [u8; 4] {
        self.local_addr
    }

    /// Frame a payload and write the whole envelope in one critical
    /// section, so concurrent sends never interleave.
    ///
    /// On any write error the socket is shut down (which wakes the
    /// reader) and the error is returned.
    pub async fn send_payload(&self, payload: &[u8]) -> Result<()> {
        let frame = encode_frame(payload);
        let mut writer = self.writer.lock().await;

        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };
        let result = match self.send_timeout {
            Some(deadline) => timeout(deadline, write).await.unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "send timed out",
                ))
            }),
            None => write.await,
        };

        if let Err(e) = result {
            tracing::warn!("send failed: {e}");
            let _ = writer.shutdown().await;
            return Err(e.into());
        }
        Ok(())
    }

    /// User-requested teardown.
    ///
    /// Marks the disconnect as requested so the reader stays silent,
    /// closes the stream to wake it, and joins it with a bounded wait.
    /// A reader that does not exit within the bound is aborted.
    pub async fn disconnect(&self) {
        self.disconnect_requested.store(true, Ordering::Release);
        self.shutdown.notify_one();
        {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        }

        let handle = self.reader.lock().expect("reader handle poisoned").take();
        if let Some(mut handle) = handle {
            if timeout(READER_JOIN_TIMEOUT, &mut handle).await.is_err() {
                tracing::warn!("reader did not exit in time, aborting it");
                handle.abort();
            }
        }
    }

    /// Synchronous last-resort teardown used when the owning client is
    /// dropped without a disconnect.
    pub fn abort_reader(&self) {
        self.disconnect_requested.store(true, Ordering::Release);
        if let Some(handle) = self.reader.lock().expect("reader handle poisoned").take() {
            handle.abort();
        }
    }

    fn user_requested_disconnect(&self) -> bool {
        self.disconnect_requested.load(Ordering::Acquire)
    }
}

/// Reader task: accumulate bytes, surface complete payloads, tear down on
/// the first failure.
async fn read_loop(
    mut reader: OwnedReadHalf,
    connection: Arc<Connection>,
    hooks: ReaderHooks,
    receive_timeout: Option<Duration>,
    max_frame_size: u32,
) {
    let mut frames = FrameBuffer::with_max_frame(max_frame_size);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    let failure: Option<String> = loop {
        let read = tokio::select! {
            _ = connection.shutdown.notified() => break None,
            read = read_chunk(&mut reader, &mut chunk, receive_timeout) => read,
        };

        let n = match read {
            Ok(0) => {
                break Some(if frames.has_partial() {
                    CortexError::ShortRead.to_string()
                } else {
                    "connection closed by peer".to_string()
                });
            }
            Ok(n) => n,
            Err(e) => break Some(format!("read failed: {e}")),
        };

        match frames.push(&chunk[..n]) {
            Ok(payloads) => {
                for payload in payloads {
                    (hooks.on_payload)(&payload);
                }
            }
            Err(e) => break Some(e.to_string()),
        }
    };

    if connection.user_requested_disconnect() {
        tracing::debug!("reader exiting after user disconnect");
        return;
    }

    if let Some(description) = failure {
        tracing::warn!("connection lost: {description}");
        (hooks.on_error)(description);
    }
    {
        let mut writer = connection.writer.lock().await;
        let _ = writer.shutdown().await;
    }
    (hooks.on_unexpected_disconnect)();
    tracing::debug!("reader exiting after unexpected disconnect");
}

async fn read_chunk(
    reader: &mut OwnedReadHalf,
    chunk: &mut [u8],
    receive_timeout: Option<Duration>,
) -> std::io::Result<usize> {
    match receive_timeout {
        Some(deadline) => timeout(deadline, reader.read(chunk))
            .await
            .unwrap_or_else(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "receive timed out",
                ))
            }),
        None => reader.read(chunk).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    fn collecting_hooks() -> (
        ReaderHooks,
        Arc<Mutex<Vec<Vec<u8>>>>,
        Arc<Mutex<Vec<String>>>,
        Arc<AtomicU32>,
    ) {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let disconnects = Arc::new(AtomicU32::new(0));

        let payloads_clone = payloads.clone();
        let errors_clone = errors.clone();
        let disconnects_clone = disconnects.clone();
        let hooks = ReaderHooks {
            on_payload: Box::new(move |payload| {
                payloads_clone.lock().unwrap().push(payload.to_vec());
            }),
            on_error: Box::new(move |description| {
                errors_clone.lock().unwrap().push(description);
            }),
            on_unexpected_disconnect: Box::new(move || {
                disconnects_clone.fetch_add(1, Ordering::SeqCst);
            }),
        };
        (hooks, payloads, errors, disconnects)
    }

    #[tokio::test]
    async fn test_send_writes_complete_envelope() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, _, _) = collecting_hooks();
        let connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        connection.send_payload(b"STATdata").await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &encode_frame(b"STATdata")[..]);

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn test_reader_delivers_payloads() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, payloads, _, _) = collecting_hooks();
        let connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        server.write_all(&encode_frame(b"STATone")).await.unwrap();
        server.write_all(&encode_frame(b"STATtwo")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = payloads.lock().unwrap().clone();
        assert_eq!(seen, vec![b"STATone".to_vec(), b"STATtwo".to_vec()]);

        connection.disconnect().await;
    }

    #[tokio::test]
    async fn test_peer_drop_signals_unexpected_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, errors, disconnects) = collecting_hooks();
        let _connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();

        drop(server);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert!(!errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_frame_signals_unexpected_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, errors, disconnects) = collecting_hooks();
        let _connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        server.write_all(b"SYN?AAAAAAAAAAAA").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert!(errors.lock().unwrap()[0].contains("Bad SYNC"));
    }

    #[tokio::test]
    async fn test_mid_frame_drop_is_a_short_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, errors, disconnects) = collecting_hooks();
        let _connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (mut server, _) = listener.accept().await.unwrap();

        let frame = encode_frame(b"STATpayload");
        server.write_all(&frame[..frame.len() - 2]).await.unwrap();
        drop(server);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert!(errors.lock().unwrap()[0].contains("Short read"));
    }

    #[tokio::test]
    async fn test_user_disconnect_stays_silent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, errors, disconnects) = collecting_hooks();
        let connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();
        let (_server, _) = listener.accept().await.unwrap();

        connection.disconnect().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_addr_is_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (hooks, _, _, _) = collecting_hooks();
        let connection = Connection::open(addr, &TransportConfig::default(), hooks)
            .await
            .unwrap();

        assert_eq!(connection.local_addr(), [127, 0, 0, 1]);
        connection.disconnect().await;
    }
}
