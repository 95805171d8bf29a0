//! Daemon side of one client connection.
//!
//! The task exclusively owns the stream: it reads the hello, then feeds
//! bytes through the frame decoder and forwards each record to the
//! router. Awaiting the dispatch send is what propagates backpressure —
//! when the router channel is full the task stops reading and the
//! client's own `send` blocks on the socket.
//!
//! A malformed frame or bad hello terminates only this connection; the
//! stream cannot be resynchronized after either.

use bytes::BytesMut;
use notcat_protocol::{FrameDecoder, HELLO_LEN, Hello, Record};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const HELLO_TIMEOUT: Duration = Duration::from_secs(5);
const READ_BUF_CAPACITY: usize = 8 * 1024;

#[derive(Error, Debug)]
enum ConnectionError {
    #[error("timed out waiting for hello")]
    HelloTimeout,

    #[error(transparent)]
    Hello(#[from] notcat_protocol::HelloError),

    #[error("malformed frame: {0}")]
    Malformed(#[from] notcat_protocol::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("router is gone")]
    RouterClosed,
}

pub(crate) struct Connection {
    id: u64,
    stream: UnixStream,
    dispatch: mpsc::Sender<Arc<Record>>,
    decoder: FrameDecoder,
}

impl Connection {
    pub fn new(
        id: u64,
        stream: UnixStream,
        dispatch: mpsc::Sender<Arc<Record>>,
        max_message_len: usize,
    ) -> Self {
        Self {
            id,
            stream,
            dispatch,
            decoder: FrameDecoder::new(max_message_len),
        }
    }

    /// Drive the connection until EOF, error, or daemon shutdown.
    pub async fn run(mut self, shutdown: CancellationToken) {
        match self.serve(&shutdown).await {
            Ok(()) => debug!(conn = self.id, "connection closed"),
            Err(error) => warn!(conn = self.id, %error, "connection terminated"),
        }
    }

    async fn serve(&mut self, shutdown: &CancellationToken) -> Result<(), ConnectionError> {
        let hello = self.read_hello().await?;
        debug!(
            conn = self.id,
            pid = hello.pid,
            sink_hint = hello.sink_hint,
            "client connected"
        );

        let mut buf = BytesMut::with_capacity(READ_BUF_CAPACITY);
        loop {
            while let Some(record) = self.decoder.decode(&mut buf)? {
                self.dispatch
                    .send(Arc::new(record))
                    .await
                    .map_err(|_| ConnectionError::RouterClosed)?;
            }

            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                read = self.stream.read_buf(&mut buf) => {
                    if read? == 0 {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn read_hello(&mut self) -> Result<Hello, ConnectionError> {
        let mut raw = [0u8; HELLO_LEN];
        tokio::time::timeout(HELLO_TIMEOUT, self.stream.read_exact(&mut raw))
            .await
            .map_err(|_| ConnectionError::HelloTimeout)??;
        Ok(Hello::decode(raw)?)
    }
}
