//! End-to-end: daemon on a temp socket, real clients, real file sink.

use notcat_client::{Connection, Priority};
use notcat_protocol::{HELLO_MAGIC, Hello, PROTOCOL_VERSION};
use notcatd::config::{LogFormat, Settings, SinkConfig};
use notcatd::healthcheck::healthcheck_at;
use notcatd::router::{Router, RouterConfig, RouterHandle};
use notcatd::sink::{self, FileFormat};
use notcatd::{app, error::DaemonError};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestDaemon {
    shutdown: CancellationToken,
    server: JoinHandle<Result<(), DaemonError>>,
    router: RouterHandle,
    socket: PathBuf,
    log_file: PathBuf,
    _dir: tempfile::TempDir,
}

impl TestDaemon {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("notcat.sock");
        let log_file = dir.path().join("log.txt");
        let settings = Settings {
            socket_path: socket.clone(),
            sinks: vec![SinkConfig::LocalFile {
                path: log_file.clone(),
                format: FileFormat::Plain,
                min_priority: None,
            }],
            queue_capacity: 1024,
            degraded_threshold: 3,
            sink_timeout: Duration::from_secs(1),
            max_message_len: 64 * 1024,
            log_format: LogFormat::Plain,
        };

        let sinks = sink::build_sinks(&settings.sinks).await.unwrap();
        let router = Router::spawn(sinks, RouterConfig::from_settings(&settings));
        let shutdown = CancellationToken::new();

        let dispatch = router.dispatcher();
        let token = shutdown.clone();
        let server =
            tokio::spawn(async move { app::server::serve(&settings, dispatch, token).await });

        wait_for(&socket, |path| path.exists()).await;

        Self {
            shutdown,
            server,
            router,
            socket,
            log_file,
            _dir: dir,
        }
    }

    async fn stop(self) -> Result<(), DaemonError> {
        self.shutdown.cancel();
        let result = self.server.await.unwrap();
        self.router.shutdown().await;
        result
    }

    async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        let path = self.log_file.clone();
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let lines = read_lines(&path);
                if lines.len() >= count {
                    return lines;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "expected {count} lines, daemon wrote {}",
                read_lines(&path).len()
            )
        })
    }
}

async fn wait_for(path: &Path, ready: impl Fn(&Path) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !ready(path) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("daemon did not come up in time");
}

fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn one_client_one_record_lands_in_the_file() {
    let daemon = TestDaemon::start().await;

    let socket = daemon.socket.clone();
    tokio::task::spawn_blocking(move || {
        let mut client = Connection::connect(&socket).unwrap();
        client.send(Priority::Info, "hello").unwrap();
        client.close().unwrap();
    })
    .await
    .unwrap();

    let lines = daemon.wait_for_lines(1).await;
    daemon.stop().await.unwrap();

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("INFO"));
    assert!(lines[0].ends_with("hello"));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_clients_interleave_but_keep_their_own_order() {
    let daemon = TestDaemon::start().await;

    let mut producers = Vec::new();
    for prefix in ["a", "b"] {
        let socket = daemon.socket.clone();
        producers.push(tokio::task::spawn_blocking(move || {
            let mut client = Connection::connect(&socket).unwrap();
            for i in 0..100 {
                client
                    .send(Priority::Info, &format!("{prefix}-{i:03}"))
                    .unwrap();
            }
            client.close().unwrap();
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let lines = daemon.wait_for_lines(200).await;
    daemon.stop().await.unwrap();

    assert_eq!(lines.len(), 200);
    for prefix in ["a", "b"] {
        let own: Vec<&str> = lines
            .iter()
            .filter_map(|line| line.split_whitespace().last())
            .filter(|message| message.starts_with(prefix))
            .collect();
        let expected: Vec<String> = (0..100).map(|i| format!("{prefix}-{i:03}")).collect();
        assert_eq!(own, expected, "client {prefix} records out of order");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_frame_kills_only_that_connection() {
    let daemon = TestDaemon::start().await;

    // Hand-rolled client: valid hello, then a frame with priority 0xff.
    let socket = daemon.socket.clone();
    tokio::task::spawn_blocking(move || {
        let mut raw = std::os::unix::net::UnixStream::connect(&socket).unwrap();
        let hello = Hello {
            pid: std::process::id(),
            sink_hint: 0,
        };
        raw.write_all(&hello.encode()).unwrap();
        raw.write_all(&[0xff, 0, 0, 0, 1, b'x']).unwrap();

        // The daemon closes the stream; read sees EOF.
        raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(raw.read(&mut buf).unwrap(), 0);
    })
    .await
    .unwrap();

    // The daemon itself keeps serving other clients.
    let socket = daemon.socket.clone();
    tokio::task::spawn_blocking(move || {
        let mut client = Connection::connect(&socket).unwrap();
        client.send(Priority::Warn, "still alive").unwrap();
        client.close().unwrap();
    })
    .await
    .unwrap();

    let lines = daemon.wait_for_lines(1).await;
    daemon.stop().await.unwrap();

    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("still alive"));
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_frame_closes_the_connection_without_delivery() {
    let daemon = TestDaemon::start().await;

    let socket = daemon.socket.clone();
    tokio::task::spawn_blocking(move || {
        let mut raw = std::os::unix::net::UnixStream::connect(&socket).unwrap();
        let hello = Hello {
            pid: std::process::id(),
            sink_hint: 0,
        };
        raw.write_all(&hello.encode()).unwrap();

        // Claim a payload over the 64 KiB ceiling; the daemon must cut
        // the connection on the header alone.
        let mut frame = vec![2u8];
        frame.extend_from_slice(&(70_000u32).to_be_bytes());
        raw.write_all(&frame).unwrap();

        raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(raw.read(&mut buf).unwrap(), 0);
    })
    .await
    .unwrap();

    assert!(
        read_lines(&daemon.log_file).is_empty(),
        "no partial frame may reach a sink"
    );
    daemon.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_hello_magic_is_rejected() {
    let daemon = TestDaemon::start().await;

    let socket = daemon.socket.clone();
    tokio::task::spawn_blocking(move || {
        let mut raw = std::os::unix::net::UnixStream::connect(&socket).unwrap();
        let mut hello = Hello {
            pid: std::process::id(),
            sink_hint: 0,
        }
        .encode();
        hello[0] ^= 0xff;
        raw.write_all(&hello).unwrap();

        raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(raw.read(&mut buf).unwrap(), 0);
    })
    .await
    .unwrap();

    daemon.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn healthcheck_reflects_daemon_liveness() {
    let daemon = TestDaemon::start().await;

    healthcheck_at(&daemon.socket).await.unwrap();

    let socket = daemon.socket.clone();
    daemon.stop().await.unwrap();
    assert!(healthcheck_at(&socket).await.is_err());

    // Sanity: the wire constants the healthcheck relies on.
    assert_eq!(HELLO_MAGIC, 0xb05a_cafe);
    assert_eq!(PROTOCOL_VERSION, 1);
}
