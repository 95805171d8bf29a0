//! In-process mock daemon: accepts a fixed number of connections,
//! records each hello and every decoded frame until EOF.

use bytes::BytesMut;
use notcat_protocol::{FrameDecoder, HELLO_LEN, Hello, Record};
use std::io::Read;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::thread::JoinHandle;

pub struct Session {
    pub hello: Hello,
    pub records: Vec<Record>,
}

pub struct MockDaemon {
    pub socket: PathBuf,
    handle: JoinHandle<Vec<Session>>,
    _dir: tempfile::TempDir,
}

impl MockDaemon {
    pub fn start(connections: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let handle = std::thread::spawn(move || {
            (0..connections)
                .map(|_| {
                    let (mut stream, _) = listener.accept().unwrap();

                    let mut raw = [0u8; HELLO_LEN];
                    stream.read_exact(&mut raw).unwrap();
                    let hello = Hello::decode(raw).unwrap();

                    let mut bytes = Vec::new();
                    stream.read_to_end(&mut bytes).unwrap();

                    let decoder = FrameDecoder::default();
                    let mut buf = BytesMut::from(&bytes[..]);
                    let mut records = Vec::new();
                    while let Some(record) = decoder.decode(&mut buf).unwrap() {
                        records.push(record);
                    }
                    assert!(buf.is_empty(), "client left a partial frame on the wire");

                    Session { hello, records }
                })
                .collect()
        });

        Self {
            socket,
            handle,
            _dir: dir,
        }
    }

    /// Wait for every expected connection to finish and return what the
    /// daemon side observed.
    pub fn finish(self) -> Vec<Session> {
        self.handle.join().unwrap()
    }
}
