#![warn(rust_2018_idioms)]

//! Wire types shared by the notcat daemon and client: the [`Record`]
//! value, the frame codec, and the connection hello preamble.

pub mod codec;
pub mod record;

pub use codec::{
    DecodeError, EncodeError, FrameDecoder, Hello, HelloError, FRAME_HEADER_LEN, HELLO_LEN,
    HELLO_MAGIC, PROTOCOL_VERSION, encode_frame, encode_record,
};
pub use record::{MAX_MESSAGE_LEN, ParsePriorityError, Priority, Record};

/// Default endpoint path the daemon listens on and clients connect to.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/notcat.sock";

/// Environment variable overriding [`DEFAULT_SOCKET_PATH`] on both sides.
pub const SOCKET_PATH_ENV: &str = "NOTCAT_SOCKET";
