//! Platform log facility sink.
//!
//! The facility itself is a black box behind [`platform::write`]: the
//! Android liblog binding when targeting Android, a stderr line
//! elsewhere. Either way the call is short and bounded; the router's
//! delivery timeout is the backstop.

use super::{Sink, SinkError};
use notcat_protocol::Record;
use std::future::Future;
use std::pin::Pin;

pub struct PlatformSink {
    name: String,
    tag: String,
}

impl PlatformSink {
    pub fn new(tag: String) -> Self {
        Self {
            name: format!("platform:{tag}"),
            tag,
        }
    }
}

impl Sink for PlatformSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept<'a>(
        &'a self,
        record: &'a Record,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            platform::write(record.priority, &self.tag, &record.message)
                .map_err(|e| SinkError::Unavailable(e.to_string()))
        })
    }
}

#[cfg(target_os = "android")]
mod platform {
    use notcat_protocol::Priority;
    use std::ffi::CString;
    use std::io;
    use std::os::raw::{c_char, c_int};

    unsafe extern "C" {
        fn __android_log_write(prio: c_int, tag: *const c_char, msg: *const c_char) -> c_int;
    }

    // liblog priority values; notcat's five map into VERBOSE..=ERROR.
    fn android_priority(priority: Priority) -> c_int {
        match priority {
            Priority::Verbose => 2,
            Priority::Debug => 3,
            Priority::Info => 4,
            Priority::Warn => 5,
            Priority::Error => 6,
        }
    }

    pub fn write(priority: Priority, tag: &str, message: &str) -> io::Result<()> {
        let tag = CString::new(tag)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL byte in tag"))?;
        // Frames are validated UTF-8 but may still carry interior NULs;
        // truncate at the first one like liblog itself would.
        let message = match CString::new(message) {
            Ok(c) => c,
            Err(err) => {
                let position = err.nul_position();
                let mut bytes = err.into_vec();
                bytes.truncate(position);
                CString::new(bytes)
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL byte in message"))?
            }
        };
        let rc = unsafe {
            __android_log_write(android_priority(priority), tag.as_ptr(), message.as_ptr())
        };
        if rc < 0 {
            return Err(io::Error::other(format!("__android_log_write returned {rc}")));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "android"))]
mod platform {
    use notcat_protocol::Priority;
    use std::io::{self, Write};

    pub fn write(priority: Priority, tag: &str, message: &str) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{tag}: {priority} {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notcat_protocol::Priority;

    #[tokio::test]
    async fn accepts_records() {
        let sink = PlatformSink::new("notcat-test".into());
        sink.accept(&Record::new(Priority::Debug, "platform sink smoke"))
            .await
            .unwrap();
        assert_eq!(sink.name(), "platform:notcat-test");
    }
}
