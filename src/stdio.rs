// src/stdio.rs

//! Pluggable stdio for chain commands.
//!
//! Children normally share the invoker's terminal, but embedders and
//! tests need to capture output and feed input. The sinks/sources here
//! are the small capability set the supervisor wires into every child:
//! inherit the fd, or pipe it and move bytes through a spawned copy
//! task.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tracing::debug;

/// Where a child's stdout or stderr goes.
#[derive(Clone)]
pub enum OutputSink {
    /// Share the invoker's stream.
    Inherit,
    /// Pipe the stream and append everything to the buffer.
    Capture(Arc<Mutex<Vec<u8>>>),
}

impl OutputSink {
    /// A capturing sink and the buffer it fills.
    pub fn capture() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self::Capture(Arc::clone(&buf)), buf)
    }

    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            OutputSink::Inherit => Stdio::inherit(),
            OutputSink::Capture(_) => Stdio::piped(),
        }
    }

    pub(crate) fn attach_stdout(&self, child: &mut Child) {
        if let OutputSink::Capture(buf) = self {
            if let Some(stream) = child.stdout.take() {
                spawn_capture(stream, Arc::clone(buf));
            }
        }
    }

    pub(crate) fn attach_stderr(&self, child: &mut Child) {
        if let OutputSink::Capture(buf) = self {
            if let Some(stream) = child.stderr.take() {
                spawn_capture(stream, Arc::clone(buf));
            }
        }
    }
}

fn spawn_capture<R>(mut stream: R, buf: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncReadExt + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut buf) = buf.lock() {
                        buf.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    });
}

/// Where the last chain command's stdin comes from when `-stdin` is
/// enabled.
#[derive(Clone)]
pub enum InputSource {
    /// Share the invoker's stdin.
    Inherit,
    /// Pipe the given bytes in, then close the stream.
    Bytes(Arc<Vec<u8>>),
    /// No input at all.
    Null,
}

impl InputSource {
    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            InputSource::Inherit => Stdio::inherit(),
            InputSource::Bytes(_) => Stdio::piped(),
            InputSource::Null => Stdio::null(),
        }
    }

    pub(crate) fn attach(&self, child: &mut Child) {
        if let InputSource::Bytes(bytes) = self {
            if let Some(mut stdin) = child.stdin.take() {
                let bytes = Arc::clone(bytes);
                tokio::spawn(async move {
                    if let Err(err) = stdin.write_all(&bytes).await {
                        debug!(error = %err, "child stdin closed early");
                    }
                    let _ = stdin.shutdown().await;
                });
            }
        }
    }
}
