// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background stdin reader — collects raw bytes from the terminal.
//
// A dedicated thread reads stdin in blocking mode and sends byte chunks
// through a standard channel. The main thread receives these chunks and
// feeds them to the input parser.
//
// `read()` on stdin blocks, and the editor loop must stay responsive for
// escape-sequence timeouts and resize handling, so the blocking read
// lives on its own thread and the loop uses `recv_timeout` on the
// channel.
//
// Shutdown: the reader thread uses `poll()` with a short timeout on
// stdin's file descriptor, checking an `AtomicBool` stop flag between
// polls, so it never sits stuck in a blocking `read()`.

#[cfg(unix)]
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Byte chunk size. A keypress is 1-6 bytes, a paste can be kilobytes;
/// 4 KB handles both without waste.
const READ_BUF_SIZE: usize = 4096;

/// How often the reader thread checks the stop flag (milliseconds).
const POLL_TIMEOUT_MS: i32 = 50;

/// Background stdin reader thread. Runs until [`stop`](Self::stop) is
/// called or the handle is dropped.
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    /// Spawn the reader thread. Each received `Vec<u8>` is a non-empty
    /// chunk of raw stdin data; the channel closes on stop or EOF.
    ///
    /// # Panics
    ///
    /// Panics if the OS cannot spawn a thread.
    #[must_use]
    pub fn spawn() -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                Self::reader_loop(&tx, &stop_flag);
            })
            .expect("failed to spawn stdin reader thread");

        (
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        )
    }

    /// Signal the reader thread to stop and join it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    #[cfg(unix)]
    fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
        use std::os::unix::io::AsRawFd;

        let stdin_fd = io::stdin().as_raw_fd();
        let mut buf = [0u8; READ_BUF_SIZE];

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd: stdin_fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
            };

            // Timeout or error: loop back to check the stop flag.
            if ready <= 0 {
                continue;
            }

            let n = unsafe { libc::read(stdin_fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break; // EOF or error
            }

            #[allow(clippy::cast_sign_loss)] // n > 0 checked above
            let chunk = buf[..n as usize].to_vec();
            if tx.send(chunk).is_err() {
                break; // receiver dropped
            }
        }
    }

    #[cfg(not(unix))]
    fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
        use std::io::Read;

        let stdin = std::io::stdin();
        let mut buf = [0u8; READ_BUF_SIZE];

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            match stdin.lock().read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn spawn_and_stop() {
        let (mut reader, _rx) = StdinReader::spawn();
        reader.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut reader, _rx) = StdinReader::spawn();
        reader.stop();
        reader.stop();
    }

    #[test]
    fn drop_stops_reader() {
        let (reader, _rx) = StdinReader::spawn();
        drop(reader);
    }

    #[test]
    fn channel_closes_on_stop() {
        let (mut reader, rx) = StdinReader::spawn();
        reader.stop();
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
