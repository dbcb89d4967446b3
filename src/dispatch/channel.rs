//! Fixed-frame byte channels over POSIX pipes.
//!
//! Each worker has one inbound channel (supervisor → worker) and one
//! outbound channel (worker → supervisor). A channel end is owned by exactly
//! one process; the non-owning end is closed after spawn so that peer EOF is
//! observable.

#![allow(dead_code)] // Some helpers are exercised only by the unit tests

use std::io::{self, Read, Write};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use thiserror::Error;

/// Errors on a frame channel. Peer closure is distinguished from a torn
/// frame so callers never compute on garbage bytes.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The peer closed its end before any byte of the frame arrived.
    #[error("channel closed by peer")]
    Closed,

    /// The peer closed its end mid-frame. There is no resynchronization
    /// mechanism, so this is fatal for the affected worker.
    #[error("short frame: expected {expected} bytes, got {got}")]
    ShortFrame { expected: usize, got: usize },

    #[error("channel IO error: {0}")]
    Io(#[from] io::Error),
}

/// A pipe end that implements `Read`/`Write` with EINTR retry.
///
/// Signal delivery interrupts blocking pipe syscalls; every read and write
/// here retries on EINTR so frame transfers never tear on a stray wakeup.
pub struct ChannelFd {
    fd: OwnedFd,
}

impl ChannelFd {
    /// Create from an owned file descriptor.
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Create from a raw file descriptor (takes ownership).
    ///
    /// # Safety
    /// The caller must ensure `fd` is a valid file descriptor that can be owned.
    pub unsafe fn from_raw(fd: RawFd) -> Self {
        Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        }
    }
}

impl AsFd for ChannelFd {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for ChannelFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Read for ChannelFd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match nix::unistd::read(self.fd.as_raw_fd(), buf) {
                Ok(n) => return Ok(n),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }
}

impl Write for ChannelFd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match nix::unistd::write(&self.fd, buf) {
                Ok(n) => return Ok(n),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(io::Error::from_raw_os_error(e as i32)),
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(()) // Pipes don't need flushing at the fd level
    }
}

/// Create an unnamed pipe, returned as (read end, write end).
pub fn channel_pair() -> io::Result<(ChannelFd, ChannelFd)> {
    let (read_fd, write_fd) =
        nix::unistd::pipe().map_err(|e| io::Error::from_raw_os_error(e as i32))?;
    Ok((ChannelFd::new(read_fd), ChannelFd::new(write_fd)))
}

/// Sending half of a frame channel.
pub struct FrameSender {
    fd: ChannelFd,
}

impl FrameSender {
    pub fn new(fd: ChannelFd) -> Self {
        Self { fd }
    }

    /// Write one complete frame.
    ///
    /// Frames are far below PIPE_BUF, so the single underlying `write` is
    /// atomic with respect to frame boundaries.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        match self.fd.write_all(frame) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(ChannelError::Closed),
            Err(e) => Err(ChannelError::Io(e)),
        }
    }
}

/// Receiving half of a frame channel.
pub struct FrameReceiver {
    fd: ChannelFd,
}

impl FrameReceiver {
    pub fn new(fd: ChannelFd) -> Self {
        Self { fd }
    }

    /// Block until exactly `N` bytes have arrived and return them.
    ///
    /// EOF before the first byte is `Closed`; EOF mid-frame is `ShortFrame`.
    pub fn receive<const N: usize>(&mut self) -> Result<[u8; N], ChannelError> {
        let mut frame = [0u8; N];
        let mut filled = 0;
        while filled < N {
            match self.fd.read(&mut frame[filled..]) {
                Ok(0) if filled == 0 => return Err(ChannelError::Closed),
                Ok(0) => {
                    return Err(ChannelError::ShortFrame {
                        expected: N,
                        got: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_channel() -> (FrameReceiver, FrameSender) {
        let (read_fd, write_fd) = channel_pair().expect("Failed to create pipe");
        (FrameReceiver::new(read_fd), FrameSender::new(write_fd))
    }

    #[test]
    fn test_send_receive_roundtrip() {
        let (mut rx, mut tx) = frame_channel();

        tx.send(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let frame: [u8; 8] = rx.receive().unwrap();
        assert_eq!(frame, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_receive_sees_closed_channel() {
        let (mut rx, tx) = frame_channel();
        drop(tx); // Close write end before any byte is sent

        match rx.receive::<8>() {
            Err(ChannelError::Closed) => {}
            other => panic!("Expected Closed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_receive_sees_short_frame() {
        let (mut rx, mut tx) = frame_channel();
        tx.send(&[1, 2, 3]).unwrap();
        drop(tx); // Close mid-frame

        match rx.receive::<8>() {
            Err(ChannelError::ShortFrame { expected: 8, got: 3 }) => {}
            other => panic!("Expected ShortFrame, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_send_into_closed_channel() {
        let (rx, mut tx) = frame_channel();
        drop(rx);

        // Rust ignores SIGPIPE at startup, so this surfaces as EPIPE
        match tx.send(&[0u8; 8]) {
            Err(ChannelError::Closed) => {}
            other => panic!("Expected Closed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_back_to_back_frames_do_not_interleave() {
        let (mut rx, mut tx) = frame_channel();
        tx.send(&[0xAA; 4]).unwrap();
        tx.send(&[0xBB; 4]).unwrap();

        let first: [u8; 4] = rx.receive().unwrap();
        let second: [u8; 4] = rx.receive().unwrap();
        assert_eq!(first, [0xAA; 4]);
        assert_eq!(second, [0xBB; 4]);
    }
}
