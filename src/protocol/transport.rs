//! Per-call UDP transport
//!
//! A socket is opened at the start of a protocol call, bound to an ephemeral
//! port on a caller-chosen local address, and dropped at the end of the
//! call. No socket state survives across calls.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use crate::errors::{FlashError, Result};

/// Receive buffer size; replies are 60 bytes, leave headroom
const RECV_BUF_LEN: usize = 1024;

/// One UDP socket scoped to a single protocol call
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral socket on `local_ip` with a receive deadline
    pub fn bind(local_ip: IpAddr, read_timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0))?;
        socket.set_read_timeout(Some(read_timeout))?;
        Ok(Self { socket })
    }

    /// Allow sends to broadcast destinations (discovery)
    pub fn enable_broadcast(&self) -> Result<()> {
        self.socket.set_broadcast(true)?;
        Ok(())
    }

    /// Change the receive deadline mid-call (erase completion waits longer
    /// than the command handshake)
    pub fn set_read_timeout(&self, timeout: Duration) -> Result<()> {
        self.socket.set_read_timeout(Some(timeout))?;
        Ok(())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send one datagram, returning the bytes written
    pub fn send(&self, dest: SocketAddr, bytes: &[u8]) -> Result<usize> {
        Ok(self.socket.send_to(bytes, dest)?)
    }

    /// Block until a non-empty datagram arrives or the deadline passes.
    ///
    /// Zero-length datagrams are discarded and the wait continues; they
    /// still consume deadline time.
    pub fn recv(&self) -> Result<(SocketAddr, Vec<u8>)> {
        let mut buf = [0u8; RECV_BUF_LEN];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((0, source)) => {
                    log::debug!("discarding zero-length datagram from {}", source);
                    continue;
                }
                Ok((len, source)) => return Ok((source, buf[..len].to_vec())),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return Err(FlashError::Timeout(
                        "no reply within the receive deadline".to_string(),
                    ));
                }
                Err(e) => return Err(FlashError::Transport(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_loopback_round_trip() {
        let a = UdpTransport::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(1))
            .unwrap();
        let b = UdpTransport::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(1))
            .unwrap();

        let sent = a.send(b.local_addr().unwrap(), b"hello").unwrap();
        assert_eq!(sent, 5);

        let (source, bytes) = b.recv().unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(source, a.local_addr().unwrap());
    }

    #[test]
    fn test_recv_times_out() {
        let t = UdpTransport::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_millis(50))
            .unwrap();
        let err = t.recv().unwrap_err();
        assert!(matches!(err, FlashError::Timeout(_)));
    }
}
