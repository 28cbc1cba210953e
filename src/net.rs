//! Datagram endpoints: thin single-socket wrappers over UDP.
//!
//! Grounded on the socket setup in the teacher's
//! `ReliableUdpRingBufferTransport::new` — bind, timeout/nonblocking, and
//! the unix `SO_SNDBUF`/`SO_RCVBUF` tuning — generalized to the blocking,
//! single-peer model this protocol needs.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::constants::{PACKET_LEN, SOCKET_TIMEOUT_MS};
use crate::error::Result;

fn tune_buffers(socket: &UdpSocket) {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = socket.as_raw_fd();
        let buffer_size: libc::c_int = 1024 * 1024;
        unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_SNDBUF,
                &buffer_size as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as u32,
            );
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &buffer_size as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as u32,
            );
        }
    }
}

/// Owns the socket the ingress task reads from.
pub struct Receiver {
    socket: UdpSocket,
}

impl Receiver {
    pub fn new(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_read_timeout(Some(Duration::from_millis(SOCKET_TIMEOUT_MS)))?;
        tune_buffers(&socket);
        Ok(Self { socket })
    }

    /// Block up to the socket timeout for one datagram.
    ///
    /// Returns `None` on timeout so the ingress loop can check `stop`.
    pub fn listen_for_packet(&self) -> Result<Option<(String, Vec<u8>)>> {
        let mut buf = [0u8; PACKET_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((len, src)) => Ok(Some((src.ip().to_string(), buf[..len].to_vec()))),
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Owns the socket the egress task writes to.
pub struct Sender {
    socket: UdpSocket,
    dest_port: u16,
    dest_ip: Option<String>,
    dest_addr: Option<SocketAddr>,
}

impl Sender {
    pub fn new(dest_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        tune_buffers(&socket);
        Ok(Self { socket, dest_port, dest_ip: None, dest_addr: None })
    }

    /// Cache the destination IP, only re-resolving the socket address when
    /// the string actually changes.
    pub fn set_dest_ip(&mut self, ip: &str) {
        if self.dest_ip.as_deref() == Some(ip) {
            return;
        }
        self.dest_addr = format!("{ip}:{}", self.dest_port).parse().ok();
        self.dest_ip = Some(ip.to_string());
    }

    pub fn send_packet(&self, packet: &[u8]) -> bool {
        let Some(addr) = self.dest_addr else {
            return false;
        };
        self.socket.send_to(packet, addr).is_ok()
    }
}
