//! Own-IP discovery: the classic UDP-connect trick, no routing-table
//! enumeration needed. Grounded on `original_source/src/entry.cpp`'s
//! `get_own_ip_addr` (connect to a public address, then read back the
//! local socket address the kernel picked).

use std::net::UdpSocket;

/// Best-effort local IP address, as seen by the kernel's route to
/// `8.8.8.8:80`. No packet is actually sent (`connect` on UDP only
/// selects a route).
pub fn discover_own_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip().to_string())
}
