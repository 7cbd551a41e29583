use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use log::info;
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Result, TimingError};

/// Non-blocking UDP socket bound to `addr`. Multicast groups are joined on
/// `iface` (`Ipv4Addr::UNSPECIFIED` lets the system pick).
pub fn create_udp_socket(addr: SocketAddr, iface: Ipv4Addr) -> Result<Socket> {
    let group = match addr.ip() {
        IpAddr::V4(v4) => v4,
        other => return Err(TimingError::UnsupportedAddress(other)),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;

    if group.is_multicast() {
        socket.join_multicast_v4(&group, &iface)?;
        info!("joined multicast group {group} on {iface}");
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}
