use std::io;
use std::net::{SocketAddr, TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use crate::addr::Network;

/// `dial_local` 返回的已连接套接字，所有权完全交给调用方。
#[derive(Debug)]
pub enum LocalConnection {
    Tcp(TcpStream),
    /// 已 `connect` 到对端的 UDP 套接字。
    Udp(UdpSocket),
    /// 不属于可标记路径的连接类型，原样返回。
    #[cfg(unix)]
    Unix(UnixStream),
}

impl LocalConnection {
    pub fn network(&self) -> Network {
        match self {
            Self::Tcp(_) => Network::Tcp,
            Self::Udp(_) => Network::Udp,
            #[cfg(unix)]
            Self::Unix(_) => Network::Unix,
        }
    }

    /// 对 TCP/UDP 连接返回本地地址；unix 连接没有 IP 地址，返回 `None`。
    pub fn local_addr(&self) -> io::Result<Option<SocketAddr>> {
        match self {
            Self::Tcp(stream) => stream.local_addr().map(Some),
            Self::Udp(socket) => socket.local_addr().map(Some),
            #[cfg(unix)]
            Self::Unix(_) => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> io::Result<Option<SocketAddr>> {
        match self {
            Self::Tcp(stream) => stream.peer_addr().map(Some),
            Self::Udp(socket) => socket.peer_addr().map(Some),
            #[cfg(unix)]
            Self::Unix(_) => Ok(None),
        }
    }

    pub fn into_tcp(self) -> Result<TcpStream, Self> {
        match self {
            Self::Tcp(stream) => Ok(stream),
            other => Err(other),
        }
    }

    pub fn into_udp(self) -> Result<UdpSocket, Self> {
        match self {
            Self::Udp(socket) => Ok(socket),
            other => Err(other),
        }
    }
}

impl From<TcpStream> for LocalConnection {
    fn from(stream: TcpStream) -> Self {
        Self::Tcp(stream)
    }
}

impl From<UdpSocket> for LocalConnection {
    fn from(socket: UdpSocket) -> Self {
        Self::Udp(socket)
    }
}

#[cfg(unix)]
impl From<UnixStream> for LocalConnection {
    fn from(stream: UnixStream) -> Self {
        Self::Unix(stream)
    }
}
