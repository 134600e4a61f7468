//! 两种传输变体共享的底层解析/建连/监听原语。
//!
//! 标记变体与直通变体都先调用这里的函数，再决定是否追加标记步骤；
//! 因此两者在“套接字如何被创建”上的行为完全一致。

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

#[cfg(unix)]
use socket2::SockAddr;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::trace;

use crate::addr::{self, Network};
use crate::connection::LocalConnection;
use crate::error::{self, OperationKind, Result};

pub(crate) fn bind_udp(kind: OperationKind, laddr: SocketAddr) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(laddr).map_err(|err| error::bind_error(kind, laddr, err))?;
    trace!(operation = kind.message, %laddr, "udp socket bound");
    Ok(socket)
}

pub(crate) fn listen_tcp(kind: OperationKind, laddr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(laddr).map_err(|err| error::listen_error(kind, laddr, err))?;
    trace!(operation = kind.message, %laddr, "tcp listener bound");
    Ok(listener)
}

/// 一次建连调用的超时预算，从调用开始（解析之前）计时。
///
/// 超时过大、无法表示为时间点时不设截止，每次尝试直接使用完整的 `timeout`。
#[derive(Clone, Copy, Debug)]
pub(crate) struct DialBudget {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl DialBudget {
    pub(crate) fn start(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// 剩余可用时长；预算耗尽时返回 `TimedOut`。
    pub(crate) fn remaining(&self) -> io::Result<Duration> {
        let remaining = match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.timeout,
        };
        if remaining.is_zero() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        Ok(remaining)
    }
}

/// 按网络类型建连，解析与建连共同受 `timeout` 约束。
pub(crate) fn dial(
    kind: OperationKind,
    network: Network,
    address: &str,
    timeout: Duration,
) -> Result<LocalConnection> {
    let budget = DialBudget::start(timeout);
    match network {
        #[cfg(unix)]
        Network::Unix => dial_unix(kind, address, budget).map(LocalConnection::Unix),
        network if network.is_tcp() => {
            let candidates = addr::resolve_socket_addrs(
                kind,
                network.port_proto(),
                address,
                network.family(),
            )?;
            dial_tcp_candidates(kind, address, &candidates, budget).map(LocalConnection::Tcp)
        }
        network => {
            let candidates = addr::resolve_socket_addrs(
                kind,
                network.port_proto(),
                address,
                network.family(),
            )?;
            dial_udp(kind, address, &candidates, budget).map(LocalConnection::Udp)
        }
    }
}

/// 依次尝试每个候选地址，每次尝试只能使用剩余的超时预算；全部失败时返回最后一个错误。
fn dial_tcp_candidates(
    kind: OperationKind,
    address: &str,
    candidates: &[SocketAddr],
    budget: DialBudget,
) -> Result<TcpStream> {
    let mut last_error = None;
    for candidate in candidates {
        let remaining = match budget.remaining() {
            Ok(remaining) => remaining,
            Err(err) => {
                last_error = Some(err);
                break;
            }
        };
        trace!(operation = kind.message, %candidate, ?remaining, "tcp dial attempt");
        match TcpStream::connect_timeout(candidate, remaining) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_error = Some(err),
        }
    }
    let err = last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::TimedOut));
    Err(error::dial_error(kind, address, err))
}

fn dial_udp(
    kind: OperationKind,
    address: &str,
    candidates: &[SocketAddr],
    budget: DialBudget,
) -> Result<UdpSocket> {
    let mut last_error = None;
    for candidate in candidates {
        if let Err(err) = budget.remaining() {
            last_error = Some(err);
            break;
        }
        trace!(operation = kind.message, %candidate, "udp dial attempt");
        match connect_udp(*candidate) {
            Ok(socket) => return Ok(socket),
            Err(err) => last_error = Some(err),
        }
    }
    let err = last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable));
    Err(error::dial_error(kind, address, err))
}

#[cfg(unix)]
fn dial_unix(kind: OperationKind, path: &str, budget: DialBudget) -> Result<UnixStream> {
    let connect = || -> io::Result<UnixStream> {
        let remaining = budget.remaining()?;
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        trace!(operation = kind.message, path, ?remaining, "unix dial attempt");
        socket.connect_timeout(&SockAddr::unix(path)?, remaining)?;
        Ok(UnixStream::from(OwnedFd::from(socket)))
    };
    connect().map_err(|err| error::dial_error(kind, path, err))
}

fn connect_udp(raddr: SocketAddr) -> io::Result<UdpSocket> {
    let unspecified = match raddr {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    let socket = UdpSocket::bind(unspecified)?;
    socket.connect(raddr)?;
    Ok(socket)
}

/// 以显式本地地址建立 TCP 连接；`laddr` 为 `None` 时由内核选择。
pub(crate) fn dial_tcp_from(
    kind: OperationKind,
    laddr: Option<SocketAddr>,
    raddr: SocketAddr,
    timeout: Duration,
) -> Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(raddr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|err| error::dial_error(kind, raddr, err))?;
    if let Some(laddr) = laddr {
        socket
            .bind(&laddr.into())
            .map_err(|err| error::bind_error(kind, laddr, err))?;
    }
    trace!(operation = kind.message, ?laddr, %raddr, ?timeout, "tcp dial attempt");
    socket
        .connect_timeout(&raddr.into(), timeout)
        .map_err(|err| error::dial_error(kind, raddr, err))?;
    Ok(socket.into())
}
