//! 标记变体：每创建一个套接字，立即为其写入路径对应的内核流量标记（`SO_MARK`）。
//!
//! # 教案式注释
//!
//! ## 意图 (Why)
//! - 让策略路由与防火墙规则能够依据标记区分本进程的本地流量与 QUIC 流量；
//! - 标记能力被收敛到 [`SocketMarker`] 这一窄接口，直通变体因此不依赖任何平台 API。
//!
//! ## 逻辑 (How)
//! 1. 先委托 [`PlainTransport`] 完成与直通变体完全相同的解析/建连/监听；
//! 2. 成功后借出套接字的原始描述符，按路径选择标记（QUIC 路径用 QUIC 标记，
//!    其余本地 TCP/UDP 的建连与监听一律用本地标记）；
//! 3. 标记失败时先关闭套接字，再返回 [`TransportError::Marking`](crate::TransportError::Marking)；
//! 4. 标记成功则原样交还套接字。
//!
//! ## 契约 (What)
//! - 调用方拿到的每个套接字都已带上正确标记，不存在“半配置”的中间态；
//! - `dial_local` 只标记 TCP 与 UDP 连接，其他类型（unix 流）原样返回，不报错。
//!
//! ## 注意事项 (Trade-offs)
//! - 标记在建连完成后才写入，握手阶段的报文不受标记影响；
//! - 设置 `SO_MARK` 需要 `CAP_NET_ADMIN`，权限不足时所有产生套接字的操作都会以标记错误失败。

use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::os::fd::{AsFd, BorrowedFd};

use nix::sys::socket::{getsockopt, setsockopt, sockopt};
use tracing::{debug, trace};

use crate::addr::Network;
use crate::config::{TrafficPath, TransportConfig};
use crate::connection::LocalConnection;
use crate::error::{self, OperationKind, Result};
use crate::plain::PlainTransport;
use crate::transport::Transport;

/// “给套接字 S 写入不透明的 32 位标记”这一能力。
pub trait SocketMarker: Send + Sync {
    fn set_mark(&self, fd: BorrowedFd<'_>, mark: u32) -> io::Result<()>;
}

/// 通过 `setsockopt(SOL_SOCKET, SO_MARK)` 写入内核标记。
#[derive(Clone, Copy, Debug, Default)]
pub struct KernelMark;

impl KernelMark {
    /// 读取套接字当前的内核标记。
    pub fn current(fd: BorrowedFd<'_>) -> io::Result<u32> {
        getsockopt(&fd, sockopt::Mark).map_err(io::Error::from)
    }
}

impl SocketMarker for KernelMark {
    fn set_mark(&self, fd: BorrowedFd<'_>, mark: u32) -> io::Result<()> {
        setsockopt(&fd, sockopt::Mark, &mark).map_err(io::Error::from)
    }
}

impl<M: SocketMarker + ?Sized> SocketMarker for &M {
    fn set_mark(&self, fd: BorrowedFd<'_>, mark: u32) -> io::Result<()> {
        (**self).set_mark(fd, mark)
    }
}

/// 在每个新建套接字上写入路径标记的传输实现。
#[derive(Clone, Debug, Default)]
pub struct MarkingTransport<M = KernelMark> {
    inner: PlainTransport,
    marker: M,
}

impl MarkingTransport<KernelMark> {
    pub fn new(config: TransportConfig) -> Self {
        Self::with_marker(config, KernelMark)
    }
}

impl<M: SocketMarker> MarkingTransport<M> {
    /// 使用自定义标记器构造，便于在不具备 `CAP_NET_ADMIN` 的环境中替换标记步骤。
    pub fn with_marker(config: TransportConfig, marker: M) -> Self {
        Self {
            inner: PlainTransport::new(config),
            marker,
        }
    }

    pub fn marker(&self) -> &M {
        &self.marker
    }

    /// 为套接字写入路径标记；失败时关闭套接字并返回标记错误。
    fn apply<S: AsFd>(&self, kind: OperationKind, path: TrafficPath, socket: S) -> Result<S> {
        let mark = self.inner.config().mark_for(path);
        match self.marker.set_mark(socket.as_fd(), mark) {
            Ok(()) => {
                debug!(operation = kind.message, ?path, mark, "socket marked");
                Ok(socket)
            }
            Err(err) => {
                drop(socket);
                Err(error::marking_error(kind, mark, err))
            }
        }
    }
}

impl<M: SocketMarker> Transport for MarkingTransport<M> {
    fn config(&self) -> &TransportConfig {
        self.inner.config()
    }

    fn resolve_quic_addr(&self, address: &str) -> Result<SocketAddr> {
        self.inner.resolve_quic_addr(address)
    }

    fn listen_quic_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        let socket = self.inner.listen_quic_udp(laddr)?;
        self.apply(error::LISTEN_QUIC_UDP, TrafficPath::Quic, socket)
    }

    fn resolve_local_ip_addr(&self, address: &str) -> Result<IpAddr> {
        self.inner.resolve_local_ip_addr(address)
    }

    fn resolve_local_tcp_addr(&self, address: &str) -> Result<SocketAddr> {
        self.inner.resolve_local_tcp_addr(address)
    }

    fn resolve_local_udp_addr(&self, address: &str) -> Result<SocketAddr> {
        self.inner.resolve_local_udp_addr(address)
    }

    fn dial_local(&self, network: Network, address: &str) -> Result<LocalConnection> {
        let kind = error::DIAL_LOCAL;
        match self.inner.dial_local(network, address)? {
            LocalConnection::Tcp(stream) => self
                .apply(kind, TrafficPath::Local, stream)
                .map(LocalConnection::Tcp),
            LocalConnection::Udp(socket) => self
                .apply(kind, TrafficPath::Local, socket)
                .map(LocalConnection::Udp),
            other => {
                trace!(network = %other.network(), "connection kind left unmarked");
                Ok(other)
            }
        }
    }

    fn dial_local_tcp(&self, laddr: Option<SocketAddr>, raddr: SocketAddr) -> Result<TcpStream> {
        let stream = self.inner.dial_local_tcp(laddr, raddr)?;
        self.apply(error::DIAL_LOCAL_TCP, TrafficPath::Local, stream)
    }

    fn listen_local_tcp(&self, laddr: SocketAddr) -> Result<TcpListener> {
        let listener = self.inner.listen_local_tcp(laddr)?;
        self.apply(error::LISTEN_LOCAL_TCP, TrafficPath::Local, listener)
    }

    fn listen_local_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        let socket = self.inner.listen_local_udp(laddr)?;
        self.apply(error::LISTEN_LOCAL_UDP, TrafficPath::Local, socket)
    }
}
