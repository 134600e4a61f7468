//! Tokio 适配层：在阻塞线程池上执行 [`Transport`] 操作，并把产出的标准库套接字转换为 Tokio 套接字。
//!
//! # 教案式注释
//!
//! ## 意图 (Why)
//! - 底层契约刻意保持同步阻塞；异步调用方不应在 reactor 线程上等待 DNS 或 `connect`；
//! - 丢弃 future 即可“取消”：后台阻塞调用照常完成，其结果随后被丢弃，套接字随之关闭。
//!
//! ## 契约 (What)
//! - 标记在被包装的 `Transport` 内部完成，转换前套接字已携带标记，标记不变式原样继承；
//! - 转换前先切换为非阻塞模式，这是 Tokio `from_std` 的前置条件；
//! - **前置条件**：必须在 Tokio 运行时内调用。

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, UdpSocket};
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::addr::Network;
use crate::connection::LocalConnection;
use crate::error::{self, OperationKind, Result};
use crate::transport::Transport;

/// `dial_local` 的异步版本返回值。
#[derive(Debug)]
pub enum AsyncLocalConnection {
    Tcp(TcpStream),
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncLocalConnection {
    pub fn network(&self) -> Network {
        match self {
            Self::Tcp(_) => Network::Tcp,
            Self::Udp(_) => Network::Udp,
            #[cfg(unix)]
            Self::Unix(_) => Network::Unix,
        }
    }
}

/// 将任意 [`Transport`] 包装为异步接口。
#[derive(Debug)]
pub struct AsyncTransport<T> {
    inner: Arc<T>,
}

impl<T> Clone for AsyncTransport<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport + 'static> AsyncTransport<T> {
    pub fn new(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub async fn resolve_quic_addr(&self, address: impl Into<String>) -> Result<SocketAddr> {
        let address = address.into();
        self.blocking(move |t| t.resolve_quic_addr(&address)).await
    }

    pub async fn listen_quic_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        let socket = self.blocking(move |t| t.listen_quic_udp(laddr)).await?;
        into_tokio_udp(error::LISTEN_QUIC_UDP, socket)
    }

    pub async fn resolve_local_ip_addr(&self, address: impl Into<String>) -> Result<IpAddr> {
        let address = address.into();
        self.blocking(move |t| t.resolve_local_ip_addr(&address)).await
    }

    pub async fn resolve_local_tcp_addr(&self, address: impl Into<String>) -> Result<SocketAddr> {
        let address = address.into();
        self.blocking(move |t| t.resolve_local_tcp_addr(&address)).await
    }

    pub async fn resolve_local_udp_addr(&self, address: impl Into<String>) -> Result<SocketAddr> {
        let address = address.into();
        self.blocking(move |t| t.resolve_local_udp_addr(&address)).await
    }

    pub async fn dial_local(
        &self,
        network: Network,
        address: impl Into<String>,
    ) -> Result<AsyncLocalConnection> {
        let address = address.into();
        let kind = error::DIAL_LOCAL;
        match self.blocking(move |t| t.dial_local(network, &address)).await? {
            LocalConnection::Tcp(stream) => {
                into_tokio_tcp(kind, stream).map(AsyncLocalConnection::Tcp)
            }
            LocalConnection::Udp(socket) => {
                into_tokio_udp(kind, socket).map(AsyncLocalConnection::Udp)
            }
            #[cfg(unix)]
            LocalConnection::Unix(stream) => stream
                .set_nonblocking(true)
                .and_then(|()| UnixStream::from_std(stream))
                .map(AsyncLocalConnection::Unix)
                .map_err(|err| error::runtime_error(kind, err)),
        }
    }

    pub async fn dial_local_tcp(
        &self,
        laddr: Option<SocketAddr>,
        raddr: SocketAddr,
    ) -> Result<TcpStream> {
        let stream = self.blocking(move |t| t.dial_local_tcp(laddr, raddr)).await?;
        into_tokio_tcp(error::DIAL_LOCAL_TCP, stream)
    }

    pub async fn listen_local_tcp(&self, laddr: SocketAddr) -> Result<TcpListener> {
        let kind = error::LISTEN_LOCAL_TCP;
        let listener = self.blocking(move |t| t.listen_local_tcp(laddr)).await?;
        listener
            .set_nonblocking(true)
            .and_then(|()| TcpListener::from_std(listener))
            .map_err(|err| error::runtime_error(kind, err))
    }

    pub async fn listen_local_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        let socket = self.blocking(move |t| t.listen_local_udp(laddr)).await?;
        into_tokio_udp(error::LISTEN_LOCAL_UDP, socket)
    }

    async fn blocking<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || op(&inner)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(error::runtime_error(
                error::ASYNC_BRIDGE,
                std::io::Error::other(err),
            )),
        }
    }
}

fn into_tokio_tcp(kind: OperationKind, stream: std::net::TcpStream) -> Result<TcpStream> {
    stream
        .set_nonblocking(true)
        .and_then(|()| TcpStream::from_std(stream))
        .map_err(|err| error::runtime_error(kind, err))
}

fn into_tokio_udp(kind: OperationKind, socket: std::net::UdpSocket) -> Result<UdpSocket> {
    socket
        .set_nonblocking(true)
        .and_then(|()| UdpSocket::from_std(socket))
        .map_err(|err| error::runtime_error(kind, err))
}
