use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, UdpSocket};

use crate::addr::Network;
use crate::config::TransportConfig;
use crate::connection::LocalConnection;
use crate::error::Result;

/// 与平台无关的传输契约：解析地址、建连与监听，区分本地路径与 QUIC 路径。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 上层（代理、隧道客户端等）只面向该 trait 编程，不关心当前平台能否给套接字打内核标记；
/// - 具体实现由编译期目标平台选定，见 [`PlatformTransport`](crate::PlatformTransport)。
///
/// ## 契约 (What)
/// - 所有方法同步阻塞，成功即返回全新的 OS 资源，所有权完全移交调用方；实现不保留任何引用；
/// - 只有建连受 [`TransportConfig::dial_timeout`] 约束，其余操作的耗时由操作系统决定；
/// - 失败原样返回，不做任何内部重试；
/// - **并发**：配置只读，多线程可同时调用同一实例。
///
/// ## 注意事项 (Trade-offs)
/// - 调用中途不可取消；需要取消语义的调用方可自行与其他机制竞速并丢弃结果，
///   或使用 `AsyncTransport`（`runtime-tokio` 特性）。
pub trait Transport: Send + Sync {
    /// 当前实例的只读配置。
    fn config(&self) -> &TransportConfig;

    /// 将字符串端点解析为 QUIC 路径使用的 UDP 地址。
    fn resolve_quic_addr(&self, address: &str) -> Result<SocketAddr>;

    /// 在给定本地地址上绑定 QUIC 路径的 UDP 套接字。
    fn listen_quic_udp(&self, laddr: SocketAddr) -> Result<UdpSocket>;

    /// 解析不带端口的主机名或 IP 字面量。
    fn resolve_local_ip_addr(&self, address: &str) -> Result<IpAddr>;

    fn resolve_local_tcp_addr(&self, address: &str) -> Result<SocketAddr>;

    fn resolve_local_udp_addr(&self, address: &str) -> Result<SocketAddr>;

    /// 按网络类型建连，受配置的建连超时约束。
    fn dial_local(&self, network: Network, address: &str) -> Result<LocalConnection>;

    /// 以显式本地地址建立 TCP 连接；`laddr` 为 `None` 时由内核选择。
    fn dial_local_tcp(&self, laddr: Option<SocketAddr>, raddr: SocketAddr) -> Result<TcpStream>;

    fn listen_local_tcp(&self, laddr: SocketAddr) -> Result<TcpListener>;

    fn listen_local_udp(&self, laddr: SocketAddr) -> Result<UdpSocket>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn config(&self) -> &TransportConfig {
        (**self).config()
    }

    fn resolve_quic_addr(&self, address: &str) -> Result<SocketAddr> {
        (**self).resolve_quic_addr(address)
    }

    fn listen_quic_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        (**self).listen_quic_udp(laddr)
    }

    fn resolve_local_ip_addr(&self, address: &str) -> Result<IpAddr> {
        (**self).resolve_local_ip_addr(address)
    }

    fn resolve_local_tcp_addr(&self, address: &str) -> Result<SocketAddr> {
        (**self).resolve_local_tcp_addr(address)
    }

    fn resolve_local_udp_addr(&self, address: &str) -> Result<SocketAddr> {
        (**self).resolve_local_udp_addr(address)
    }

    fn dial_local(&self, network: Network, address: &str) -> Result<LocalConnection> {
        (**self).dial_local(network, address)
    }

    fn dial_local_tcp(&self, laddr: Option<SocketAddr>, raddr: SocketAddr) -> Result<TcpStream> {
        (**self).dial_local_tcp(laddr, raddr)
    }

    fn listen_local_tcp(&self, laddr: SocketAddr) -> Result<TcpListener> {
        (**self).listen_local_tcp(laddr)
    }

    fn listen_local_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        (**self).listen_local_udp(laddr)
    }
}
