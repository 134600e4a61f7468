use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, UdpSocket};

use crate::addr::{self, Network, PortProto};
use crate::config::TransportConfig;
use crate::connection::LocalConnection;
use crate::error::{self, Result};
use crate::transport::Transport;
use crate::util;

/// 直通变体：直接调用操作系统的解析/建连/监听原语，不做任何标记。
///
/// 在缺少内核标记能力的平台上作为 [`PlatformTransport`](crate::PlatformTransport)；
/// 在 Linux 上同样可用，供明确不需要标记的调用方选择。配置中的两个标记值被忽略。
#[derive(Clone, Debug, Default)]
pub struct PlainTransport {
    config: TransportConfig,
}

impl PlainTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl Transport for PlainTransport {
    fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn resolve_quic_addr(&self, address: &str) -> Result<SocketAddr> {
        addr::resolve_socket_addr(error::RESOLVE_QUIC_UDP, PortProto::Udp, address)
    }

    fn listen_quic_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        util::bind_udp(error::LISTEN_QUIC_UDP, laddr)
    }

    fn resolve_local_ip_addr(&self, address: &str) -> Result<IpAddr> {
        addr::resolve_ip_addr(error::RESOLVE_LOCAL_IP, address)
    }

    fn resolve_local_tcp_addr(&self, address: &str) -> Result<SocketAddr> {
        addr::resolve_socket_addr(error::RESOLVE_LOCAL_TCP, PortProto::Tcp, address)
    }

    fn resolve_local_udp_addr(&self, address: &str) -> Result<SocketAddr> {
        addr::resolve_socket_addr(error::RESOLVE_LOCAL_UDP, PortProto::Udp, address)
    }

    fn dial_local(&self, network: Network, address: &str) -> Result<LocalConnection> {
        util::dial(
            error::DIAL_LOCAL,
            network,
            address,
            self.config.dial_timeout(),
        )
    }

    fn dial_local_tcp(&self, laddr: Option<SocketAddr>, raddr: SocketAddr) -> Result<TcpStream> {
        util::dial_tcp_from(
            error::DIAL_LOCAL_TCP,
            laddr,
            raddr,
            self.config.dial_timeout(),
        )
    }

    fn listen_local_tcp(&self, laddr: SocketAddr) -> Result<TcpListener> {
        util::listen_tcp(error::LISTEN_LOCAL_TCP, laddr)
    }

    fn listen_local_udp(&self, laddr: SocketAddr) -> Result<UdpSocket> {
        util::bind_udp(error::LISTEN_LOCAL_UDP, laddr)
    }
}
