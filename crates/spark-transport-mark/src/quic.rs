//! 基于 QUIC 路径套接字构造 `quinn::Endpoint`。
//!
//! 底层 UDP 套接字经由 [`Transport::listen_quic_udp`] 创建，因此在标记平台上已携带 QUIC 标记；
//! TLS 与 QUIC 参数（`ServerConfig`、默认 `ClientConfig`）由调用方负责。

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::{Endpoint, EndpointConfig, ServerConfig, TokioRuntime};

use crate::error::{self, Result};
use crate::transport::Transport;

/// 在 `laddr` 上创建 QUIC Endpoint。`server_config` 为 `None` 时只能作为客户端使用。
///
/// 必须在 Tokio 运行时内调用：Endpoint 的驱动任务会被派生到当前运行时。
pub fn endpoint<T: Transport + ?Sized>(
    transport: &T,
    laddr: SocketAddr,
    server_config: Option<ServerConfig>,
) -> Result<Endpoint> {
    let socket = transport.listen_quic_udp(laddr)?;
    Endpoint::new(
        EndpointConfig::default(),
        server_config,
        socket,
        Arc::new(TokioRuntime),
    )
    .map_err(|err| error::runtime_error(error::QUIC_ENDPOINT, err))
}
