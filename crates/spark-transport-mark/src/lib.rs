#![doc = r#"
# spark-transport-mark

## 设计动机（Why）
- **定位**：为代理、隧道客户端等上层组件提供地址解析、建连与监听能力，并在支持的平台上为
  自身创建的套接字打上内核流量标记（Linux `SO_MARK`），使策略路由与防火墙能够识别本进程的流量。
- **双路径**：本地路径（常规 TCP/UDP/IP）与 QUIC 路径（QUIC 专用 UDP）各自拥有独立标记。
- **能力条件化**：标记能力在编译期按目标平台选定；没有该能力的平台使用直通实现，契约保持一致。

## 核心契约（What）
- [`Transport`]：统一的同步契约，覆盖解析、`dial_local`/`dial_local_tcp`、TCP/UDP 监听与 QUIC UDP 监听；
- [`PlatformTransport`]：Linux 上为 `MarkingTransport<KernelMark>`，其他平台为 [`PlainTransport`]；
- [`new_transport`]：构造入口，`dial_timeout_secs <= 0` 归一化为 8 秒；
- 标记失败时套接字在返回错误前即被关闭，调用方永远拿不到未标记的套接字；
- 本层不读写任何载荷，不做连接池、重试、协议分帧或 TLS。

## 实现策略（How）
- 解析与建连直接使用标准库，显式本地地址建连借助 `socket2`；
- 标记变体组合直通变体，先完成相同的底层步骤，再通过 [`SocketMarker`] 写入标记；
- `runtime-tokio` 特性（默认开启）提供 [`AsyncTransport`]，`quic` 特性提供 `quinn::Endpoint` 构造助手。

## 风险与考量（Trade-offs）
- 标记写在套接字创建/建连之后，TCP 握手报文不携带标记；
- 设置 `SO_MARK` 需要 `CAP_NET_ADMIN`，权限不足时所有产生套接字的操作都会以标记错误失败。
"#]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]

mod addr;
mod config;
mod connection;
mod error;
#[cfg(target_os = "linux")]
mod marking;
mod plain;
#[cfg(feature = "quic")]
pub mod quic;
#[cfg(feature = "runtime-tokio")]
mod runtime;
mod transport;
mod util;

pub use addr::Network;
pub use config::{DEFAULT_DIAL_TIMEOUT, TrafficPath, TransportConfig, TransportSettings};
pub use connection::LocalConnection;
pub use error::{ErrorCategory, OperationKind, Result, TransportError};
#[cfg(target_os = "linux")]
pub use marking::{KernelMark, MarkingTransport, SocketMarker};
pub use plain::PlainTransport;
#[cfg(feature = "runtime-tokio")]
pub use runtime::{AsyncLocalConnection, AsyncTransport};
pub use transport::Transport;

/// 当前目标平台选定的传输实现。
#[cfg(target_os = "linux")]
pub type PlatformTransport = MarkingTransport<KernelMark>;

/// 当前目标平台选定的传输实现。
#[cfg(not(target_os = "linux"))]
pub type PlatformTransport = PlainTransport;

/// 以平台默认实现构造传输实例。
///
/// `dial_timeout_secs <= 0` 时建连超时取 [`DEFAULT_DIAL_TIMEOUT`]；
/// 两个标记值在没有标记能力的平台上被忽略。
pub fn new_transport(dial_timeout_secs: i64, local_mark: u32, quic_mark: u32) -> PlatformTransport {
    PlatformTransport::new(TransportConfig::new(
        dial_timeout_secs,
        local_mark,
        quic_mark,
    ))
}
