use std::io;
use std::time::Duration;

use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub(crate) const RESOLVE_QUIC_UDP: OperationKind = OperationKind {
    code: "spark.transport.mark.quic_resolve_failed",
    message: "quic resolve udp addr",
};
pub(crate) const LISTEN_QUIC_UDP: OperationKind = OperationKind {
    code: "spark.transport.mark.quic_listen_udp_failed",
    message: "quic listen udp",
};
pub(crate) const RESOLVE_LOCAL_IP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_resolve_ip_failed",
    message: "local resolve ip addr",
};
pub(crate) const RESOLVE_LOCAL_TCP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_resolve_tcp_failed",
    message: "local resolve tcp addr",
};
pub(crate) const RESOLVE_LOCAL_UDP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_resolve_udp_failed",
    message: "local resolve udp addr",
};
pub(crate) const DIAL_LOCAL: OperationKind = OperationKind {
    code: "spark.transport.mark.local_dial_failed",
    message: "local dial",
};
pub(crate) const DIAL_LOCAL_TCP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_dial_tcp_failed",
    message: "local dial tcp",
};
pub(crate) const LISTEN_LOCAL_TCP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_listen_tcp_failed",
    message: "local listen tcp",
};
pub(crate) const LISTEN_LOCAL_UDP: OperationKind = OperationKind {
    code: "spark.transport.mark.local_listen_udp_failed",
    message: "local listen udp",
};
#[cfg(feature = "runtime-tokio")]
pub(crate) const ASYNC_BRIDGE: OperationKind = OperationKind {
    code: "spark.transport.mark.async_bridge_failed",
    message: "async bridge",
};
#[cfg(feature = "quic")]
pub(crate) const QUIC_ENDPOINT: OperationKind = OperationKind {
    code: "spark.transport.mark.quic_endpoint_failed",
    message: "quic endpoint",
};

const MARKING_CODE: &str = "spark.transport.mark.set_mark_failed";
const UNKNOWN_NETWORK_CODE: &str = "spark.transport.mark.unknown_network";
const NO_ADDRESS_CODE: &str = "spark.transport.mark.no_address";

/// 错误分类，仅作为调用方的处置建议；本层自身从不重试。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 操作超过了配置的建连超时。
    Timeout,
    /// 暂时性失败，调用方可在给定间隔后自行重试。
    Retryable { after: Duration },
    /// 权限不足，典型场景是缺少 `CAP_NET_ADMIN` 时设置标记。
    PermissionDenied,
    /// 重试无意义的失败。
    NonRetryable,
}

/// 传输层统一错误。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 按失败阶段区分解析、建连、绑定、监听与标记，便于上层按阶段做策略；
/// - 每个变体都保留原始 [`io::Error`]，错误原样透出，不做吞并或改写。
///
/// ## 契约 (What)
/// - `code()` 返回稳定错误码，可直接作为指标标签；
/// - `category()` 依据底层 `io::ErrorKind` 给出分类建议；
/// - `Marking` 出现时，对应的套接字已在返回前关闭，调用方无需清理。
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{}: {address}: {source}", .kind.message)]
    Resolve {
        kind: OperationKind,
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("{}: no {family} address for {address}", .kind.message)]
    NoAddress {
        kind: OperationKind,
        address: String,
        family: &'static str,
    },
    #[error("{}: {address}: {source}", .kind.message)]
    Dial {
        kind: OperationKind,
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("{}: {address}: {source}", .kind.message)]
    Bind {
        kind: OperationKind,
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("{}: {address}: {source}", .kind.message)]
    Listen {
        kind: OperationKind,
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("{}: set mark {mark:#x}: {source}", .kind.message)]
    Marking {
        kind: OperationKind,
        mark: u32,
        #[source]
        source: io::Error,
    },
    /// 套接字已创建，但移交给异步运行时或上层协议栈时失败。
    #[error("{}: {source}", .kind.message)]
    Runtime {
        kind: OperationKind,
        #[source]
        source: io::Error,
    },
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
}

impl TransportError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolve { kind, .. }
            | Self::Dial { kind, .. }
            | Self::Bind { kind, .. }
            | Self::Listen { kind, .. }
            | Self::Runtime { kind, .. } => kind.code,
            Self::NoAddress { .. } => NO_ADDRESS_CODE,
            Self::Marking { .. } => MARKING_CODE,
            Self::UnknownNetwork(_) => UNKNOWN_NETWORK_CODE,
        }
    }

    /// 返回产生错误的操作；`UnknownNetwork` 在进入任何操作前即被拒绝，因此没有对应操作。
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::Resolve { kind, .. }
            | Self::NoAddress { kind, .. }
            | Self::Dial { kind, .. }
            | Self::Bind { kind, .. }
            | Self::Listen { kind, .. }
            | Self::Runtime { kind, .. }
            | Self::Marking { kind, .. } => Some(*kind),
            Self::UnknownNetwork(_) => None,
        }
    }

    /// 底层 IO 错误（若有）。
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Resolve { source, .. }
            | Self::Dial { source, .. }
            | Self::Bind { source, .. }
            | Self::Listen { source, .. }
            | Self::Runtime { source, .. }
            | Self::Marking { source, .. } => Some(source),
            Self::NoAddress { .. } | Self::UnknownNetwork(_) => None,
        }
    }

    pub fn is_marking(&self) -> bool {
        matches!(self, Self::Marking { .. })
    }

    pub fn is_timeout(&self) -> bool {
        self.category() == ErrorCategory::Timeout
    }

    pub fn category(&self) -> ErrorCategory {
        match self.io_error() {
            Some(error) => categorize_io_error(error),
            None => ErrorCategory::NonRetryable,
        }
    }
}

pub type Result<T, E = TransportError> = std::result::Result<T, E>;

pub(crate) fn resolve_error(
    kind: OperationKind,
    address: impl Into<String>,
    source: io::Error,
) -> TransportError {
    TransportError::Resolve {
        kind,
        address: address.into(),
        source,
    }
}

pub(crate) fn no_address(
    kind: OperationKind,
    address: impl Into<String>,
    family: &'static str,
) -> TransportError {
    TransportError::NoAddress {
        kind,
        address: address.into(),
        family,
    }
}

pub(crate) fn dial_error(
    kind: OperationKind,
    address: impl ToString,
    source: io::Error,
) -> TransportError {
    TransportError::Dial {
        kind,
        address: address.to_string(),
        source,
    }
}

pub(crate) fn bind_error(
    kind: OperationKind,
    address: impl ToString,
    source: io::Error,
) -> TransportError {
    TransportError::Bind {
        kind,
        address: address.to_string(),
        source,
    }
}

pub(crate) fn listen_error(
    kind: OperationKind,
    address: impl ToString,
    source: io::Error,
) -> TransportError {
    TransportError::Listen {
        kind,
        address: address.to_string(),
        source,
    }
}

#[cfg(any(feature = "runtime-tokio", feature = "quic"))]
pub(crate) fn runtime_error(kind: OperationKind, source: io::Error) -> TransportError {
    TransportError::Runtime { kind, source }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn marking_error(kind: OperationKind, mark: u32, source: io::Error) -> TransportError {
    TransportError::Marking { kind, mark, source }
}

fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::WouldBlock | ErrorKind::Interrupted => ErrorCategory::Retryable {
            after: Duration::from_millis(5),
        },
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrInUse
        | ErrorKind::AddrNotAvailable => ErrorCategory::Retryable {
            after: Duration::from_millis(50),
        },
        ErrorKind::PermissionDenied => ErrorCategory::PermissionDenied,
        _ => ErrorCategory::NonRetryable,
    }
}
