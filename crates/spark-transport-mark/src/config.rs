//! 传输配置：建连超时与两条路径各自的流量标记。
//!
//! # 教案式注释
//!
//! ## 意图 (Why)
//! - 让同一进程内的本地流量与 QUIC 流量在内核路由/防火墙层面可被区分；
//! - 配置在构造时一次性归一化，此后只读，可被任意线程共享而无需加锁。
//!
//! ## 契约 (What)
//! - `dial_timeout_secs <= 0` 归一化为 [`DEFAULT_DIAL_TIMEOUT`]（8 秒），正值按秒原样采用；
//! - 标记值对本层是不透明的 `u32`，仅对内核流量分类子系统有意义；无标记能力的平台上被忽略。

use std::time::Duration;

use serde::Deserialize;

/// 未配置或配置非正数时采用的建连超时。
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(8);

/// 套接字所属的流量路径，决定应用哪一个标记。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrafficPath {
    /// 常规 TCP/UDP/IP 出入站流量。
    Local,
    /// 专供 QUIC 传输使用的 UDP 流量。
    Quic,
}

/// 归一化后的不可变配置。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    dial_timeout: Duration,
    local_mark: u32,
    quic_mark: u32,
}

impl TransportConfig {
    pub fn new(dial_timeout_secs: i64, local_mark: u32, quic_mark: u32) -> Self {
        let dial_timeout = if dial_timeout_secs <= 0 {
            DEFAULT_DIAL_TIMEOUT
        } else {
            Duration::from_secs(dial_timeout_secs.unsigned_abs())
        };
        Self {
            dial_timeout,
            local_mark,
            quic_mark,
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    pub fn local_mark(&self) -> u32 {
        self.local_mark
    }

    pub fn quic_mark(&self) -> u32 {
        self.quic_mark
    }

    /// 返回指定路径应携带的标记。
    pub fn mark_for(&self, path: TrafficPath) -> u32 {
        match path {
            TrafficPath::Local => self.local_mark,
            TrafficPath::Quic => self.quic_mark,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportSettings::default().into_config()
    }
}

/// 配置的原始形态，可直接嵌入调用方的 TOML/JSON 配置文件。
///
/// 所有字段缺省为 0；`into_config` 与 [`TransportConfig::new`] 采用同一归一化规则。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSettings {
    pub dial_timeout_secs: i64,
    pub local_mark: u32,
    pub quic_mark: u32,
}

impl TransportSettings {
    pub fn into_config(self) -> TransportConfig {
        TransportConfig::new(self.dial_timeout_secs, self.local_mark, self.quic_mark)
    }
}

impl From<TransportSettings> for TransportConfig {
    fn from(settings: TransportSettings) -> Self {
        settings.into_config()
    }
}
