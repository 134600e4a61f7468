use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{self, OperationKind, Result, TransportError};

/// 地址族过滤条件。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AddrFamily {
    Any,
    V4,
    V6,
}

impl AddrFamily {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Self::Any => true,
            Self::V4 => addr.is_ipv4(),
            Self::V6 => addr.is_ipv6(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Any => "ip",
            Self::V4 => "ipv4",
            Self::V6 => "ipv6",
        }
    }
}

/// `dial_local` 支持的网络类型。
///
/// 字符串形式与常见的 `tcp`/`tcp4`/`udp6` 约定一致；unix 平台额外支持 `unix`（流式套接字），
/// 该类型不属于任何可标记路径，建连成功后原样返回。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
    #[cfg(unix)]
    Unix,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
            #[cfg(unix)]
            Self::Unix => "unix",
        }
    }

    pub fn is_tcp(self) -> bool {
        matches!(self, Self::Tcp | Self::Tcp4 | Self::Tcp6)
    }

    pub fn is_udp(self) -> bool {
        matches!(self, Self::Udp | Self::Udp4 | Self::Udp6)
    }

    pub(crate) fn port_proto(self) -> PortProto {
        if self.is_udp() {
            PortProto::Udp
        } else {
            PortProto::Tcp
        }
    }

    pub(crate) fn family(self) -> AddrFamily {
        match self {
            Self::Tcp4 | Self::Udp4 => AddrFamily::V4,
            Self::Tcp6 | Self::Udp6 => AddrFamily::V6,
            _ => AddrFamily::Any,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "udp" => Ok(Self::Udp),
            "udp4" => Ok(Self::Udp4),
            "udp6" => Ok(Self::Udp6),
            #[cfg(unix)]
            "unix" => Ok(Self::Unix),
            other => Err(TransportError::UnknownNetwork(other.to_owned())),
        }
    }
}

/// 端口名查表所用的传输协议。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PortProto {
    Tcp,
    Udp,
}

impl PortProto {
    fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// `/etc/services` 不可用或未收录时的内置服务端口表。
const TCP_SERVICES: &[(&str, u16)] = &[
    ("ftp", 21),
    ("ftps", 990),
    ("gopher", 70),
    ("http", 80),
    ("https", 443),
    ("imap2", 143),
    ("imap3", 220),
    ("imaps", 993),
    ("pop3", 110),
    ("pop3s", 995),
    ("smtp", 25),
    ("submissions", 465),
    ("ssh", 22),
    ("telnet", 23),
];
const UDP_SERVICES: &[(&str, u16)] = &[("domain", 53)];

#[cfg(unix)]
const SERVICES_PATH: &str = "/etc/services";

/// 将 `host:port` 解析为单个套接字地址。
///
/// - 空主机（`:port`）视为 IPv4 未指定地址，空端口视为 0；
/// - 端口可以是数字或服务名（如 `http`），服务名先查系统服务表，再查内置表；
/// - 名称解析得到多个地址时优先返回 IPv4。
pub(crate) fn resolve_socket_addr(
    kind: OperationKind,
    proto: PortProto,
    address: &str,
) -> Result<SocketAddr> {
    resolve_socket_addrs(kind, proto, address, AddrFamily::Any)?
        .into_iter()
        .next()
        .ok_or_else(|| error::no_address(kind, address, AddrFamily::Any.label()))
}

/// 解析全部候选地址，按“IPv4 优先、其余保持解析顺序”排序。
pub(crate) fn resolve_socket_addrs(
    kind: OperationKind,
    proto: PortProto,
    address: &str,
    family: AddrFamily,
) -> Result<Vec<SocketAddr>> {
    let invalid = |reason: String| {
        error::resolve_error(kind, address, io::Error::new(io::ErrorKind::InvalidInput, reason))
    };
    let (host, port) = split_host_port(address).map_err(|reason| invalid(reason.to_owned()))?;
    let port = lookup_port(proto, port)
        .ok_or_else(|| invalid(format!("unknown port {}/{}", port, proto.as_str())))?;

    let mut addrs: Vec<SocketAddr> = if host.is_empty() {
        vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)]
    } else if let Ok(ip) = host.parse::<IpAddr>() {
        vec![SocketAddr::new(ip, port)]
    } else {
        (host, port)
            .to_socket_addrs()
            .map_err(|err| error::resolve_error(kind, address, err))?
            .collect()
    };
    addrs.retain(|addr| family.accepts(addr));
    addrs.sort_by_key(|addr| addr.is_ipv6());
    if addrs.is_empty() {
        return Err(error::no_address(kind, address, family.label()));
    }
    Ok(addrs)
}

/// 拆分 `host:port` / `[v6]:port`；不带方括号的主机中不允许再出现冒号。
fn split_host_port(address: &str) -> std::result::Result<(&str, &str), &'static str> {
    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or("missing ']' in address")?;
        let port = tail.strip_prefix(':').ok_or("missing port in address")?;
        return Ok((host, port));
    }
    let (host, port) = address.rsplit_once(':').ok_or("missing port in address")?;
    if host.contains(':') {
        return Err("too many colons in address");
    }
    Ok((host, port))
}

/// 空端口为 0；数字端口须落在 `u16` 范围内；其余按服务名查表。
fn lookup_port(proto: PortProto, port: &str) -> Option<u16> {
    if port.is_empty() {
        return Some(0);
    }
    if port.bytes().all(|b| b.is_ascii_digit()) {
        return port.parse().ok();
    }
    let service = port.to_ascii_lowercase();
    system_service_port(proto, &service).or_else(|| {
        let table = match proto {
            PortProto::Tcp => TCP_SERVICES,
            PortProto::Udp => UDP_SERVICES,
        };
        table
            .iter()
            .find(|(name, _)| *name == service)
            .map(|(_, port)| *port)
    })
}

#[cfg(unix)]
fn system_service_port(proto: PortProto, service: &str) -> Option<u16> {
    let contents = std::fs::read_to_string(SERVICES_PATH).ok()?;
    parse_services(&contents, proto, service)
}

#[cfg(not(unix))]
fn system_service_port(_proto: PortProto, _service: &str) -> Option<u16> {
    None
}

/// 解析 services(5) 格式：`name port/proto [aliases...] [# comment]`。
#[cfg_attr(not(unix), allow(dead_code))]
fn parse_services(contents: &str, proto: PortProto, service: &str) -> Option<u16> {
    contents.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let (port, line_proto) = fields.next()?.split_once('/')?;
        if line_proto != proto.as_str() {
            return None;
        }
        let matches = name.eq_ignore_ascii_case(service)
            || fields.any(|alias| alias.eq_ignore_ascii_case(service));
        if matches { port.parse().ok() } else { None }
    })
}

/// 解析不带端口的主机名或 IP 字面量，接受 `[v6]` 括号形式。
pub(crate) fn resolve_ip_addr(kind: OperationKind, address: &str) -> Result<IpAddr> {
    let host = address
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(address);
    if host.is_empty() {
        return Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs: Vec<SocketAddr> = (host, 0u16)
        .to_socket_addrs()
        .map_err(|err| error::resolve_error(kind, address, err))?
        .collect();
    addrs.sort_by_key(|addr| addr.is_ipv6());
    addrs
        .first()
        .map(SocketAddr::ip)
        .ok_or_else(|| error::no_address(kind, address, AddrFamily::Any.label()))
}
