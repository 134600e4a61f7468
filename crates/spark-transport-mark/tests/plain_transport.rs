//! `PlainTransport` 的端到端行为：解析、建连、监听与错误分类。

mod common;

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::thread;
use std::time::Duration;

use common::{free_tcp_addr, loopback_any_port};
use spark_transport_mark::{
    DEFAULT_DIAL_TIMEOUT, ErrorCategory, LocalConnection, Network, PlainTransport, Transport,
    TransportConfig, TransportError,
};

fn plain() -> PlainTransport {
    PlainTransport::new(TransportConfig::new(0, 100, 200))
}

fn spawn_echo_listener() -> SocketAddr {
    let listener = TcpListener::bind(loopback_any_port()).expect("bind echo listener");
    let addr = listener.local_addr().expect("echo addr");
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 64];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 || stream.write_all(&buf[..n]).is_err() {
                    break;
                }
            }
        }
    });
    addr
}

#[test]
fn zero_timeout_uses_default() {
    assert_eq!(plain().config().dial_timeout(), DEFAULT_DIAL_TIMEOUT);
    assert_eq!(DEFAULT_DIAL_TIMEOUT, Duration::from_secs(8));
}

#[test]
fn resolves_literals_and_localhost() {
    let transport = plain();
    assert_eq!(
        transport.resolve_quic_addr("127.0.0.1:4433").expect("quic addr"),
        SocketAddr::from(([127, 0, 0, 1], 4433))
    );
    assert_eq!(
        transport.resolve_local_udp_addr(":53").expect("udp addr"),
        SocketAddr::from(([0, 0, 0, 0], 53))
    );
    let tcp = transport
        .resolve_local_tcp_addr("localhost:8080")
        .expect("localhost resolves");
    assert!(tcp.ip().is_loopback());
    assert_eq!(tcp.port(), 8080);
    assert_eq!(
        transport.resolve_local_ip_addr("localhost").expect("ip addr"),
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    );
}

#[test]
fn resolves_service_names_and_empty_ports() {
    let transport = plain();
    let http = transport
        .resolve_local_tcp_addr("localhost:http")
        .expect("service name port");
    assert!(http.ip().is_loopback());
    assert_eq!(http.port(), 80);
    assert_eq!(
        transport.resolve_local_tcp_addr("127.0.0.1:").expect("empty port"),
        SocketAddr::from(([127, 0, 0, 1], 0))
    );
    assert_eq!(
        transport.resolve_local_udp_addr(":").expect("empty host and port"),
        SocketAddr::from(([0, 0, 0, 0], 0))
    );
    assert_eq!(
        transport.resolve_quic_addr("127.0.0.1:https").expect("quic service port").port(),
        443
    );
}

#[test]
fn malformed_address_fails_resolution() {
    let err = plain()
        .resolve_local_tcp_addr("127.0.0.1")
        .expect_err("port is required");
    assert!(matches!(err, TransportError::Resolve { .. }));
    assert_eq!(err.code(), "spark.transport.mark.local_resolve_tcp_failed");
}

#[test]
fn dial_local_tcp_binds_requested_local_addr() {
    let transport = plain();
    let listener = TcpListener::bind(loopback_any_port()).expect("bind listener");
    let raddr = listener.local_addr().expect("listener addr");
    let laddr = free_tcp_addr();

    let stream = transport
        .dial_local_tcp(Some(laddr), raddr)
        .expect("dial with local addr");
    assert_eq!(stream.local_addr().expect("local addr"), laddr);
    assert_eq!(stream.peer_addr().expect("peer addr"), raddr);

    let (_, peer) = listener.accept().expect("accept");
    assert_eq!(peer, laddr);
}

#[test]
fn dial_local_tcp_round_trips_through_echo() {
    let transport = plain();
    let echo = spawn_echo_listener();
    let conn = transport
        .dial_local(Network::Tcp, &echo.to_string())
        .expect("dial echo");
    assert_eq!(conn.network(), Network::Tcp);
    assert_eq!(conn.peer_addr().expect("peer"), Some(echo));

    let mut stream = conn.into_tcp().expect("tcp connection");
    stream.write_all(b"ping").expect("write");
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).expect("read");
    assert_eq!(&buf, b"ping");
}

#[test]
fn dial_local_udp_returns_connected_socket() {
    let transport = plain();
    let server = UdpSocket::bind(loopback_any_port()).expect("bind server");
    let server_addr = server.local_addr().expect("server addr");

    let conn = transport
        .dial_local(Network::Udp4, &server_addr.to_string())
        .expect("dial udp");
    let socket = conn.into_udp().expect("udp connection");
    assert_eq!(socket.peer_addr().expect("peer"), server_addr);

    socket.send(b"hello").expect("send");
    let mut buf = [0u8; 8];
    let (n, from) = server.recv_from(&mut buf).expect("recv");
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(from, socket.local_addr().expect("local"));
}

#[test]
fn huge_timeout_dials_without_overflow() {
    let transport = PlainTransport::new(TransportConfig::new(i64::MAX, 1, 2));
    assert_eq!(
        transport.config().dial_timeout(),
        Duration::from_secs(i64::MAX as u64)
    );
    let listener = TcpListener::bind(loopback_any_port()).expect("bind listener");
    let raddr = listener.local_addr().expect("listener addr");

    let conn = transport
        .dial_local(Network::Tcp, &raddr.to_string())
        .expect("dial_local with huge timeout");
    assert_eq!(conn.peer_addr().expect("peer"), Some(raddr));
    let stream = transport
        .dial_local_tcp(None, raddr)
        .expect("dial_local_tcp with huge timeout");
    assert_eq!(stream.peer_addr().expect("peer"), raddr);
    let udp = transport
        .dial_local(Network::Udp, &raddr.to_string())
        .expect("udp dial with huge timeout");
    assert_eq!(udp.network(), Network::Udp);
}

/// 用 backlog 为 0 且从不 accept 的监听器制造“黑洞”：队列占满后内核丢弃新的 SYN，
/// 后续建连只能等到超时。
#[cfg(target_os = "linux")]
#[test]
fn dial_honours_configured_timeout() {
    use socket2::{Domain, Socket, Type};
    use std::net::TcpStream;
    use std::time::Instant;

    let socket = Socket::new(Domain::IPV4, Type::STREAM, None).expect("socket");
    socket
        .bind(&loopback_any_port().into())
        .expect("bind blackhole");
    socket.listen(0).expect("listen");
    let blackhole = socket.local_addr().expect("addr").as_socket().expect("inet addr");

    let mut fillers = Vec::new();
    let mut saturated = false;
    for _ in 0..16 {
        match TcpStream::connect_timeout(&blackhole, Duration::from_millis(200)) {
            Ok(stream) => fillers.push(stream),
            Err(err) if err.kind() == ErrorKind::TimedOut => {
                saturated = true;
                break;
            }
            Err(err) => panic!("unexpected filler error: {err}"),
        }
    }
    if !saturated {
        eprintln!("accept queue never filled; kernel does not drop SYNs here");
        return;
    }

    let transport = PlainTransport::new(TransportConfig::new(1, 1, 2));
    let started = Instant::now();
    let err = transport
        .dial_local(Network::Tcp, &blackhole.to_string())
        .expect_err("dial into a full accept queue");
    let elapsed = started.elapsed();
    assert!(matches!(err, TransportError::Dial { .. }), "{err}");
    assert!(err.is_timeout(), "{err}");
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");

    let started = Instant::now();
    let err = transport
        .dial_local_tcp(None, blackhole)
        .expect_err("explicit dial into a full accept queue");
    assert!(err.is_timeout(), "{err}");
    assert!(started.elapsed() < Duration::from_secs(4));
    drop(fillers);
}

#[test]
fn dial_family_mismatch_reports_no_address() {
    let err = plain()
        .dial_local(Network::Tcp6, "127.0.0.1:80")
        .expect_err("v4 literal on tcp6");
    assert!(matches!(err, TransportError::NoAddress { family: "ipv6", .. }));
}

#[test]
fn dial_refused_surfaces_os_error() {
    let closed = free_tcp_addr();
    let err = plain()
        .dial_local(Network::Tcp, &closed.to_string())
        .expect_err("nothing listens there");
    assert!(matches!(err, TransportError::Dial { .. }));
    assert_eq!(
        err.io_error().map(std::io::Error::kind),
        Some(ErrorKind::ConnectionRefused)
    );
    assert!(matches!(err.category(), ErrorCategory::Retryable { .. }));
}

#[cfg(unix)]
#[test]
fn dial_local_unix_is_passed_through() {
    use std::os::unix::net::UnixListener;

    let path = std::env::temp_dir().join(format!(
        "spark-transport-mark-plain-{}.sock",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).expect("bind unix listener");

    let conn = plain()
        .dial_local(Network::Unix, path.to_str().expect("utf-8 path"))
        .expect("dial unix");
    assert!(matches!(conn, LocalConnection::Unix(_)));
    assert_eq!(conn.local_addr().expect("local"), None);
    listener.accept().expect("accept unix");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn listen_local_udp_in_use_is_a_bind_error() {
    let transport = plain();
    let first = transport
        .listen_local_udp(loopback_any_port())
        .expect("first bind");
    let taken = first.local_addr().expect("bound addr");

    let err = transport
        .listen_local_udp(taken)
        .expect_err("address already bound");
    assert!(matches!(err, TransportError::Bind { .. }));
    assert_eq!(
        err.io_error().map(std::io::Error::kind),
        Some(ErrorKind::AddrInUse)
    );
}

#[test]
fn listen_local_tcp_in_use_is_a_listen_error() {
    let transport = plain();
    let first = transport
        .listen_local_tcp(loopback_any_port())
        .expect("first listen");
    let taken = first.local_addr().expect("bound addr");

    let err = transport
        .listen_local_tcp(taken)
        .expect_err("address already bound");
    assert!(matches!(err, TransportError::Listen { .. }));
    assert_eq!(err.code(), "spark.transport.mark.local_listen_tcp_failed");
}

#[test]
fn listen_quic_udp_binds_requested_addr() {
    let socket = plain()
        .listen_quic_udp(loopback_any_port())
        .expect("quic udp");
    let addr = socket.local_addr().expect("addr");
    assert!(addr.ip().is_loopback());
    assert_ne!(addr.port(), 0);
}

#[test]
fn transport_is_shareable_across_threads() {
    let transport = plain();
    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                transport
                    .listen_local_udp(loopback_any_port())
                    .expect("concurrent bind");
            });
        }
    });
}
