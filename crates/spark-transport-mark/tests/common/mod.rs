//! 集成测试共享的辅助工具：桩标记器与空闲端口探测。

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener, UdpSocket};

/// 回环地址上由内核分配的端口，探测后立即释放。
pub fn free_tcp_addr() -> SocketAddr {
    let probe = TcpListener::bind(("127.0.0.1", 0)).expect("probe tcp port");
    probe.local_addr().expect("probe addr")
}

pub fn free_udp_addr() -> SocketAddr {
    let probe = UdpSocket::bind(("127.0.0.1", 0)).expect("probe udp port");
    probe.local_addr().expect("probe addr")
}

pub fn loopback_any_port() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

#[cfg(target_os = "linux")]
pub mod markers {
    use std::io;
    use std::os::fd::{AsRawFd, BorrowedFd};
    use std::sync::Mutex;

    use spark_transport_mark::SocketMarker;

    /// 记录每次写入的标记，始终成功。
    #[derive(Debug, Default)]
    pub struct Recording {
        marks: Mutex<Vec<u32>>,
    }

    impl Recording {
        pub fn marks(&self) -> Vec<u32> {
            self.marks.lock().expect("poisoned").clone()
        }
    }

    impl SocketMarker for Recording {
        fn set_mark(&self, fd: BorrowedFd<'_>, mark: u32) -> io::Result<()> {
            assert!(fd.as_raw_fd() >= 0, "marker received an invalid descriptor");
            self.marks.lock().expect("poisoned").push(mark);
            Ok(())
        }
    }

    /// 模拟缺少 `CAP_NET_ADMIN` 的环境。
    #[derive(Debug, Default)]
    pub struct Denied;

    impl SocketMarker for Denied {
        fn set_mark(&self, _fd: BorrowedFd<'_>, _mark: u32) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
    }
}
