//! 配置归一化性质与反序列化。

use std::net::TcpListener;
use std::time::Duration;

use proptest::prelude::*;
use serde::Deserialize;
use spark_transport_mark::{
    DEFAULT_DIAL_TIMEOUT, Network, PlainTransport, TrafficPath, Transport, TransportConfig,
    TransportSettings, new_transport,
};

proptest! {
    #[test]
    fn non_positive_timeouts_normalize_to_default(
        secs in i64::MIN..=0,
        local in any::<u32>(),
        quic in any::<u32>()
    ) {
        let config = TransportConfig::new(secs, local, quic);
        prop_assert_eq!(config.dial_timeout(), DEFAULT_DIAL_TIMEOUT);
        prop_assert_eq!(config.mark_for(TrafficPath::Local), local);
        prop_assert_eq!(config.mark_for(TrafficPath::Quic), quic);
    }

    #[test]
    fn positive_timeouts_are_taken_verbatim(secs in 1i64..=i64::MAX) {
        let transport = new_transport(secs, 1, 2);
        prop_assert_eq!(transport.config().dial_timeout(), Duration::from_secs(secs as u64));
    }

    #[test]
    fn any_positive_timeout_dials_loopback(secs in 1i64..=i64::MAX) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let raddr = listener.local_addr().expect("listener addr");
        let transport = PlainTransport::new(TransportConfig::new(secs, 1, 2));
        let conn = transport
            .dial_local(Network::Tcp, &raddr.to_string())
            .expect("loopback dial");
        prop_assert_eq!(conn.peer_addr().expect("peer"), Some(raddr));
    }
}

#[derive(Debug, Deserialize)]
struct ProxyConfig {
    name: String,
    transport: TransportSettings,
}

#[test]
fn settings_embed_in_caller_toml() {
    let raw = r#"
        name = "edge"

        [transport]
        dial_timeout_secs = 3
        local_mark = 0x64
        quic_mark = 200
    "#;
    let parsed: ProxyConfig = toml::from_str(raw).expect("valid toml");
    assert_eq!(parsed.name, "edge");
    let config = parsed.transport.into_config();
    assert_eq!(config.dial_timeout(), Duration::from_secs(3));
    assert_eq!(config.local_mark(), 100);
    assert_eq!(config.quic_mark(), 200);
}

#[test]
fn missing_settings_fields_default_to_zero() {
    let settings: TransportSettings = toml::from_str("quic_mark = 7").expect("valid toml");
    let config = TransportConfig::from(settings);
    assert_eq!(config.dial_timeout(), DEFAULT_DIAL_TIMEOUT);
    assert_eq!(config.local_mark(), 0);
    assert_eq!(config.quic_mark(), 7);
}

#[test]
fn unknown_settings_fields_are_rejected() {
    let result = toml::from_str::<TransportSettings>("retry = 3");
    assert!(result.is_err());
}
