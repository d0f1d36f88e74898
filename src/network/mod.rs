//! Network module
//!
//! UDP glue around the protocol: a one-shot client that measures the
//! offset to a server, and a single-threaded server loop.

mod client;
mod server;

pub use self::client::{query, Exchange, NtpClient};
pub use self::server::Listener;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::core::{Error, ServerIdentity};
    use crate::protocol::Responder;
    use crate::time::{FixedClock, OffsetClock, TimeSource};

    async fn start_server(clock: Arc<dyn TimeSource>) -> (u16, tokio::task::JoinHandle<()>) {
        let responder = Responder::new(&ServerIdentity::default(), clock).unwrap();
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), responder)
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let _ = listener.serve_forever().await;
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_query_system_clock_server() {
        let (port, handle) = start_server(Arc::new(OffsetClock::new(0.0))).await;

        let m = query("127.0.0.1", port, Duration::from_secs(2)).await.unwrap();
        assert!(m.offset_seconds.abs() < 0.5, "offset was {}", m.offset_seconds);
        assert!(m.delay_seconds >= 0.0);
        assert!(m.delay_seconds < 1.0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_query_future_server() {
        let (port, handle) = start_server(Arc::new(OffsetClock::new(3600.0))).await;

        let m = query("127.0.0.1", port, Duration::from_secs(2)).await.unwrap();
        assert!((m.offset_seconds - 3600.0).abs() < 0.5, "offset was {}", m.offset_seconds);
        assert!((m.server_time - m.local_time - m.offset_seconds).abs() < 1e-6);

        handle.abort();
    }

    #[tokio::test]
    async fn test_exchange_with_fixed_clocks() {
        // Server pinned 10 s after the client's pinned clock
        let (port, handle) = start_server(Arc::new(FixedClock::new(1_000_010.0))).await;
        let client = NtpClient::new(Duration::from_secs(2))
            .with_clock(Arc::new(FixedClock::new(1_000_000.0)));

        let exchange = client.exchange("127.0.0.1", port).await.unwrap();
        assert_eq!(exchange.response.origin_timestamp, exchange.sample.origin);
        assert_eq!(exchange.response.stratum, 2);
        assert_eq!(exchange.measurement.offset_seconds, 10.0);
        assert_eq!(exchange.measurement.delay_seconds, 0.0);
        assert_eq!(exchange.measurement.server_time, 1_000_010.0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_server_survives_garbage() {
        let (port, handle) = start_server(Arc::new(OffsetClock::new(0.0))).await;

        let garbage = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        garbage.send_to(b"not ntp", ("127.0.0.1", port)).await.unwrap();

        let result = query("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(result.is_ok(), "query after garbage failed: {:?}", result.err());

        handle.abort();
    }

    #[test]
    fn test_blocking_timeout() {
        let result = tokio_test::block_on(async {
            let peer = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
            let port = peer.local_addr().unwrap().port();
            query("127.0.0.1", port, Duration::from_millis(100)).await
        });
        assert!(matches!(result, Err(Error::TimedOut(_))));
    }
}
