//! Integration tests for the WebSocket transport.
//!
//! Each test binds a real listener on an OS-assigned port and talks to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::net::SocketAddr;

    use futures_util::{SinkExt, StreamExt};
    use quizwire_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport, connects one client and returns both ends.
    async fn connected_pair() -> (WebSocketConnection, Client, SocketAddr) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have an address");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client, addr)
    }

    #[tokio::test]
    async fn test_send_arrives_as_text_frame() {
        let (conn, mut client, _) = connected_pair().await;
        assert!(conn.id().as_str().starts_with("conn-"));

        conn.send(br#"{"event":"all_ready"}"#)
            .await
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"all_ready"}"#);
    }

    #[tokio::test]
    async fn test_recv_accepts_text_and_binary() {
        let (conn, mut client, _) = connected_pair().await;

        client.send(Message::text("first".to_string())).await.unwrap();
        client
            .send(Message::Binary(b"second".to_vec().into()))
            .await
            .unwrap();

        assert_eq!(conn.recv().await.unwrap().unwrap(), b"first");
        assert_eq!(conn.recv().await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_recv_skips_ping() {
        let (conn, mut client, _) = connected_pair().await;

        client.send(Message::Ping(Vec::new().into())).await.unwrap();
        client.send(Message::text("after ping".to_string())).await.unwrap();

        assert_eq!(conn.recv().await.unwrap().unwrap(), b"after ping");
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (conn, mut client, _) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_send_while_recv_pending() {
        let (conn, mut client, _) = connected_pair().await;
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        conn.send(b"pushed").await.expect("send should not block on recv");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"pushed");

        client.send(Message::text("reply".to_string())).await.unwrap();
        let received = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"reply");
    }

    #[tokio::test]
    async fn test_peer_addr_is_loopback() {
        let (conn, _client, addr) = connected_pair().await;
        assert!(conn.peer_addr().ip().is_loopback());
        assert_ne!(conn.peer_addr().port(), addr.port());
    }

    #[tokio::test]
    async fn test_bind_failure_reports_address() {
        let err = WebSocketTransport::bind("not-an-address")
            .await
            .err()
            .expect("bind should fail");
        assert!(err.to_string().contains("not-an-address"));
    }
}
