//! Integration tests for the TCP and Unix listeners.
//!
//! These bind real sockets on the loopback interface / a temp directory
//! and push frames through them.

use std::os::unix::fs::PermissionsExt as _;
use std::path::PathBuf;

use hologram_protocol::{Message, PingKind, ServerRequest};
use hologram_transport::{
    Connection, TcpTransport, Transport, UnixTransport, connect_tcp, connect_unix,
};

fn temp_socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hologram-{}-{name}.sock", std::process::id()))
}

#[tokio::test]
async fn test_tcp_accept_and_exchange() {
    let mut transport = TcpTransport::bind("127.0.0.1:0").await.expect("bind");
    let addr = transport.local_addr().expect("addr").to_string();

    let server = tokio::spawn(async move {
        let mut conn = transport.accept().await.expect("accept");
        let msg = conn.recv().await.expect("recv");
        assert_eq!(msg, Message::Ping(PingKind::Request));
        conn.send(&Message::Ping(PingKind::Response)).await.expect("send");
    });

    let mut client = connect_tcp(&addr).await.expect("connect");
    client.send(&Message::Ping(PingKind::Request)).await.unwrap();
    assert_eq!(client.recv().await.unwrap(), Message::Ping(PingKind::Response));

    server.await.expect("server task");
}

#[tokio::test]
async fn test_unix_socket_is_world_writable() {
    let path = temp_socket_path("perm");
    let transport = UnixTransport::bind(&path).expect("bind");

    let mode = std::fs::metadata(transport.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o777);
}

#[tokio::test]
async fn test_unix_accept_and_exchange() {
    let path = temp_socket_path("exchange");
    let mut transport = UnixTransport::bind(&path).expect("bind");

    let server = tokio::spawn(async move {
        let mut conn = transport.accept().await.expect("accept");
        let msg = conn.recv().await.expect("recv");
        conn.send(&msg).await.expect("echo");
    });

    let request = Message::ServerRequest(ServerRequest::GetUserCredentials);
    let mut client = connect_unix(&path).await.expect("connect");
    client.send(&request).await.unwrap();
    assert_eq!(client.recv().await.unwrap(), request);

    server.await.expect("server task");
}

#[tokio::test]
async fn test_unix_bind_replaces_stale_socket_file() {
    let path = temp_socket_path("stale");
    std::fs::write(&path, b"leftover").unwrap();

    let transport = UnixTransport::bind(&path).expect("bind over stale file");
    drop(transport);
    assert!(!path.exists(), "socket removed on drop");
}
