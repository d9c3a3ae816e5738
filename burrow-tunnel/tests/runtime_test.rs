use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use burrow_tunnel::{drive_handshake, EventKind, ProxyState, ProxyType, Session, TokioTransport};

#[tokio::test]
async fn completes_socks5_handshake_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut method = [0u8; 3];
        stream.read_exact(&mut method).await.unwrap();
        assert_eq!(method, [0x05, 0x01, 0x00]);
        stream.write_all(&[0x05, 0x00]).await.unwrap();

        let mut request = [0u8; 18];
        stream.read_exact(&mut request).await.unwrap();
        assert_eq!(&request[..5], &[0x05, 0x01, 0x00, 0x03, 11]);
        assert_eq!(&request[5..16], b"example.com");
        assert_eq!(&request[16..], &[0x01, 0xbb]);
        stream
            .write_all(&[0x05, 0x00, 0x00, 0x01, 127, 0, 0, 1, 0x1f, 0x90])
            .await
            .unwrap();
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut session, events, _logs) = Session::new(TokioTransport::new(stream));
    session
        .begin_handshake(ProxyType::Socks5, "example.com", 443, "", "")
        .unwrap();
    drive_handshake(&mut session).await.unwrap();

    assert_eq!(session.proxy_state(), ProxyState::Connected);
    let event = events.into_inner().try_recv().unwrap();
    assert_eq!(event.kind, EventKind::Connection);
    assert!(event.error.is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn http_connect_over_loopback_preserves_buffered_payload() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let count = stream.read(&mut chunk).await.unwrap();
            assert!(count > 0, "client closed before finishing the request");
            request.extend_from_slice(&chunk[..count]);
        }
        let request = String::from_utf8(request).unwrap();
        assert!(request.starts_with("CONNECT example.com:80 HTTP/1.1\r\n"));

        stream
            .write_all(b"HTTP/1.1 200 Connection established\r\n\r\nEXTRA")
            .await
            .unwrap();
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut session, events, _logs) = Session::new(TokioTransport::new(stream));
    session
        .begin_handshake(ProxyType::Http, "example.com", 80, "", "")
        .unwrap();
    drive_handshake(&mut session).await.unwrap();

    assert_eq!(session.proxy_state(), ProxyState::Connected);
    let event = events.into_inner().try_recv().unwrap();
    assert_eq!(event.kind, EventKind::Connection);
    assert!(event.error.is_none());

    // tunneled bytes that followed the reply stay with the transport
    let transport = session.detach().unwrap();
    let (mut stream, mut leftover) = transport.into_parts();
    while leftover.len() < 5 {
        let mut chunk = [0u8; 64];
        let count = stream.read(&mut chunk).await.unwrap();
        assert!(count > 0, "server closed before sending the payload");
        leftover.extend_from_slice(&chunk[..count]);
    }
    assert_eq!(leftover, b"EXTRA");

    server.await.unwrap();
}
