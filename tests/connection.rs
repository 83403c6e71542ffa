//! Exercises the connection handler over a real TCP socket: pipelining,
//! partial-frame buffering, and non-array top-level frames staying open.

use std::sync::Arc;
use std::time::Duration;

use embercache::commands::Engine;
use embercache::network::connection::handle_client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let engine = Arc::new(Engine::new());

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => return,
            };
            let engine = Arc::clone(&engine);
            tokio::spawn(handle_client(stream, engine));
        }
    });

    addr
}

async fn read_some(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = vec![0u8; 4096];
    tokio::time::timeout(Duration::from_secs(1), stream.read(&mut buf))
        .await
        .expect("read timed out")
        .map(|n| buf[..n].to_vec())
        .expect("read failed")
}

#[tokio::test]
async fn pipelined_set_and_get_arrive_as_two_replies() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let request = b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n*2\r\n$3\r\nGET\r\n$1\r\na\r\n";
    stream.write_all(request).await.unwrap();

    let response = read_some(&mut stream).await;
    assert_eq!(response, b"+OK\r\n$1\r\n1\r\n");
}

#[tokio::test]
async fn partial_frame_is_buffered_until_complete() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*1\r\n$4\r\nPI").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(b"NG\r\n").await.unwrap();

    let response = read_some(&mut stream).await;
    assert_eq!(response, b"+PONG\r\n");
}

#[tokio::test]
async fn non_array_top_level_frame_replies_inline_and_stays_open() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"+PING\r\n*1\r\n$4\r\nPING\r\n").await.unwrap();

    let response = read_some(&mut stream).await;
    assert_eq!(response, b"-ERR expected array\r\n+PONG\r\n");
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"&nope\r\n").await.unwrap();

    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(Duration::from_secs(1), stream.read(&mut buf))
        .await
        .expect("read timed out")
        .unwrap();
    assert_eq!(n, 0, "expected EOF after a malformed frame");
}
