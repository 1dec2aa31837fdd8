//! Per-Connection Loop
//!
//! One task per accepted connection. The loop is strictly sequential
//! inside a connection: read one frame, dispatch it, write the response,
//! repeat. The [`FrameReader`] owns the read half and its buffer; the
//! [`RequestContext`](crate::connection::RequestContext) owns the write
//! half. Responses therefore come back in request order.
//!
//! A non-array top-level request is a client mistake, not a protocol
//! breakdown: it draws an error reply and the loop continues. Reader
//! errors - disconnect, EOF mid-frame, an unparseable stream - are
//! terminal; there is no way to find the next frame boundary once one is
//! lost.

use crate::commands::dispatch;
use crate::connection::RequestContext;
use crate::protocol::{FrameError, FrameReader, RespValue};
use crate::storage::{ConfigStore, Keyspace};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Runs one client connection to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: Arc<Keyspace>,
    config: Arc<ConfigStore>,
) {
    info!(client = %addr, "client connected");

    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut ctx = RequestContext::new(write_half, store, config);

    loop {
        match reader.read_frame().await {
            Ok(RespValue::Array(request)) => {
                if let Err(e) = dispatch(&mut ctx, &request).await {
                    debug!(client = %addr, error = %e, "write failed, closing");
                    break;
                }
            }
            Ok(_) => {
                let sent = ctx
                    .send_error("ERR request should be an array of bulk strings")
                    .await;
                if sent.is_err() {
                    break;
                }
            }
            Err(FrameError::Disconnected) => {
                debug!(client = %addr, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(client = %addr, error = %e, "connection error");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn start_server() -> (SocketAddr, Arc<Keyspace>, Arc<ConfigStore>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Keyspace::new());
        let config = Arc::new(ConfigStore::new());

        let accept_store = Arc::clone(&store);
        let accept_config = Arc::clone(&config);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    Arc::clone(&accept_store),
                    Arc::clone(&accept_config),
                ));
            }
        });

        (addr, store, config)
    }

    async fn read_exactly(client: &mut TcpStream, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        client.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn echo_returns_the_message() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 11).await, b"$5\r\nhello\r\n");
    }

    #[tokio::test]
    async fn set_then_get_round_trip() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"+OK\r\n");

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 9).await, b"$3\r\nbar\r\n");
    }

    #[tokio::test]
    async fn get_missing_key_is_null_bulk_string() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nnope\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn set_with_px_expires() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*5\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n$2\r\nPX\r\n$3\r\n100\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"+OK\r\n");

        tokio::time::sleep(Duration::from_millis(200)).await;

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn config_get_reports_seeded_value() {
        let (addr, _, config) = start_server().await;
        config.set("dir", "/tmp/x");

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$3\r\ndir\r\n")
            .await
            .unwrap();
        assert_eq!(
            read_exactly(&mut client, 25).await,
            b"*2\r\n$3\r\ndir\r\n$6\r\n/tmp/x\r\n"
        );
    }

    #[tokio::test]
    async fn keys_star_lists_live_keys() {
        let (addr, store, _) = start_server().await;
        store.set(
            Bytes::from("only"),
            RespValue::bulk_string(Bytes::from("v")),
        );

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"*2\r\n$4\r\nKEYS\r\n$1\r\n*\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 14).await, b"*1\r\n$4\r\nonly\r\n");
    }

    #[tokio::test]
    async fn one_octet_at_a_time_still_frames_correctly() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let request =
            b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
        for byte in request {
            client.write_all(&[*byte]).await.unwrap();
            client.flush().await.unwrap();
        }

        assert_eq!(read_exactly(&mut client, 14).await, b"+OK\r\n$3\r\nbar\r\n");
    }

    #[tokio::test]
    async fn non_array_request_keeps_connection_open() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"+HELLO\r\n").await.unwrap();
        let reply = read_exactly(&mut client, 49).await;
        assert_eq!(reply, b"-ERR request should be an array of bulk strings\r\n");

        // The same connection still serves commands.
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn unknown_command_keeps_connection_open() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*1\r\n$5\r\nHELLO\r\n")
            .await
            .unwrap();
        let mut first = [0u8; 1];
        client.read_exact(&mut first).await.unwrap();
        assert_eq!(&first, b"-");

        // Drain the rest of the error line.
        let mut rest = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            client.read_exact(&mut byte).await.unwrap();
            rest.push(byte[0]);
            if rest.ends_with(b"\r\n") {
                break;
            }
        }

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn commands_match_case_insensitively() {
        let (addr, _, _) = start_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nping\r\n").await.unwrap();
        assert_eq!(read_exactly(&mut client, 7).await, b"+PONG\r\n");

        client
            .write_all(b"*3\r\n$3\r\nsEt\r\n$1\r\na\r\n$1\r\nb\r\n")
            .await
            .unwrap();
        assert_eq!(read_exactly(&mut client, 5).await, b"+OK\r\n");
    }
}
