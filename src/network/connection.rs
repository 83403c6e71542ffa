use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, instrument, Instrument};
use uuid::Uuid;

use crate::commands::Engine;
use crate::network::resp::{parse, ParseError};
use crate::observability::metrics::{METRIC_ACTIVE_CONNECTIONS, METRIC_CONNECTIONS_TOTAL};

struct ConnectionGuard;

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        gauge!(METRIC_ACTIVE_CONNECTIONS).decrement(1.0);
    }
}

/// Drives one client connection: buffers bytes off the socket, parses every
/// complete RESP frame it can find, dispatches each to `engine`, and writes
/// back the responses in request order.
///
/// A frame that is merely incomplete leaves the remainder in `buffer` and
/// waits for more bytes. A malformed frame ends the connection — there is no
/// reliable resync point in a corrupted RESP stream.
#[instrument(skip(stream, engine), fields(connection_id = %Uuid::new_v4()))]
pub async fn handle_client(mut stream: TcpStream, engine: Arc<Engine>) {
    counter!(METRIC_CONNECTIONS_TOTAL).increment(1);
    gauge!(METRIC_ACTIVE_CONNECTIONS).increment(1.0);
    let _guard = ConnectionGuard;

    info!("new connection established");

    let mut buffer = Vec::new();
    let mut read_buf = [0u8; 4096];

    loop {
        let bytes_read = match stream.read(&mut read_buf).await {
            Ok(0) => {
                debug!("client closed the connection");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                error!("failed to read from socket: {e}");
                return;
            }
        };
        buffer.extend_from_slice(&read_buf[..bytes_read]);

        loop {
            match parse(&buffer) {
                Ok((request, consumed)) => {
                    buffer.drain(0..consumed);

                    let request_id = Uuid::new_v4();
                    let span = tracing::info_span!("request", %request_id);
                    let response = engine.dispatch(request).instrument(span).await;

                    if let Err(e) = stream.write_all(response.serialize().as_bytes()).await {
                        error!("failed to write response: {e}");
                        return;
                    }
                }
                Err(ParseError::Incomplete) => break,
                Err(ParseError::Malformed(reason)) => {
                    debug!("closing connection on malformed frame: {reason}");
                    return;
                }
            }
        }
    }
}
