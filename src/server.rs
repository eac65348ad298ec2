//! Newline-delimited JSON over TCP.
//!
//! Each client connection is served by its own task: read a line, parse a
//! [`Request`], dispatch it, write back one line of JSON. A line that does
//! not parse gets an error response without dropping the connection; a line
//! over the size cap gets an error response and the connection is closed,
//! since the rest of the oversized line cannot be resynchronized.

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use curio_core::config::ServerConfig;
use curio_core::protocol::{Request, Response};
use curio_service::Dispatcher;

/// Upper bound on one request line. The largest legitimate request is a
/// `create`/`update` body, far below this.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Accepts connections until ctrl-c, then stops taking new ones. In-flight
/// connections finish on their own tasks.
pub async fn run(config: &ServerConfig, dispatcher: Dispatcher) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "server listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let dispatcher = dispatcher.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_client(stream, peer, dispatcher).await {
                                debug!(%peer, error = %e, "client connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
) -> std::io::Result<()> {
    debug!(%peer, "client connected");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(1024);

    loop {
        match read_limited_line(&mut reader, &mut buf).await? {
            LineRead::Eof => break,
            LineRead::TooLong => {
                warn!(%peer, "request line exceeds {MAX_LINE_BYTES} bytes, closing connection");
                write_response(&mut writer, &Response::error("request line too long")).await?;
                break;
            }
            LineRead::Line => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Request>(line) {
                    Ok(request) => dispatcher.dispatch(request).await,
                    Err(e) => {
                        warn!(%peer, error = %e, "unparseable request line");
                        Response::error(format!("malformed request: {e}"))
                    }
                };
                write_response(&mut writer, &response).await?;
            }
        }
    }

    debug!(%peer, "client disconnected");
    Ok(())
}

enum LineRead {
    /// `buf` holds one line, newline stripped.
    Line,
    /// The line exceeded [`MAX_LINE_BYTES`] before its newline arrived.
    TooLong,
    Eof,
}

/// Reads one newline-terminated line into `buf` without ever buffering more
/// than the cap plus one byte.
async fn read_limited_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let n = reader
        .take((MAX_LINE_BYTES + 1) as u64)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(LineRead::Line);
    }
    // No newline: either EOF mid-line (fine) or the cap was hit.
    if buf.len() > MAX_LINE_BYTES {
        return Ok(LineRead::TooLong);
    }
    Ok(LineRead::Line)
}

async fn write_response<W>(writer: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_string(response)
        .unwrap_or_else(|_| r#"{"status":"error","message":"internal error"}"#.to_string());
    payload.push('\n');
    writer.write_all(payload.as_bytes()).await
}
