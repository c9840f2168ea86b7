//! Newline-delimited JSON-RPC over a byte stream.

use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Serve requests read line by line from `reader`, writing one response line
/// per request. Lines that are not UTF-8 or not JSON get a parse error and
/// serving continues. Returns when the reader reaches end of input.
pub async fn serve<R, W>(server: &McpServer, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(request = %line, "Received message");
                match serde_json::from_str::<McpRequest>(line) {
                    Ok(request) => server.handle_request(request).await,
                    Err(e) => {
                        warn!(error = %e, "Unparseable message");
                        Some(parse_error(e.to_string()))
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Message is not valid UTF-8");
                Some(parse_error(e.to_string()))
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

fn parse_error(reason: String) -> McpResponse {
    McpResponse::error(
        RequestId::Null,
        McpError::parse_error().with_data(serde_json::Value::String(reason)),
    )
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(server: &McpServer) -> std::io::Result<()> {
    info!("MCP server ready, listening on stdio");
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
