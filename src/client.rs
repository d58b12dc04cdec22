//! Terminal client. The user's terminal stands in for a drawing surface: it
//! produces raw command lines and consumes raw server lines, and this module
//! only shuttles between the two.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::ClientArgs;

/// Forwards `input` lines to the server and server lines to `output` until the
/// server closes the connection.
pub async fn relay<R, W>(stream: TcpStream, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (reader, mut writer) = stream.into_split();
    let mut from_server = BufReader::new(reader).lines();
    let mut from_user = input.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = from_server.next_line() => match line? {
                Some(line) => {
                    output.write_all(line.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
                None => break,
            },

            line = from_user.next_line(), if input_open => match line? {
                Some(line) => {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
                None => {
                    debug!("input closed, waiting for server to hang up");
                    input_open = false;
                    writer.shutdown().await?;
                }
            },
        }
    }

    Ok(())
}

pub async fn run(args: &ClientArgs) -> Result<()> {
    let addr = args.server_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;

    relay(stream, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
