use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{Result, VortexError};
use crate::interfaces::transport::{BoxedWriter, LineSink};

/// Lazily yields one item per newline-terminated line until end of stream.
///
/// Blank lines are skipped. A read failure is yielded once and ends the stream.
pub fn read_lines<R>(reader: R) -> BoxStream<'static, Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| VortexError::Transport(e.to_string()))?;
            if read == 0 {
                break;
            }
            let line = trim_line_ending(&buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            yield line.to_vec();
        }
    })
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Serialises whole lines onto a shared output stream.
pub struct LineWriter {
    writer: Mutex<BoxedWriter>,
}

impl LineWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

#[async_trait]
impl LineSink for LineWriter {
    async fn write_line(&self, line: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line)
            .await
            .map_err(|e| VortexError::Transport(e.to_string()))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| VortexError::Transport(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| VortexError::Transport(e.to_string()))
    }
}
