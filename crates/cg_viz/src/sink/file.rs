//! 文件下游：每次 flush 追加一行，空帧写 `{}`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use cg_core::{CographError, Result};

use super::Sink;
use crate::event::EventBuffer;

pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    buffer: EventBuffer,
}

impl FileSink {
    /// 创建 (截断) 输出文件；打不开即视为致命错误
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|e| {
            CographError::Sink(format!("could not open output file {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "writing stream events to file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            buffer: EventBuffer::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.buffer
    }

    async fn flush(&mut self) -> Result<()> {
        let mut payload = self.buffer.take_payload()?;
        if payload.is_empty() {
            payload.push_str("{}");
        }
        payload.push('\n');
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Attributes;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_writes_one_line_per_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.json");
        let mut sink = FileSink::create(&path).await.unwrap();

        sink.set_attributes(Attributes::new().with("label", "a"));
        sink.add_node("a");
        assert_ok!(sink.flush().await);
        assert_ok!(sink.flush().await);

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "{\"an\":{\"a\":{\"label\":\"a\"}}}\r\n{}\n");
    }

    #[tokio::test]
    async fn test_unwritable_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frames.json");
        let err = assert_err!(FileSink::create(&path).await.map(|_| ()));
        assert!(matches!(err, CographError::Sink(_)));
    }
}
