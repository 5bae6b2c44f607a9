//! 内存下游，保存每次 flush 的事件，供测试与嵌入式调用方检查

use async_trait::async_trait;

use cg_core::Result;

use super::Sink;
use crate::event::{EventBuffer, GraphEvent};

#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: EventBuffer,
    frames: Vec<Vec<GraphEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已交付的全部帧
    pub fn frames(&self) -> &[Vec<GraphEvent>] {
        &self.frames
    }

    /// 最近交付的一帧
    pub fn last_frame(&self) -> Option<&[GraphEvent]> {
        self.frames.last().map(|f| f.as_slice())
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.buffer
    }

    async fn flush(&mut self) -> Result<()> {
        let events = self.buffer.drain();
        self.frames.push(events);
        Ok(())
    }
}
