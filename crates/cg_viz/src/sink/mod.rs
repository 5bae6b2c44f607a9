//! 事件下游 (Sink)
//!
//! 所有下游共享同一个契约：增/改/删事件先进入 [`EventBuffer`]，
//! `flush` 把整帧作为一个原子单元交付并清空缓冲。

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileSink;
pub use http::{HttpSink, HttpSinkConfig};
pub use memory::MemorySink;

use async_trait::async_trait;

use cg_core::Result;

use crate::event::{Attributes, EventBuffer, EventKind};

/// 事件下游
#[async_trait]
pub trait Sink: Send {
    /// 当前帧的事件缓冲
    fn buffer(&self) -> &EventBuffer;

    fn buffer_mut(&mut self) -> &mut EventBuffer;

    /// 交付缓冲中的全部事件
    async fn flush(&mut self) -> Result<()>;

    /// 是否为远程下游 (决定播放是否需要按真实时间节流)
    fn is_remote(&self) -> bool {
        false
    }

    /// 设置后续事件携带的属性
    fn set_attributes(&mut self, attributes: Attributes) {
        self.buffer_mut().set_attributes(attributes);
    }

    fn add_node(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::AddNode, id);
    }

    fn change_node(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::ChangeNode, id);
    }

    fn delete_node(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::DeleteNode, id);
    }

    fn add_edge(&mut self, id: u64) {
        self.buffer_mut().emit(EventKind::AddEdge, id);
    }

    fn change_edge(&mut self, id: u64) {
        self.buffer_mut().emit(EventKind::ChangeEdge, id);
    }

    fn delete_edge(&mut self, id: u64) {
        self.buffer_mut().emit(EventKind::DeleteEdge, id);
    }

    fn add_label(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::AddLabel, id);
    }

    fn change_label(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::ChangeLabel, id);
    }

    fn delete_label(&mut self, id: &str) {
        self.buffer_mut().emit(EventKind::DeleteLabel, id);
    }
}
