//! # cg_viz - cograph Visualisation
//!
//! 把有界图缓冲变成流式图事件：
//! - [`selector`]：Top-K 选择与过滤
//! - [`differ`]：与上一帧做有序归并，维护边 ID 表
//! - [`sink`]：文件 / HTTP / 内存下游
//! - [`overlay`]：时间戳与说明标签

pub mod differ;
pub mod event;
pub mod overlay;
pub mod selector;
pub mod sink;

pub use differ::{EdgeIdTable, FrameDiffer, FrameReport};
pub use event::{Attributes, EventBuffer, EventKind, GraphEvent};
pub use overlay::OverlayLabels;
pub use selector::{select, SelectedNode, Selection, SelectionStats, SelectorConfig};
pub use sink::{FileSink, HttpSink, HttpSinkConfig, MemorySink, Sink};
