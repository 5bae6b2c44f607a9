//! # cg_buffer - cograph Graph Buffer
//!
//! 有界图缓冲：实体表、对称权重矩阵、最弱集合淘汰、均匀遗忘与滑动时间窗。
//! 无论输入流多长，驻留实体数永远不超过 `capacity`。

pub mod buffer;
pub mod entity_table;
pub mod increment;
pub mod matrix;
pub mod weak_set;
pub mod window;

pub use buffer::{BufferConfig, BufferStats, DecayPolicy, GraphBuffer};
pub use entity_table::EntityTable;
pub use increment::{IncrementPolicy, Increments};
pub use matrix::MatrixStore;
pub use weak_set::WeakSet;
pub use window::{EdgeLog, RollingWindowConfig, TimedEdge};

pub use cg_core::{CographError, Result};
