//! # cg_core - cograph Core Primitives
//!
//! 核心原语层，定义输入共现事件、槽位句柄、全局错误处理机制。
//! 此 crate 是整个项目的基础依赖，不依赖其他业务 crate。

pub mod entity;
pub mod error;
pub mod event;

pub use entity::{SlotHandle, SlotId};
pub use error::{CographError, Result};
pub use event::{CoOccurrence, Timestamp};
