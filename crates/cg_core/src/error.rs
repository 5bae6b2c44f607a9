//! 全局错误处理机制

use thiserror::Error;

/// cograph 统一错误类型
#[derive(Error, Debug)]
pub enum CographError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Capacity error: {0}")]
    Capacity(String),

    /// 槽位越界：簿记出错，属于程序错误
    #[error("Slot pair ({a}, {b}) out of range for capacity {capacity}")]
    SlotOutOfRange { a: usize, b: usize, capacity: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 统一 Result 类型别名
pub type Result<T> = std::result::Result<T, CographError>;
