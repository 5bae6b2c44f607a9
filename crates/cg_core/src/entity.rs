//! 槽位句柄定义

use serde::{Deserialize, Serialize};

/// 槽位索引类型别名 (矩阵中的稠密下标)
pub type SlotId = usize;

/// 稳定槽位句柄
///
/// 槽位被淘汰后会被复用；`generation` 在每次重新分配时递增，
/// 持有旧句柄的一方可以据此识别槽位已换了主人。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotHandle {
    /// 槽位下标
    pub slot: SlotId,
    /// 分配代数
    pub generation: u64,
}

impl SlotHandle {
    /// 创建新句柄
    pub fn new(slot: SlotId, generation: u64) -> Self {
        Self { slot, generation }
    }
}
