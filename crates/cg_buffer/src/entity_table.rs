//! 实体表
//!
//! 名称 -> 槽位的双向索引。槽位是权重矩阵的稠密下标，淘汰后复用。

use std::collections::HashMap;

use cg_core::{CographError, Result, SlotHandle, SlotId};

/// 实体表
#[derive(Debug, Clone)]
pub struct EntityTable {
    /// 槽位 -> 名称 (None 表示空槽位)
    names: Vec<Option<String>>,
    /// 名称索引
    index: HashMap<String, SlotId>,
    /// 每个槽位当前的分配代数
    generations: Vec<u64>,
    /// 被释放、等待复用的槽位
    free: Vec<SlotId>,
    /// 从未使用过的下一个槽位
    next_fresh: SlotId,
    /// 全局代数计数器
    next_generation: u64,
}

impl EntityTable {
    /// 创建容量为 `capacity` 的实体表
    pub fn new(capacity: usize) -> Self {
        Self {
            names: vec![None; capacity],
            index: HashMap::with_capacity(capacity),
            generations: vec![0; capacity],
            free: Vec::new(),
            next_fresh: 0,
            next_generation: 1,
        }
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.names.len()
    }

    /// 已占用槽位数
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 是否已满 (没有空槽位可分配)
    pub fn is_full(&self) -> bool {
        self.free.is_empty() && self.next_fresh >= self.capacity()
    }

    /// 按名称查找
    pub fn find(&self, name: &str) -> Option<SlotHandle> {
        self.index
            .get(name)
            .map(|&slot| SlotHandle::new(slot, self.generations[slot]))
    }

    /// 为新实体分配槽位；仅在没有空槽位时失败
    pub fn allocate(&mut self, name: &str) -> Result<SlotHandle> {
        if self.index.contains_key(name) {
            return Err(CographError::Capacity(format!(
                "entity '{}' is already resident",
                name
            )));
        }
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None if self.next_fresh < self.capacity() => {
                self.next_fresh += 1;
                self.next_fresh - 1
            }
            None => {
                return Err(CographError::Capacity(format!(
                    "no free slot for '{}' (capacity {})",
                    name,
                    self.capacity()
                )))
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations[slot] = generation;
        self.names[slot] = Some(name.to_string());
        self.index.insert(name.to_string(), slot);
        Ok(SlotHandle::new(slot, generation))
    }

    /// 淘汰槽位上的实体，返回其名称
    pub fn evict(&mut self, slot: SlotId) -> Option<String> {
        let name = self.names.get_mut(slot)?.take()?;
        self.index.remove(&name);
        self.free.push(slot);
        Some(name)
    }

    /// 槽位上的实体名称
    pub fn name(&self, slot: SlotId) -> Option<&str> {
        self.names.get(slot).and_then(|n| n.as_deref())
    }

    /// 句柄是否仍指向当初的实体
    pub fn is_current(&self, handle: SlotHandle) -> bool {
        self.names.get(handle.slot).map_or(false, |n| n.is_some())
            && self.generations[handle.slot] == handle.generation
    }

    /// 按槽位顺序遍历已占用槽位
    pub fn occupied(&self) -> impl Iterator<Item = (SlotId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(slot, name)| name.as_deref().map(|n| (slot, n)))
    }

    /// 清空 (代数计数器保留，旧句柄全部失效)
    pub fn clear(&mut self) {
        for name in self.names.iter_mut() {
            *name = None;
        }
        self.index.clear();
        self.free.clear();
        self.next_fresh = 0;
    }
}
