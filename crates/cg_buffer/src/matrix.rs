//! 对称权重矩阵
//!
//! 对角线为实体得分，非对角线为两两共现权重。按行优先存放在一块连续内存中。

use cg_core::{CographError, Result, SlotId};

/// 权重矩阵存储
#[derive(Debug, Clone)]
pub struct MatrixStore {
    capacity: usize,
    cells: Vec<f64>,
}

impl MatrixStore {
    /// 创建 `capacity × capacity` 的零矩阵
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cells: vec![0.0; capacity * capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn offset(&self, a: SlotId, b: SlotId) -> Result<usize> {
        if a >= self.capacity || b >= self.capacity {
            return Err(CographError::SlotOutOfRange {
                a,
                b,
                capacity: self.capacity,
            });
        }
        Ok(a * self.capacity + b)
    }

    /// 读取单元格；越界是簿记错误，调试构建下直接断言，发布构建读作 0
    pub fn get(&self, a: SlotId, b: SlotId) -> f64 {
        debug_assert!(
            a < self.capacity && b < self.capacity,
            "slot pair ({}, {}) out of range for capacity {}",
            a,
            b,
            self.capacity
        );
        self.offset(a, b).map_or(0.0, |i| self.cells[i])
    }

    /// 实体得分
    pub fn score(&self, slot: SlotId) -> f64 {
        self.get(slot, slot)
    }

    /// 设置实体得分
    pub fn set_score(&mut self, slot: SlotId, score: f64) -> Result<()> {
        let i = self.offset(slot, slot)?;
        self.cells[i] = score;
        Ok(())
    }

    /// 累加实体得分，返回累加前的值
    pub fn add_score(&mut self, slot: SlotId, delta: f64) -> Result<f64> {
        let i = self.offset(slot, slot)?;
        let prev = self.cells[i];
        self.cells[i] += delta;
        Ok(prev)
    }

    /// 对称地累加一条边的权重
    pub fn add_edge(&mut self, a: SlotId, b: SlotId, delta: f64) -> Result<()> {
        let ab = self.offset(a, b)?;
        let ba = self.offset(b, a)?;
        if a == b {
            return Ok(());
        }
        self.cells[ab] += delta;
        self.cells[ba] += delta;
        Ok(())
    }

    /// 清零槽位所在行列 (对角线除外，调用方随即覆盖)
    pub fn clear_slot(&mut self, slot: SlotId) -> Result<()> {
        self.offset(slot, slot)?;
        let n = self.capacity;
        for j in 0..n {
            if j != slot {
                self.cells[slot * n + j] = 0.0;
                self.cells[j * n + slot] = 0.0;
            }
        }
        Ok(())
    }

    /// 所有非零单元格乘以 `factor`
    pub fn scale(&mut self, factor: f64) {
        for cell in self.cells.iter_mut().filter(|c| **c != 0.0) {
            *cell *= factor;
        }
    }

    /// 全部清零
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0.0);
    }

    /// 非对角线权重之和，每个无序对只计一次
    pub fn total_weight(&self) -> f64 {
        let n = self.capacity;
        let mut total = 0.0;
        for a in 0..n {
            for b in (a + 1)..n {
                total += self.cells[a * n + b];
            }
        }
        total
    }
}
