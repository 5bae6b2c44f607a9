//! 有界图缓冲
//!
//! 把实体表、权重矩阵、最弱集合和衰减策略组合成一个缓冲实例。
//! 每帧的数据流：`add_group` × N → `end_frame` → 选择器读取。

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use cg_core::{CoOccurrence, CographError, Result, SlotHandle, SlotId};

use crate::entity_table::EntityTable;
use crate::increment::IncrementPolicy;
use crate::matrix::MatrixStore;
use crate::weak_set::WeakSet;
use crate::window::{EdgeLog, RollingWindowConfig};

/// 衰减策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayPolicy {
    /// 每 `every` 帧把整个矩阵乘以 `factor`
    UniformForgetting { factor: f64, every: u64 },
    /// 按时间窗从边日志重建
    RollingWindow(RollingWindowConfig),
}

impl Default for DecayPolicy {
    fn default() -> Self {
        DecayPolicy::UniformForgetting {
            factor: 0.99,
            every: 10,
        }
    }
}

/// 缓冲配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// 最多驻留的实体数
    pub capacity: usize,
    /// 增量策略
    pub increment: IncrementPolicy,
    /// 衰减策略
    pub decay: DecayPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 2000,
            increment: IncrementPolicy::default(),
            decay: DecayPolicy::default(),
        }
    }
}

impl BufferConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CographError::Config("capacity must be positive".into()));
        }
        match &self.decay {
            DecayPolicy::UniformForgetting { factor, .. } if !(*factor > 0.0 && *factor <= 1.0) => {
                Err(CographError::Config(format!(
                    "forgetting factor {} must lie in (0, 1]",
                    factor
                )))
            }
            DecayPolicy::RollingWindow(w) if w.window <= 0 || w.max_log_entries == 0 => {
                Err(CographError::Config(
                    "rolling window needs a positive window and log size".into(),
                ))
            }
            DecayPolicy::RollingWindow(RollingWindowConfig { decay: Some(c), .. })
                if !(*c > 0.0) =>
            {
                Err(CographError::Config(format!(
                    "decay constant {} must be positive",
                    c
                )))
            }
            _ => Ok(()),
        }
    }
}

/// 缓冲统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub nodes: usize,
    pub min_score: f64,
    pub weak_len: usize,
    /// 非对角线权重之和，每个无序对只计一次
    pub total_score: f64,
    pub log_entries: usize,
    pub frames: u64,
}

/// 有界图缓冲
#[derive(Debug, Clone)]
pub struct GraphBuffer {
    config: BufferConfig,
    table: EntityTable,
    matrix: MatrixStore,
    weak: WeakSet,
    /// 仅时间窗策略使用
    log: Option<EdgeLog>,
    frames: u64,
}

impl GraphBuffer {
    /// 创建新缓冲
    pub fn new(config: BufferConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let log = match &config.decay {
            DecayPolicy::RollingWindow(w) => Some(EdgeLog::new(w.clone())),
            DecayPolicy::UniformForgetting { .. } => None,
        };
        Ok(Self {
            config,
            table: EntityTable::new(capacity),
            matrix: MatrixStore::new(capacity),
            weak: WeakSet::new(capacity),
            log,
            frames: 0,
        })
    }

    /// 以默认策略创建指定容量的缓冲
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(BufferConfig {
            capacity,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// 驻留实体数
    pub fn node_count(&self) -> usize {
        self.table.len()
    }

    /// 已处理的帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 摄入一个共现组
    pub fn add_group(&mut self, group: &CoOccurrence) -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        if let Some(log) = self.log.as_mut() {
            log.push_group(group);
            return Ok(());
        }
        self.ingest(group)
    }

    fn ingest(&mut self, group: &CoOccurrence) -> Result<()> {
        let inc = self
            .config
            .increment
            .increments(group.len(), group.weight);

        let mut pending: Vec<SlotHandle> = Vec::with_capacity(group.len());
        for name in &group.names {
            let handle = match self.table.find(name) {
                Some(handle) => {
                    self.bump(handle.slot, inc.node)?;
                    handle
                }
                None => self.admit(name, inc.node)?,
            };
            pending.push(handle);
        }

        // 同一批次里较晚的实体可能淘汰了较早解析的槽位，旧句柄不再参与边更新
        pending.retain(|h| self.table.is_current(*h));

        if inc.edge != 0.0 {
            for (i, a) in pending.iter().enumerate() {
                for b in &pending[i + 1..] {
                    self.matrix.add_edge(a.slot, b.slot, inc.edge)?;
                }
            }
        }
        Ok(())
    }

    /// 已驻留实体得分增加
    fn bump(&mut self, slot: SlotId, delta: f64) -> Result<()> {
        let prev = self.matrix.add_score(slot, delta)?;
        let min = self.weak.min_score();
        // 增量为 0 (单元素组) 时得分不变，仍留在集合中
        if prev == min && self.matrix.score(slot) != min {
            self.weak.remove(slot);
            if self.weak.is_empty() {
                self.refill_weak();
            }
        }
        Ok(())
    }

    /// 新实体入驻；满员时淘汰最弱集合队首
    fn admit(&mut self, name: &str, score: f64) -> Result<SlotHandle> {
        if self.table.is_full() {
            let victim = match self.weak.pop_front() {
                Some(slot) => slot,
                None => {
                    self.refill_weak();
                    self.weak.pop_front().ok_or_else(|| {
                        CographError::Capacity("buffer full but no eviction candidate".into())
                    })?
                }
            };
            let evicted = self.table.evict(victim);
            self.matrix.clear_slot(victim)?;
            trace!(slot = victim, ?evicted, incoming = name, "evicted weakest entity");
        }

        let handle = self.table.allocate(name)?;
        self.matrix.set_score(handle.slot, score)?;
        self.weak.admit(handle.slot, score);
        if self.weak.is_empty() {
            self.refill_weak();
        }
        Ok(handle)
    }

    fn refill_weak(&mut self) {
        let Self {
            table,
            matrix,
            weak,
            ..
        } = self;
        weak.refill(table.occupied().map(|(slot, _)| (slot, matrix.score(slot))));
    }

    /// 帧结束：按策略执行遗忘或时间窗重建
    pub fn end_frame(&mut self) -> Result<()> {
        self.frames += 1;
        match self.config.decay {
            DecayPolicy::UniformForgetting { factor, every } => {
                if every > 0 && self.frames % every == 0 {
                    self.forget(factor);
                }
            }
            DecayPolicy::RollingWindow(_) => {
                if let Some(log) = self.log.as_mut() {
                    log.rebuild(&mut self.table, &mut self.matrix)?;
                }
                self.refill_weak();
            }
        }
        Ok(())
    }

    /// 均匀遗忘：所有非零单元格及最低分乘以 `factor`
    pub fn forget(&mut self, factor: f64) {
        self.matrix.scale(factor);
        // 重新扫描得到的最低分就是旧最低分 × factor，同时吸收浮点舍入造成的新并列
        self.refill_weak();
        debug!(factor, min_score = self.weak.min_score(), "forgetting applied");
    }

    /// 清空全部内容
    pub fn reset(&mut self) {
        self.table.clear();
        self.matrix.clear();
        self.weak.refill(std::iter::empty());
        if let Some(log) = self.log.as_mut() {
            *log = EdgeLog::new(log.config().clone());
        }
    }

    /// 按名称查找槽位
    pub fn find(&self, name: &str) -> Option<SlotId> {
        self.table.find(name).map(|h| h.slot)
    }

    pub fn name(&self, slot: SlotId) -> Option<&str> {
        self.table.name(slot)
    }

    pub fn score(&self, slot: SlotId) -> f64 {
        self.matrix.score(slot)
    }

    /// 两个槽位之间的共现权重
    pub fn weight(&self, a: SlotId, b: SlotId) -> f64 {
        self.matrix.get(a, b)
    }

    /// 按槽位顺序遍历驻留实体 (槽位, 名称, 得分)
    pub fn entities(&self) -> impl Iterator<Item = (SlotId, &str, f64)> + '_ {
        self.table
            .occupied()
            .map(move |(slot, name)| (slot, name, self.matrix.score(slot)))
    }

    pub fn min_score(&self) -> f64 {
        self.weak.min_score()
    }

    pub fn weak_len(&self) -> usize {
        self.weak.len()
    }

    /// 最弱集合成员 (FIFO 顺序)
    pub fn weak_members(&self) -> Vec<SlotId> {
        self.weak.members()
    }

    pub fn total_score(&self) -> f64 {
        self.matrix.total_weight()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            capacity: self.capacity(),
            nodes: self.node_count(),
            min_score: self.weak.min_score(),
            weak_len: self.weak_len(),
            total_score: self.total_score(),
            log_entries: self.log.as_ref().map_or(0, |l| l.len()),
            frames: self.frames,
        }
    }
}
