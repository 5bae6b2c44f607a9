//! 滑动时间窗
//!
//! 不在矩阵上做增量更新，而是保留最近的带时间戳边日志，
//! 每帧按窗口 (硬截断或连续指数衰减) 从头重建矩阵。

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cg_core::{CoOccurrence, Result, Timestamp};

use crate::entity_table::EntityTable;
use crate::matrix::MatrixStore;

/// 时间窗配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingWindowConfig {
    /// 窗口长度 (流时间秒)
    pub window: Timestamp,
    /// 连续衰减常数；None 表示硬截断
    pub decay: Option<f64>,
    /// 日志最大条目数，超出时丢弃最旧条目
    pub max_log_entries: usize,
}

impl Default for RollingWindowConfig {
    fn default() -> Self {
        Self {
            window: 3600,
            decay: None,
            max_log_entries: 1_000_000,
        }
    }
}

/// 带时间戳的边
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEdge {
    pub a: String,
    pub b: String,
    /// 当前 (可能已衰减的) 权重
    pub weight: f64,
    pub original_weight: f64,
    pub timestamp: Timestamp,
}

/// 重建结果摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildSummary {
    /// 窗口内日志条目数
    pub log_entries: usize,
    /// 窗口内出现过的实体数
    pub candidates: usize,
    /// 写入矩阵的实体数
    pub retained: usize,
    /// 因超出日志上限而丢弃的条目数 (自上次重建起)
    pub pruned: usize,
    /// 本次重建是否发出了日志上限警告 (只在首次触及上限时发出)
    pub cap_warning: bool,
}

/// 边日志
#[derive(Debug, Clone)]
pub struct EdgeLog {
    config: RollingWindowConfig,
    entries: VecDeque<TimedEdge>,
    pruned: usize,
    cap_reached: bool,
}

impl EdgeLog {
    pub fn new(config: RollingWindowConfig) -> Self {
        Self {
            config,
            entries: VecDeque::new(),
            pruned: 0,
            cap_reached: false,
        }
    }

    pub fn config(&self) -> &RollingWindowConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 日志是否曾触及上限
    pub fn cap_reached(&self) -> bool {
        self.cap_reached
    }

    pub fn entries(&self) -> impl Iterator<Item = &TimedEdge> {
        self.entries.iter()
    }

    /// 最新条目的时间戳
    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.entries.back().map(|e| e.timestamp)
    }

    /// 记录一个共现组的所有无序对
    pub fn push_group(&mut self, group: &CoOccurrence) {
        for (i, a) in group.names.iter().enumerate() {
            for b in &group.names[i + 1..] {
                self.entries.push_back(TimedEdge {
                    a: a.clone(),
                    b: b.clone(),
                    weight: group.weight,
                    original_weight: group.weight,
                    timestamp: group.timestamp,
                });
            }
        }
        while self.entries.len() > self.config.max_log_entries {
            self.entries.pop_front();
            self.pruned += 1;
        }
    }

    /// 以 `now` 为基准应用窗口
    pub fn apply_window(&mut self, now: Timestamp) {
        let window = self.config.window;
        match self.config.decay {
            None => {
                while self
                    .entries
                    .front()
                    .map_or(false, |e| now - e.timestamp > window)
                {
                    self.entries.pop_front();
                }
            }
            Some(decay) => {
                let span = window.max(1) as f64;
                for e in self.entries.iter_mut() {
                    let age = (now - e.timestamp) as f64 - window as f64 / 2.0;
                    e.weight = e.original_weight * decay.powf(age / span);
                }
            }
        }
    }

    /// 各实体的关联强度，附带首次出现顺序
    pub fn strengths(&self) -> Vec<(&str, f64)> {
        let mut order: Vec<(&str, f64)> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        for e in &self.entries {
            for name in [e.a.as_str(), e.b.as_str()] {
                let idx = *position.entry(name).or_insert_with(|| {
                    order.push((name, 0.0));
                    order.len() - 1
                });
                order[idx].1 += e.weight;
            }
        }
        order
    }

    /// 从日志重建实体表和矩阵
    pub fn rebuild(
        &mut self,
        table: &mut EntityTable,
        matrix: &mut MatrixStore,
    ) -> Result<RebuildSummary> {
        table.clear();
        matrix.clear();

        let pruned = std::mem::take(&mut self.pruned);
        let cap_warning = pruned > 0 && !self.cap_reached;
        if cap_warning {
            self.cap_reached = true;
            warn!(
                pruned,
                max = self.config.max_log_entries,
                "edge log exceeded its maximum size, oldest entries pruned"
            );
        } else if pruned > 0 {
            debug!(pruned, "edge log pruned");
        }

        let Some(now) = self.latest_timestamp() else {
            return Ok(RebuildSummary {
                pruned,
                cap_warning,
                ..Default::default()
            });
        };
        self.apply_window(now);

        let strengths = self.strengths();
        let capacity = table.capacity();

        // 按强度降序挑选前 capacity 个；稳定排序保证并列时按出现顺序
        let mut ranked: Vec<usize> = (0..strengths.len()).collect();
        ranked.sort_by(|&x, &y| {
            strengths[y]
                .1
                .partial_cmp(&strengths[x].1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut keep = vec![false; strengths.len()];
        for &idx in ranked.iter().take(capacity) {
            keep[idx] = true;
        }

        // 槽位按出现顺序分配
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for (idx, &(name, strength)) in strengths.iter().enumerate() {
            if keep[idx] {
                let handle = table.allocate(name)?;
                matrix.set_score(handle.slot, strength)?;
                slots.insert(name, handle.slot);
            }
        }

        for e in &self.entries {
            if let (Some(&a), Some(&b)) = (slots.get(e.a.as_str()), slots.get(e.b.as_str())) {
                matrix.add_edge(a, b, e.weight)?;
            }
        }

        let summary = RebuildSummary {
            log_entries: self.entries.len(),
            candidates: strengths.len(),
            retained: slots.len(),
            pruned,
            cap_warning,
        };
        debug!(now, ?summary, "rolling window rebuilt");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(ts: Timestamp, names: &[&str]) -> CoOccurrence {
        CoOccurrence::new(ts, names.iter().copied())
    }

    #[test]
    fn test_push_group_logs_all_pairs() {
        let mut log = EdgeLog::new(RollingWindowConfig::default());
        log.push_group(&group(1, &["a", "b", "c"]));
        assert_eq!(log.len(), 3);
        log.push_group(&group(2, &["solo"]));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_hard_cutoff_drops_old_edges() {
        let mut log = EdgeLog::new(RollingWindowConfig {
            window: 10,
            ..Default::default()
        });
        log.push_group(&group(0, &["a", "b"]));
        log.push_group(&group(5, &["b", "c"]));
        log.push_group(&group(12, &["c", "d"]));
        log.apply_window(12);
        let kept: Vec<Timestamp> = log.entries().map(|e| e.timestamp).collect();
        assert_eq!(kept, vec![5, 12]);
    }

    #[test]
    fn test_continuous_decay_rescales_weights() {
        let mut log = EdgeLog::new(RollingWindowConfig {
            window: 10,
            decay: Some(0.5),
            ..Default::default()
        });
        log.push_group(&group(0, &["a", "b"]).with_weight(4.0));
        log.push_group(&group(15, &["a", "c"]).with_weight(4.0));
        log.apply_window(15);

        let weights: Vec<f64> = log.entries().map(|e| e.weight).collect();
        // 年龄 15 → 指数 (15-5)/10 = 1 → 4·0.5
        assert!((weights[0] - 2.0).abs() < 1e-9);
        // 年龄 0 → 指数 -0.5 → 4·0.5^-0.5
        assert!((weights[1] - 4.0 * 0.5f64.powf(-0.5)).abs() < 1e-9);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_log_is_capped() {
        let mut log = EdgeLog::new(RollingWindowConfig {
            max_log_entries: 2,
            ..Default::default()
        });
        log.push_group(&group(1, &["a", "b", "c"]));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().next().map(|e| e.b.as_str()), Some("c"));
    }

    #[test]
    fn test_cap_warning_only_on_first_prune() {
        let mut log = EdgeLog::new(RollingWindowConfig {
            max_log_entries: 2,
            ..Default::default()
        });
        let mut table = EntityTable::new(4);
        let mut matrix = MatrixStore::new(4);

        log.push_group(&group(1, &["a", "b"]));
        let summary = log.rebuild(&mut table, &mut matrix).unwrap();
        assert_eq!(summary.pruned, 0);
        assert!(!summary.cap_warning);
        assert!(!log.cap_reached());

        log.push_group(&group(2, &["a", "b", "c"]));
        let summary = log.rebuild(&mut table, &mut matrix).unwrap();
        assert_eq!(summary.pruned, 2);
        assert!(summary.cap_warning);
        assert!(log.cap_reached());

        // 日志持续处于上限，后续裁剪不再警告
        for ts in 3..6 {
            log.push_group(&group(ts, &["c", "d"]));
            let summary = log.rebuild(&mut table, &mut matrix).unwrap();
            assert_eq!(summary.pruned, 1);
            assert!(!summary.cap_warning);
        }
    }

    #[test]
    fn test_rebuild_keeps_strongest_in_encounter_order() {
        let mut log = EdgeLog::new(RollingWindowConfig {
            window: 100,
            ..Default::default()
        });
        log.push_group(&group(1, &["x", "y"]));
        log.push_group(&group(2, &["y", "z"]));
        log.push_group(&group(3, &["z", "y"]));

        let mut table = EntityTable::new(2);
        let mut matrix = MatrixStore::new(2);
        let summary = log.rebuild(&mut table, &mut matrix).unwrap();

        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.retained, 2);
        // y=3, z=2, x=1 → 保留 y、z，按首次出现顺序 y 在前
        assert_eq!(table.name(0), Some("y"));
        assert_eq!(table.name(1), Some("z"));
        assert_eq!(matrix.score(0), 3.0);
        assert_eq!(matrix.get(0, 1), 2.0);
    }
}
