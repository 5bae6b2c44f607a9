//! 输入共现事件定义

use serde::{Deserialize, Serialize};

/// 流时间戳 (秒)
pub type Timestamp = i64;

/// 共现事件：同一时刻一起出现的一组实体 (例如一条推文中的话题标签)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrence {
    /// 事件时间戳
    pub timestamp: Timestamp,
    /// 实体名称 (保持首次出现顺序，已去重)
    pub names: Vec<String>,
    /// 事件权重
    pub weight: f64,
}

impl CoOccurrence {
    /// 创建新事件，权重默认为 1
    pub fn new<I, S>(timestamp: Timestamp, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            timestamp,
            names: unique,
            weight: 1.0,
        }
    }

    /// 设置权重
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// 组大小
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 有向链接数 m·(m-1)，用于统计
    pub fn link_count(&self) -> u64 {
        let m = self.names.len() as u64;
        m * m.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_deduplicates_preserving_order() {
        let ev = CoOccurrence::new(10, ["b", "a", "b", "c"]);
        assert_eq!(ev.names, vec!["b", "a", "c"]);
        assert_eq!(ev.weight, 1.0);
        assert_eq!(ev.link_count(), 6);
    }

    #[test]
    fn test_single_name_has_no_links() {
        let ev = CoOccurrence::new(0, ["solo"]).with_weight(2.5);
        assert_eq!(ev.link_count(), 0);
        assert_eq!(ev.weight, 2.5);
    }
}
