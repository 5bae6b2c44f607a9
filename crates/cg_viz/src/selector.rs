//! Top-K 选择器
//!
//! 从缓冲中挑出得分最高的 K 个实体，过滤孤立节点与排除项，
//! 最后按名称排序，作为帧差分的合并键。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use cg_buffer::GraphBuffer;
use cg_core::SlotId;

/// 选择参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// 每帧最多可视化的实体数 K
    pub max_visualized: usize,
    /// 边权重超过此值才计入度数与输出
    pub edge_min_weight: f64,
    /// 永不输出的实体 (通常是检索关键词本身)
    pub excluded: Option<String>,
    /// 丢弃在 Top-K 内没有任何边的实体
    pub hide_singletons: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_visualized: 100,
            edge_min_weight: 0.5,
            excluded: None,
            hide_singletons: true,
        }
    }
}

/// 被选中的实体
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedNode {
    pub name: String,
    pub slot: SlotId,
    pub score: f64,
}

/// 选择统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionStats {
    pub nodes_visualized: usize,
    /// 驻留但未被可视化的实体数
    pub nodes_not_visualized: usize,
    /// 可视化实体两两之间的权重和，每个无序对计一次
    pub total_score: f64,
}

/// 一次选择的结果，节点按名称升序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub nodes: Vec<SelectedNode>,
    pub stats: SelectionStats,
}

/// 执行选择
pub fn select(buffer: &GraphBuffer, config: &SelectorConfig) -> Selection {
    let mut ranked: Vec<SelectedNode> = buffer
        .entities()
        .map(|(slot, name, score)| SelectedNode {
            name: name.to_string(),
            slot,
            score,
        })
        .collect();

    // 得分降序，并列时槽位小者优先
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.slot.cmp(&b.slot))
    });
    ranked.truncate(config.max_visualized);

    // 度数在整个 Top-K 内计算，排除项也算作邻居
    let degrees: Vec<usize> = ranked
        .iter()
        .map(|a| {
            ranked
                .iter()
                .filter(|b| b.slot != a.slot && buffer.weight(a.slot, b.slot) > config.edge_min_weight)
                .count()
        })
        .collect();

    let mut nodes: Vec<SelectedNode> = ranked
        .into_iter()
        .zip(degrees)
        .filter(|(node, degree)| {
            !(config.hide_singletons && *degree == 0)
                && config.excluded.as_deref() != Some(node.name.as_str())
        })
        .map(|(node, _)| node)
        .collect();
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut total_score = 0.0;
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            total_score += buffer.weight(a.slot, b.slot);
        }
    }

    let stats = SelectionStats {
        nodes_visualized: nodes.len(),
        nodes_not_visualized: buffer.node_count() - nodes.len(),
        total_score,
    };
    Selection { nodes, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_core::CoOccurrence;

    fn buffer_with(groups: &[&[&str]]) -> GraphBuffer {
        let mut buf = GraphBuffer::with_capacity(16).unwrap();
        for g in groups {
            buf.add_group(&CoOccurrence::new(0, g.iter().copied())).unwrap();
        }
        buf
    }

    fn names(selection: &Selection) -> Vec<&str> {
        selection.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_result_is_sorted_by_name() {
        let buf = buffer_with(&[&["zeta", "alpha", "mid"], &["zeta", "alpha"]]);
        let sel = select(&buf, &SelectorConfig::default());
        assert_eq!(names(&sel), vec!["alpha", "mid", "zeta"]);
        assert_eq!(sel.stats.nodes_visualized, 3);
        assert_eq!(sel.stats.nodes_not_visualized, 0);
        // alpha-zeta 2 + alpha-mid 1 + mid-zeta 1
        assert_eq!(sel.stats.total_score, 4.0);
    }

    #[test]
    fn test_equal_disconnected_nodes_hidden_with_k_one() {
        let buf = buffer_with(&[&["a"], &["b"]]);
        let sel = select(
            &buf,
            &SelectorConfig {
                max_visualized: 1,
                edge_min_weight: 0.0,
                ..Default::default()
            },
        );
        assert!(sel.nodes.is_empty());
        assert_eq!(sel.stats.nodes_not_visualized, 2);
    }

    #[test]
    fn test_top_k_cuts_weakest() {
        let buf = buffer_with(&[&["a", "b"], &["a", "b"], &["a", "c"]]);
        let sel = select(
            &buf,
            &SelectorConfig {
                max_visualized: 2,
                ..Default::default()
            },
        );
        assert_eq!(names(&sel), vec!["a", "b"]);
    }

    #[test]
    fn test_excluded_name_still_counts_as_neighbour() {
        let buf = buffer_with(&[&["keyword", "x"], &["keyword", "y"]]);
        let sel = select(
            &buf,
            &SelectorConfig {
                excluded: Some("keyword".into()),
                ..Default::default()
            },
        );
        assert_eq!(names(&sel), vec!["x", "y"]);
    }

    #[test]
    fn test_singletons_kept_when_not_hidden() {
        let buf = buffer_with(&[&["solo"], &["a", "b"]]);
        let sel = select(
            &buf,
            &SelectorConfig {
                hide_singletons: false,
                ..Default::default()
            },
        );
        assert_eq!(names(&sel), vec!["a", "b", "solo"]);
    }
}
