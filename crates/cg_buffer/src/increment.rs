//! 增量策略
//!
//! 决定一个大小为 m 的共现组给节点得分和边权重分别加多少。

use serde::{Deserialize, Serialize};

/// 单次共现的节点/边增量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Increments {
    pub node: f64,
    pub edge: f64,
}

/// 增量策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementPolicy {
    /// 每个事件总质量为 2：边 2/(m(m-1))，节点 2/m
    Proportional,
    /// 每对一份：边 1/m，节点 1
    Unit,
    /// 平方根阻尼：边 2/(√(m-1)·√m)，节点 2/√m
    SqrtDamped,
    /// 外部权重：边 w，节点 w·(m-1)，节点得分等于其关联边权之和
    #[default]
    ExternalWeight,
}

impl IncrementPolicy {
    /// 计算增量；归一化策略同样按 `weight` 缩放
    pub fn increments(&self, group_size: usize, weight: f64) -> Increments {
        let m = group_size as f64;
        let (node, edge) = match self {
            IncrementPolicy::Proportional => (2.0 / m, 2.0 / ((m - 1.0) * m)),
            IncrementPolicy::Unit => (1.0, 1.0 / m),
            IncrementPolicy::SqrtDamped => (2.0 / m.sqrt(), 2.0 / ((m - 1.0).sqrt() * m.sqrt())),
            IncrementPolicy::ExternalWeight => (m - 1.0, 1.0),
        };
        // 单元素组没有边
        let edge = if group_size < 2 { 0.0 } else { edge };
        Increments {
            node: node * weight,
            edge: edge * weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_proportional_mass() {
        let inc = IncrementPolicy::Proportional.increments(4, 1.0);
        assert!(close(inc.node, 0.5));
        assert!(close(inc.edge, 2.0 / 12.0));
        // 4 个节点 × 0.5 = 2，12 条有向边 × 1/6 = 2
        assert!(close(inc.node * 4.0, inc.edge * 12.0));
    }

    #[test]
    fn test_unit_and_sqrt() {
        let unit = IncrementPolicy::Unit.increments(5, 1.0);
        assert!(close(unit.node, 1.0));
        assert!(close(unit.edge, 0.2));

        let sqrt = IncrementPolicy::SqrtDamped.increments(4, 1.0);
        assert!(close(sqrt.node, 1.0));
        assert!(close(sqrt.edge, 2.0 / (3f64.sqrt() * 2.0)));
    }

    #[test]
    fn test_external_weight_node_is_edge_sum() {
        let inc = IncrementPolicy::ExternalWeight.increments(3, 2.5);
        assert!(close(inc.edge, 2.5));
        assert!(close(inc.node, 5.0));
    }

    #[test]
    fn test_singleton_group_has_no_edge_share() {
        for policy in [
            IncrementPolicy::Proportional,
            IncrementPolicy::Unit,
            IncrementPolicy::SqrtDamped,
            IncrementPolicy::ExternalWeight,
        ] {
            let inc = policy.increments(1, 1.0);
            assert_eq!(inc.edge, 0.0);
            assert!(inc.node.is_finite());
        }
    }

    #[test]
    fn test_policy_serde_names() {
        let p: IncrementPolicy = serde_json::from_str("\"sqrt_damped\"").unwrap();
        assert_eq!(p, IncrementPolicy::SqrtDamped);
    }
}
