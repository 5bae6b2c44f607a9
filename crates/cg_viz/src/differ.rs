//! 帧差分
//!
//! 把当前 Top-K 选择与上一帧做有序归并，只向下游发送真实变化：
//! 先是节点的增删，再是所有可见节点的取值更新，最后是边的新增或更新。

use std::collections::HashSet;

use tracing::debug;

use cg_buffer::GraphBuffer;
use cg_core::{CographError, Result, SlotId};

use crate::event::Attributes;
use crate::selector::{select, SelectedNode, SelectionStats, SelectorConfig};
use crate::sink::Sink;

/// 边颜色
const EDGE_COLOUR: (f64, f64, f64) = (0.4, 0.6, 0.8);

/// 槽位对 → 边 ID，0 表示当前没有渲染这条边
#[derive(Debug, Clone)]
pub struct EdgeIdTable {
    capacity: usize,
    ids: Vec<u64>,
}

impl EdgeIdTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ids: vec![0; capacity * capacity],
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

    pub fn get(&self, a: SlotId, b: SlotId) -> Result<Option<u64>> {
        Ok(match self.ids[self.offset(a, b)?] {
            0 => None,
            id => Some(id),
        })
    }

    fn set(&mut self, a: SlotId, b: SlotId, id: u64) -> Result<()> {
        let ab = self.offset(a, b)?;
        let ba = self.offset(b, a)?;
        self.ids[ab] = id;
        self.ids[ba] = id;
        Ok(())
    }

    /// 清空槽位所在的行和列
    pub fn clear_slot(&mut self, slot: SlotId) -> Result<()> {
        self.offset(slot, slot)?;
        let n = self.capacity;
        for j in 0..n {
            self.ids[slot * n + j] = 0;
            self.ids[j * n + slot] = 0;
        }
        Ok(())
    }
}

/// 单帧差分报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub nodes_added: usize,
    pub nodes_deleted: usize,
    pub nodes_changed: usize,
    pub edges_added: usize,
    pub edges_changed: usize,
    pub edges_deleted: usize,
    pub selection: SelectionStats,
}

/// 帧差分器
#[derive(Debug, Clone)]
pub struct FrameDiffer {
    config: SelectorConfig,
    previous: Vec<SelectedNode>,
    edge_ids: EdgeIdTable,
    next_edge_id: u64,
    drawn: HashSet<String>,
}

impl FrameDiffer {
    pub fn new(config: SelectorConfig, capacity: usize) -> Self {
        Self {
            config,
            previous: Vec::new(),
            edge_ids: EdgeIdTable::new(capacity),
            next_edge_id: 1,
            drawn: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// 上一帧的可见节点 (按名称排序)
    pub fn visible(&self) -> &[SelectedNode] {
        &self.previous
    }

    pub fn edge_id(&self, a: SlotId, b: SlotId) -> Option<u64> {
        self.edge_ids.get(a, b).ok().flatten()
    }

    /// 曾经被可视化过的不同实体数
    pub fn how_many_drawn(&self) -> usize {
        self.drawn.len()
    }

    /// 计算本帧差分并写入下游缓冲 (不 flush)
    ///
    /// 缓冲容量超过边 ID 表容量时直接报错，不向下游写入任何事件。
    pub fn draw<S: Sink + ?Sized>(
        &mut self,
        buffer: &GraphBuffer,
        sink: &mut S,
    ) -> Result<FrameReport> {
        if buffer.capacity() > self.edge_ids.capacity() {
            return Err(CographError::Capacity(format!(
                "buffer capacity {} exceeds edge id table capacity {}",
                buffer.capacity(),
                self.edge_ids.capacity()
            )));
        }
        let selection = select(buffer, &self.config);
        let current = selection.nodes;
        let mut report = FrameReport {
            selection: selection.stats,
            ..Default::default()
        };

        let previous = std::mem::take(&mut self.previous);
        self.merge(&previous, &current, sink, &mut report)?;
        self.change_nodes(buffer, &current, sink, &mut report);
        self.change_edges(buffer, &current, sink, &mut report)?;

        self.drawn.extend(current.iter().map(|n| n.name.clone()));
        self.previous = current;

        debug!(
            added = report.nodes_added,
            deleted = report.nodes_deleted,
            new_edges = report.edges_added,
            visible = report.selection.nodes_visualized,
            "frame diffed"
        );
        Ok(report)
    }

    /// 按名称有序归并两帧
    fn merge<S: Sink + ?Sized>(
        &mut self,
        previous: &[SelectedNode],
        current: &[SelectedNode],
        sink: &mut S,
        report: &mut FrameReport,
    ) -> Result<()> {
        let (mut i, mut j) = (0, 0);
        while i < previous.len() && j < current.len() {
            let (prev, cur) = (&previous[i], &current[j]);
            match prev.name.cmp(&cur.name) {
                std::cmp::Ordering::Less => {
                    self.remove_node(prev, sink, report)?;
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    self.add_node(cur, sink, report);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    if prev.slot != cur.slot {
                        self.relocate(prev, previous, sink, report)?;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        for prev in &previous[i..] {
            self.remove_node(prev, sink, report)?;
        }
        for cur in &current[j..] {
            self.add_node(cur, sink, report);
        }
        Ok(())
    }

    fn remove_node<S: Sink + ?Sized>(
        &mut self,
        node: &SelectedNode,
        sink: &mut S,
        report: &mut FrameReport,
    ) -> Result<()> {
        sink.delete_node(&node.name);
        self.edge_ids.clear_slot(node.slot)?;
        report.nodes_deleted += 1;
        Ok(())
    }

    fn add_node<S: Sink + ?Sized>(
        &mut self,
        node: &SelectedNode,
        sink: &mut S,
        report: &mut FrameReport,
    ) {
        sink.set_attributes(
            Attributes::new()
                .with("r", 1)
                .with("g", 1)
                .with("b", 0)
                .with("label", &node.name),
        );
        sink.add_node(&node.name);
        report.nodes_added += 1;
    }

    /// 仍可见的实体在两帧之间换了槽位 (被淘汰后重新入驻)：
    /// 旧槽位上的边 ID 已不再属于它，删除这些边并释放 ID
    fn relocate<S: Sink + ?Sized>(
        &mut self,
        node: &SelectedNode,
        previous: &[SelectedNode],
        sink: &mut S,
        report: &mut FrameReport,
    ) -> Result<()> {
        for other in previous {
            if let Some(id) = self.edge_ids.get(node.slot, other.slot)? {
                sink.delete_edge(id);
                report.edges_deleted += 1;
            }
        }
        self.edge_ids.clear_slot(node.slot)
    }

    fn change_nodes<S: Sink + ?Sized>(
        &mut self,
        buffer: &GraphBuffer,
        current: &[SelectedNode],
        sink: &mut S,
        report: &mut FrameReport,
    ) {
        for node in current {
            let size = 5.0 * buffer.score(node.slot).sqrt();
            sink.set_attributes(
                Attributes::new()
                    .with("r", 0.0)
                    .with("g", 0.2)
                    .with("b", 0.8)
                    .with("size", size),
            );
            sink.change_node(&node.name);
            report.nodes_changed += 1;
        }
    }

    fn change_edges<S: Sink + ?Sized>(
        &mut self,
        buffer: &GraphBuffer,
        current: &[SelectedNode],
        sink: &mut S,
        report: &mut FrameReport,
    ) -> Result<()> {
        let (r, g, b) = EDGE_COLOUR;
        for (i, source) in current.iter().enumerate() {
            for target in &current[i + 1..] {
                let weight = buffer.weight(source.slot, target.slot);
                if weight <= self.config.edge_min_weight {
                    continue;
                }
                match self.edge_ids.get(source.slot, target.slot)? {
                    Some(id) => {
                        sink.set_attributes(
                            Attributes::new()
                                .with("weight", weight)
                                .with("r", r)
                                .with("g", g)
                                .with("b", b),
                        );
                        sink.change_edge(id);
                        report.edges_changed += 1;
                    }
                    None => {
                        let id = self.next_edge_id;
                        self.next_edge_id += 1;
                        sink.set_attributes(
                            Attributes::new()
                                .with("source", &source.name)
                                .with("target", &target.name)
                                .with("directed", false)
                                .with("weight", weight)
                                .with("r", r)
                                .with("g", g)
                                .with("b", b),
                        );
                        self.edge_ids.set(source.slot, target.slot, id)?;
                        sink.add_edge(id);
                        report.edges_added += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
