//! 最弱集合
//!
//! 记录得分等于全局最低分 `min_score` 的所有槽位，供 O(1) 淘汰选择。
//! 并列时按进入集合的先后顺序 (FIFO) 出队。

use std::collections::VecDeque;

use cg_core::SlotId;

/// 最弱集合
#[derive(Debug, Clone)]
pub struct WeakSet {
    /// 入队顺序；(槽位, 票据)，票据失配的条目已被移除
    queue: VecDeque<(SlotId, u64)>,
    /// 槽位当前持有的票据
    tickets: Vec<Option<u64>>,
    next_ticket: u64,
    live: usize,
    min_score: f64,
}

impl WeakSet {
    /// 创建空集合
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            tickets: vec![None; capacity],
            next_ticket: 0,
            live: 0,
            min_score: f64::INFINITY,
        }
    }

    /// 当前最低分 (集合从未填充时为正无穷)
    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.tickets.get(slot).map_or(false, |t| t.is_some())
    }

    /// 按 FIFO 顺序列出成员
    pub fn members(&self) -> Vec<SlotId> {
        self.queue
            .iter()
            .filter(|(slot, ticket)| self.tickets[*slot] == Some(*ticket))
            .map(|(slot, _)| *slot)
            .collect()
    }

    fn push(&mut self, slot: SlotId) {
        if self.contains(slot) {
            return;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.tickets[slot] = Some(ticket);
        self.queue.push_back((slot, ticket));
        self.live += 1;
    }

    /// 新得分进入缓冲时维护集合：更低则独占，相等则加入
    pub fn admit(&mut self, slot: SlotId, score: f64) {
        if score < self.min_score {
            self.clear();
            self.min_score = score;
            self.push(slot);
        } else if score == self.min_score {
            self.push(slot);
        }
    }

    /// 移除成员，返回是否确实在集合中
    pub fn remove(&mut self, slot: SlotId) -> bool {
        match self.tickets.get_mut(slot).and_then(|t| t.take()) {
            Some(_) => {
                self.live -= 1;
                if self.queue.len() > 2 * self.tickets.len() {
                    self.compact();
                }
                true
            }
            None => false,
        }
    }

    /// 弹出最早进入集合的成员
    pub fn pop_front(&mut self) -> Option<SlotId> {
        while let Some((slot, ticket)) = self.queue.pop_front() {
            if self.tickets[slot] == Some(ticket) {
                self.tickets[slot] = None;
                self.live -= 1;
                return Some(slot);
            }
        }
        None
    }

    /// 根据全部已占用槽位的得分重建集合
    pub fn refill<I>(&mut self, scores: I)
    where
        I: IntoIterator<Item = (SlotId, f64)>,
    {
        self.clear();
        self.min_score = f64::INFINITY;
        for (slot, score) in scores {
            self.admit(slot, score);
        }
    }

    /// 清空成员 (最低分保持不变)
    pub fn clear(&mut self) {
        self.queue.clear();
        self.tickets.iter_mut().for_each(|t| *t = None);
        self.live = 0;
    }

    fn compact(&mut self) {
        let tickets = &self.tickets;
        self.queue
            .retain(|(slot, ticket)| tickets[*slot] == Some(*ticket));
    }
}
