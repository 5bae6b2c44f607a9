//! 帧时钟与节奏检查

use chrono::DateTime;
use tokio::time::Instant;

use cg_core::Timestamp;

/// 帧时钟：每帧覆盖 `[start, start + interval)` 的流时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    start: Timestamp,
    interval: i64,
    frame: u64,
}

impl FrameClock {
    pub fn new(first: Timestamp, interval: i64) -> Self {
        Self {
            start: first,
            interval: interval.max(1),
            frame: 0,
        }
    }

    /// 当前帧起始时间
    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// 已完成的帧数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 时间戳是否落在当前帧内
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.start + self.interval
    }

    /// 进入下一帧
    pub fn advance(&mut self) {
        self.start += self.interval;
        self.frame += 1;
    }
}

/// 节奏检查：流时间流逝速度 / 真实时间流逝速度
#[derive(Debug, Clone)]
pub struct PaceChecker {
    started: Instant,
    first: Timestamp,
    latest: Timestamp,
    last_checked: Option<(Timestamp, f64)>,
}

impl PaceChecker {
    pub fn new(first: Timestamp) -> Self {
        Self {
            started: Instant::now(),
            first,
            latest: first,
            last_checked: None,
        }
    }

    pub fn observe(&mut self, ts: Timestamp) {
        self.latest = ts;
    }

    fn wall_elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// 自上次调用以来的节奏
    pub fn pace_instant(&mut self) -> f64 {
        let wall = self.wall_elapsed();
        let (since_ts, since_wall) = self.last_checked.unwrap_or((self.first, 0.0));
        self.last_checked = Some((self.latest, wall));
        ratio((self.latest - since_ts) as f64, wall - since_wall)
    }

    /// 自开始以来的节奏
    pub fn pace_overall(&self) -> f64 {
        ratio((self.latest - self.first) as f64, self.wall_elapsed())
    }

    /// 单行摘要
    pub fn summary(&mut self) -> String {
        let instant = self.pace_instant();
        format!(
            "instant: {:.1}, overall: {:.1}. {} stream, {} wall.",
            instant,
            self.pace_overall(),
            format_elapsed((self.latest - self.first).max(0) as f64),
            format_elapsed(self.wall_elapsed()),
        )
    }
}

fn ratio(stream: f64, wall: f64) -> f64 {
    if wall > 0.0 {
        stream / wall
    } else {
        0.0
    }
}

/// 格式化时长：`[Nd ]H:MM:SS`
pub fn format_elapsed(seconds: f64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let total = seconds.max(0.0) as u64;
    let days = total / DAY;
    let mut rest = total % DAY;
    let hours = rest / HOUR;
    rest %= HOUR;
    let minutes = rest / MINUTE;
    rest %= MINUTE;

    if days > 0 {
        format!("{}d {}:{:02}:{:02}", days, hours, minutes, rest)
    } else {
        format!("{}:{:02}:{:02}", hours, minutes, rest)
    }
}

/// 把流时间戳格式化为 UTC 日期时间
pub fn format_time(ts: Timestamp) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}
