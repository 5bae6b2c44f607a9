//! 行式输入读取
//!
//! 每行一个共现组：`<ts> [w=<weight>] <name> <name> ...`，空白分隔。
//! 少于两个名称的行视为畸形并跳过；时间戳倒退则停止读取。

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, warn};

use cg_core::{CoOccurrence, CographError, Result, Timestamp};

/// 解析一行
pub fn parse_line(line: &str) -> Result<CoOccurrence> {
    let mut tokens = line.split_whitespace();
    let ts_token = tokens
        .next()
        .ok_or_else(|| CographError::Input("empty line".into()))?;
    let timestamp: Timestamp = ts_token
        .parse()
        .map_err(|_| CographError::Input(format!("bad timestamp '{}'", ts_token)))?;

    let mut weight = 1.0;
    let mut names: Vec<&str> = Vec::new();
    for (i, token) in tokens.enumerate() {
        match token.strip_prefix("w=") {
            Some(w) if i == 0 => {
                weight = w
                    .parse::<f64>()
                    .ok()
                    .filter(|w| w.is_finite() && *w >= 0.0)
                    .ok_or_else(|| CographError::Input(format!("bad weight '{}'", token)))?;
            }
            _ => names.push(token),
        }
    }

    let group = CoOccurrence::new(timestamp, names).with_weight(weight);
    if group.len() < 2 {
        return Err(CographError::Input(format!(
            "group at {} has fewer than two names",
            timestamp
        )));
    }
    Ok(group)
}

/// 读取统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderStats {
    /// 读到的全部行数
    pub lines: u64,
    /// 跳过的畸形行数
    pub malformed: u64,
    /// 是否因时间戳倒退提前停止
    pub stopped_unsorted: bool,
}

/// 共现组读取器
pub struct GroupReader<R> {
    lines: Lines<R>,
    last_timestamp: Option<Timestamp>,
    stats: ReaderStats,
    finished: bool,
}

impl<R> GroupReader<R> {
    pub fn stats(&self) -> &ReaderStats {
        &self.stats
    }
}

impl<R: AsyncBufRead + Unpin> GroupReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            last_timestamp: None,
            stats: ReaderStats::default(),
            finished: false,
        }
    }

    /// 读取下一个合法的共现组；输入结束或时间戳倒退时返回 `None`
    pub async fn next_group(&mut self) -> Result<Option<CoOccurrence>> {
        if self.finished {
            return Ok(None);
        }
        while let Some(line) = self.lines.next_line().await? {
            self.stats.lines += 1;
            if line.trim().is_empty() {
                continue;
            }
            let group = match parse_line(&line) {
                Ok(group) => group,
                Err(e) => {
                    self.stats.malformed += 1;
                    debug!(line = self.stats.lines, error = %e, "skipping malformed line");
                    continue;
                }
            };
            if let Some(last) = self.last_timestamp {
                if group.timestamp < last {
                    warn!(
                        line = self.stats.lines,
                        previous = last,
                        timestamp = group.timestamp,
                        "input is not sorted by timestamp, stopping"
                    );
                    self.stats.stopped_unsorted = true;
                    self.finished = true;
                    return Ok(None);
                }
            }
            self.last_timestamp = Some(group.timestamp);
            return Ok(Some(group));
        }
        self.finished = true;
        Ok(None)
    }
}
