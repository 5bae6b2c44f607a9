//! 播放配置

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cg_buffer::{BufferConfig, DecayPolicy, IncrementPolicy, RollingWindowConfig};
use cg_core::{CographError, Result};
use cg_viz::{HttpSinkConfig, OverlayLabels, SelectorConfig};

/// 流水线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 输入文件；缺省读标准输入
    pub input: Option<PathBuf>,
    /// 输出文件名 (不含扩展名，实际写入 `<output>.json`)
    pub output: Option<String>,
    /// 流式图服务器地址；设置后优先于文件输出
    pub server: Option<String>,
    /// 单帧网络推送最大重试次数
    pub max_retries: u32,
    /// 缓冲容量
    pub max_stored: usize,
    /// 每帧最多可视化的实体数
    pub max_visualized: usize,
    /// 每隔多少帧遗忘一次
    pub forget_every: u64,
    /// 遗忘系数
    pub forget_const: f64,
    /// 边权重阈值
    pub edge_min: f64,
    /// 检索关键词，不参与可视化
    pub keyword: String,
    /// 隐藏没有可见边的实体
    pub hide_singletons: bool,
    /// 增量策略
    pub increment: IncrementPolicy,
    /// 设置后改用滑动时间窗代替均匀遗忘
    pub window: Option<RollingWindowConfig>,
    /// 时间压缩比：每秒播放多少秒流时间
    pub time_contraction: u32,
    /// 每秒帧数
    pub fps: u32,
    /// 叠加标签
    pub labels: OverlayLabels,
    /// 进度日志间隔 (真实秒)
    pub stats_every_secs: u64,
    /// 统计见过的不同实体数 (内存随输入增长)
    pub count_entities: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            server: None,
            max_retries: 2,
            max_stored: 2000,
            max_visualized: 100,
            forget_every: 10,
            forget_const: 0.99,
            edge_min: 0.5,
            keyword: String::new(),
            hide_singletons: true,
            increment: IncrementPolicy::default(),
            window: None,
            time_contraction: 100,
            fps: 30,
            labels: OverlayLabels::default(),
            stats_every_secs: 10,
            count_entities: false,
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 文件加载，缺失字段取默认值
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CographError::Serialization)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(CographError::Config("fps must be positive".into()));
        }
        if self.frame_interval() < 1 {
            return Err(CographError::Config(format!(
                "time_contraction ({}) must not be smaller than fps ({})",
                self.time_contraction, self.fps
            )));
        }
        if self.output.as_deref().map_or(true, str::is_empty)
            && self.server.as_deref().map_or(true, str::is_empty)
        {
            return Err(CographError::Config(
                "either output or server must be given".into(),
            ));
        }
        self.buffer_config().validate()
    }

    /// 每帧覆盖的流时间 (秒)
    pub fn frame_interval(&self) -> i64 {
        if self.fps == 0 {
            return 0;
        }
        (self.time_contraction as f64 / self.fps as f64).round() as i64
    }

    pub fn buffer_config(&self) -> BufferConfig {
        let decay = match &self.window {
            Some(window) => DecayPolicy::RollingWindow(window.clone()),
            None => DecayPolicy::UniformForgetting {
                factor: self.forget_const,
                every: self.forget_every,
            },
        };
        BufferConfig {
            capacity: self.max_stored,
            increment: self.increment,
            decay,
        }
    }

    pub fn selector_config(&self) -> SelectorConfig {
        SelectorConfig {
            max_visualized: self.max_visualized,
            edge_min_weight: self.edge_min,
            excluded: Some(self.keyword.clone()).filter(|k| !k.is_empty()),
            hide_singletons: self.hide_singletons,
        }
    }

    /// 网络下游配置 (仅在设置了 `server` 时有意义)
    pub fn http_config(&self) -> Option<HttpSinkConfig> {
        self.server
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|server| HttpSinkConfig {
                server: server.clone(),
                max_retries: self.max_retries,
                ..Default::default()
            })
    }

    /// 文件下游的完整路径
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output
            .as_ref()
            .filter(|o| !o.is_empty())
            .map(|o| PathBuf::from(format!("{}.json", o)))
    }
}
