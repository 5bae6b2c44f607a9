//! # cg_stream - cograph Playback Pipeline
//!
//! 读取按时间排序的共现组，按帧推进有界图缓冲，并把差分事件交给下游。

pub mod clock;
pub mod config;
pub mod pipeline;
pub mod reader;

pub use clock::{format_elapsed, format_time, FrameClock, PaceChecker};
pub use config::PipelineConfig;
pub use pipeline::{build_sink, open_input, run, Pipeline, RunStats};
pub use reader::{parse_line, GroupReader, ReaderStats};

pub use cg_core::{CographError, Result};
