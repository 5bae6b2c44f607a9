//! 播放流水线
//!
//! 单线程逐帧推进：摄入本帧时间段内的全部共现组 → 衰减 → 选择与差分 → flush。
//! 取消信号只在帧边界检查，缓冲不会停在半更新状态。

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cg_buffer::GraphBuffer;
use cg_core::{CoOccurrence, Result};
use cg_viz::overlay::{add_labels, change_datetime, remove_labels};
use cg_viz::{FileSink, FrameDiffer, HttpSink, Sink};

use crate::clock::{format_time, FrameClock, PaceChecker};
use crate::config::PipelineConfig;
use crate::reader::GroupReader;

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// 读到的行数
    pub lines_read: u64,
    /// 跳过的畸形行数
    pub malformed: u64,
    /// 摄入的共现组数
    pub groups: u64,
    /// 有向链接数，每组 m·(m-1)
    pub links: u64,
    /// 生成的帧数
    pub frames: u64,
    /// 见过的不同实体数 (仅在 `count_entities` 打开时统计)
    pub entities_seen: Option<usize>,
    /// 曾被可视化的不同实体数
    pub nodes_drawn: usize,
    /// 因时间戳倒退提前结束
    pub stopped_unsorted: bool,
    /// 被取消信号中断
    pub cancelled: bool,
}

/// 播放流水线
pub struct Pipeline {
    config: PipelineConfig,
    buffer: GraphBuffer,
    differ: FrameDiffer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let buffer = GraphBuffer::new(config.buffer_config())?;
        let differ = FrameDiffer::new(config.selector_config(), config.max_stored);
        Ok(Self {
            config,
            buffer,
            differ,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &GraphBuffer {
        &self.buffer
    }

    pub fn differ(&self) -> &FrameDiffer {
        &self.differ
    }

    /// 播放整条输入流，直到输入结束或收到取消信号
    pub async fn run<R, S>(
        &mut self,
        reader: &mut GroupReader<R>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RunStats>
    where
        R: AsyncBufRead + Unpin,
        S: Sink + ?Sized,
    {
        let mut stats = RunStats::default();
        let mut seen: Option<HashSet<String>> = self.config.count_entities.then(HashSet::new);

        let Some(first) = reader.next_group().await? else {
            info!("input is empty, nothing to play");
            self.finish(&mut stats, reader, seen.as_ref());
            return Ok(stats);
        };

        let mut clock = FrameClock::new(first.timestamp, self.config.frame_interval());
        let mut pace = PaceChecker::new(first.timestamp);
        info!(
            first = %format_time(first.timestamp),
            interval = clock.interval(),
            capacity = self.config.max_stored,
            max_visualized = self.config.max_visualized,
            "starting playback"
        );

        add_labels(sink, &format_time(first.timestamp), &self.config.labels);

        // 只有远程下游才按真实帧率节流
        let mut ticker = sink.is_remote().then(|| {
            let mut t = tokio::time::interval(Duration::from_micros(
                1_000_000 / u64::from(self.config.fps.max(1)),
            ));
            t.set_missed_tick_behavior(MissedTickBehavior::Delay);
            t
        });
        let stats_every = Duration::from_secs(self.config.stats_every_secs.max(1));
        let mut last_report = Instant::now();

        let mut next = Some(first);
        loop {
            if cancel.is_cancelled() {
                info!(frame = clock.frame(), "playback cancelled");
                stats.cancelled = true;
                // 收回叠加标签，下游画面不留残余说明
                remove_labels(sink);
                sink.flush().await?;
                break;
            }

            while next.as_ref().map_or(false, |g| clock.contains(g.timestamp)) {
                let Some(group) = next.take() else { break };
                self.ingest(&group, &mut stats, seen.as_mut())?;
                pace.observe(group.timestamp);
                next = reader.next_group().await?;
            }

            self.buffer.end_frame()?;
            change_datetime(sink, &format_time(clock.start()));
            let report = self.differ.draw(&self.buffer, sink)?;
            sink.flush().await?;
            stats.frames += 1;
            debug!(
                frame = clock.frame(),
                ts = clock.start(),
                nodes = self.buffer.node_count(),
                visible = report.selection.nodes_visualized,
                total_score = report.selection.total_score,
                "frame emitted"
            );
            clock.advance();

            if last_report.elapsed() >= stats_every {
                last_report = Instant::now();
                info!(
                    pace = %pace.summary(),
                    current = %format_time(clock.start()),
                    lines = reader.stats().lines,
                    links = stats.links,
                    malformed = reader.stats().malformed,
                    "progress"
                );
            }

            if next.is_none() {
                break;
            }
            if let Some(t) = ticker.as_mut() {
                t.tick().await;
            }
        }

        self.finish(&mut stats, reader, seen.as_ref());
        Ok(stats)
    }

    fn ingest(
        &mut self,
        group: &CoOccurrence,
        stats: &mut RunStats,
        seen: Option<&mut HashSet<String>>,
    ) -> Result<()> {
        stats.groups += 1;
        stats.links += group.link_count();
        if let Some(seen) = seen {
            seen.extend(group.names.iter().cloned());
        }
        self.buffer.add_group(group)
    }

    fn finish<R>(
        &self,
        stats: &mut RunStats,
        reader: &GroupReader<R>,
        seen: Option<&HashSet<String>>,
    ) {
        let rs = reader.stats();
        stats.lines_read = rs.lines;
        stats.malformed = rs.malformed;
        stats.stopped_unsorted = rs.stopped_unsorted;
        stats.entities_seen = seen.map(|s| s.len());
        stats.nodes_drawn = self.differ.how_many_drawn();
        info!(
            lines = stats.lines_read,
            links = stats.links,
            frames = stats.frames,
            malformed = stats.malformed,
            nodes_drawn = stats.nodes_drawn,
            entities_seen = ?stats.entities_seen,
            "playback finished"
        );
    }
}

/// 按配置创建下游：设置了 `server` 用 HTTP，否则写文件
pub async fn build_sink(config: &PipelineConfig) -> Result<Box<dyn Sink>> {
    if let Some(http) = config.http_config() {
        let sink = HttpSink::new(http)?;
        info!(endpoint = sink.endpoint(), "streaming events over http");
        return Ok(Box::new(sink));
    }
    match config.output_path() {
        Some(path) => Ok(Box::new(FileSink::create(path).await?)),
        None => Err(cg_core::CographError::Config(
            "either output or server must be given".into(),
        )),
    }
}

/// 打开输入：配置了文件则读文件，否则读标准输入
pub async fn open_input(
    config: &PipelineConfig,
) -> Result<GroupReader<Box<dyn AsyncBufRead + Unpin + Send>>> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &config.input {
        Some(path) => {
            info!(path = %path.display(), "reading groups from file");
            Box::new(BufReader::new(tokio::fs::File::open(path).await?))
        }
        None => {
            info!("reading groups from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };
    Ok(GroupReader::new(reader))
}

/// 按配置完成一次完整播放
pub async fn run(config: PipelineConfig, cancel: CancellationToken) -> Result<RunStats> {
    let mut pipeline = Pipeline::new(config)?;
    let mut reader = open_input(pipeline.config()).await?;
    let mut sink = build_sink(pipeline.config()).await?;
    pipeline.run(&mut reader, sink.as_mut(), &cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cg_viz::{EventBuffer, EventKind, GraphEvent, MemorySink};

    fn config() -> PipelineConfig {
        PipelineConfig {
            output: Some("unused".into()),
            time_contraction: 30,
            fps: 10,
            edge_min: 0.0,
            ..Default::default()
        }
    }

    fn kinds(frame: &[GraphEvent], kind: EventKind) -> Vec<&str> {
        frame
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_frames_follow_stream_time() {
        // 帧间隔 3：[100,103) [103,106) [106,109)
        let input = "100 a b\n101 a c\n104 b c\n107 d e\n";
        let mut reader = GroupReader::new(input.as_bytes());
        let mut sink = MemorySink::new();
        let mut pipeline = Pipeline::new(config()).unwrap();

        let stats = pipeline
            .run(&mut reader, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.groups, 4);
        assert_eq!(stats.links, 8);
        assert_eq!(stats.lines_read, 4);
        assert!(!stats.cancelled);

        let frames = sink.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(kinds(&frames[0], EventKind::AddLabel).len(), 4);
        assert_eq!(kinds(&frames[0], EventKind::AddNode), vec!["a", "b", "c"]);
        assert_eq!(kinds(&frames[1], EventKind::ChangeLabel), vec!["datetime"]);
        assert!(kinds(&frames[1], EventKind::AddNode).is_empty());
        assert_eq!(kinds(&frames[2], EventKind::AddNode), vec!["d", "e"]);
        assert_eq!(stats.nodes_drawn, 5);
    }

    #[tokio::test]
    async fn test_datetime_label_tracks_frame_start() {
        let input = "1325376000 a b\n1325376003 a b\n";
        let mut reader = GroupReader::new(input.as_bytes());
        let mut sink = MemorySink::new();
        let mut pipeline = Pipeline::new(config()).unwrap();
        pipeline
            .run(&mut reader, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        let labels: Vec<&str> = sink
            .frames()
            .iter()
            .flat_map(|f| f.iter())
            .filter(|e| e.kind == EventKind::ChangeLabel)
            .filter_map(|e| e.attributes.get("label"))
            .collect();
        assert_eq!(labels, vec!["2012-01-01 00:00:00", "2012-01-01 00:00:03"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_frame() {
        let mut reader = GroupReader::new("1 a b\n".as_bytes());
        let mut sink = MemorySink::new();
        let mut pipeline = Pipeline::new(config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = pipeline.run(&mut reader, &mut sink, &cancel).await.unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.frames, 0);
        assert_eq!(pipeline.buffer().node_count(), 0);

        // 只发出标签的添加与收回，没有任何节点
        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(kinds(&frames[0], EventKind::AddLabel).len(), 4);
        assert_eq!(
            kinds(&frames[0], EventKind::DeleteLabel),
            vec!["datetime", "label1", "label2", "producer"]
        );
        assert!(kinds(&frames[0], EventKind::AddNode).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_playback_removes_labels() {
        let input = "100 a b\n104 c d\n107 e f\n";
        let mut reader = GroupReader::new(input.as_bytes());
        let mut sink = CancelAfter {
            inner: MemorySink::new(),
            cancel: CancellationToken::new(),
            after: 1,
        };
        let cancel = sink.cancel.clone();
        let mut pipeline = Pipeline::new(config()).unwrap();

        let stats = pipeline.run(&mut reader, &mut sink, &cancel).await.unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.frames, 1);

        let frames = sink.inner.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(kinds(&frames[0], EventKind::AddNode), vec!["a", "b"]);
        assert_eq!(kinds(&frames[1], EventKind::DeleteLabel).len(), 4);
        assert!(kinds(&frames[1], EventKind::AddNode).is_empty());
    }

    /// 在第 `after` 次 flush 后触发取消
    struct CancelAfter {
        inner: MemorySink,
        cancel: CancellationToken,
        after: usize,
    }

    #[async_trait::async_trait]
    impl Sink for CancelAfter {
        fn buffer(&self) -> &EventBuffer {
            self.inner.buffer()
        }

        fn buffer_mut(&mut self) -> &mut EventBuffer {
            self.inner.buffer_mut()
        }

        async fn flush(&mut self) -> Result<()> {
            self.inner.flush().await?;
            if self.inner.frames().len() >= self.after {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_input_produces_no_frames() {
        let mut reader = GroupReader::new("\n".as_bytes());
        let mut sink = MemorySink::new();
        let mut pipeline = Pipeline::new(config()).unwrap();
        let stats = pipeline
            .run(&mut reader, &mut sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.frames, 0);
        assert!(sink.frames().is_empty());
    }

    #[tokio::test]
    async fn test_entity_counting_is_opt_in() {
        let input = "1 a b\n2 b c\n";
        let mut sink = MemorySink::new();

        let mut off = Pipeline::new(config()).unwrap();
        let stats = off
            .run(&mut GroupReader::new(input.as_bytes()), &mut sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.entities_seen, None);

        let mut on = Pipeline::new(PipelineConfig {
            count_entities: true,
            ..config()
        })
        .unwrap();
        let stats = on
            .run(&mut GroupReader::new(input.as_bytes()), &mut sink, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.entities_seen, Some(3));
    }

    #[tokio::test]
    async fn test_run_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("groups.txt");
        tokio::fs::write(&input, "10 x y\n20 x z\n").await.unwrap();
        let base = dir.path().join("frames");

        let cfg = PipelineConfig {
            input: Some(input),
            output: Some(base.to_string_lossy().into_owned()),
            time_contraction: 100,
            fps: 10,
            ..Default::default()
        };
        let stats = run(cfg, CancellationToken::new()).await.unwrap();
        assert_eq!(stats.frames, 2);

        let written = tokio::fs::read_to_string(dir.path().join("frames.json"))
            .await
            .unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.starts_with("{\"al\":{\"datetime\""));
    }
}
