//! 叠加标签：时间戳与三行说明文字

use serde::{Deserialize, Serialize};

use crate::event::Attributes;
use crate::sink::Sink;

pub const DATETIME: &str = "datetime";
pub const LABEL1: &str = "label1";
pub const LABEL2: &str = "label2";
pub const PRODUCER: &str = "producer";

/// 标签文字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayLabels {
    pub label1: String,
    pub label2: String,
    pub producer: String,
}

impl Default for OverlayLabels {
    fn default() -> Self {
        Self {
            label1: "label not specified".to_string(),
            label2: "label not specified".to_string(),
            producer: "cograph".to_string(),
        }
    }
}

/// 添加全部四个标签
pub fn add_labels<S: Sink + ?Sized>(sink: &mut S, datetime: &str, labels: &OverlayLabels) {
    sink.set_attributes(Attributes::new().with("label", datetime));
    sink.add_label(DATETIME);
    sink.set_attributes(
        Attributes::new()
            .with("label", &labels.label1)
            .with("x", 5)
            .with("y", 55)
            .with("size", 50),
    );
    sink.add_label(LABEL1);
    sink.set_attributes(
        Attributes::new()
            .with("label", &labels.label2)
            .with("x", 5)
            .with("y", 95)
            .with("size", 50),
    );
    sink.add_label(LABEL2);
    sink.set_attributes(
        Attributes::new()
            .with("label", &labels.producer)
            .with("x", 1050)
            .with("y", 715)
            .with("size", 20),
    );
    sink.add_label(PRODUCER);
}

/// 更新时间戳标签
pub fn change_datetime<S: Sink + ?Sized>(sink: &mut S, datetime: &str) {
    sink.set_attributes(Attributes::new().with("label", datetime));
    sink.change_label(DATETIME);
}

pub fn remove_labels<S: Sink + ?Sized>(sink: &mut S) {
    for id in [DATETIME, LABEL1, LABEL2, PRODUCER] {
        sink.delete_label(id);
    }
}
