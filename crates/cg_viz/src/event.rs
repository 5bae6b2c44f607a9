//! 流式图事件
//!
//! 每个事件序列化为只含一个顶层键的 JSON 对象：
//! `{"an":{"<id>":{"label":"x","r":"1"}}}`，属性值一律为字符串。

use serde::ser::{Serialize, SerializeMap, Serializer};

use cg_core::Result;

/// 事件类型 (增/改/删 × 节点/边/标签)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AddNode,
    ChangeNode,
    DeleteNode,
    AddEdge,
    ChangeEdge,
    DeleteEdge,
    AddLabel,
    ChangeLabel,
    DeleteLabel,
}

impl EventKind {
    /// 线格式中的键
    pub fn code(&self) -> &'static str {
        match self {
            EventKind::AddNode => "an",
            EventKind::ChangeNode => "cn",
            EventKind::DeleteNode => "dn",
            EventKind::AddEdge => "ae",
            EventKind::ChangeEdge => "ce",
            EventKind::DeleteEdge => "de",
            EventKind::AddLabel => "al",
            EventKind::ChangeLabel => "cl",
            EventKind::DeleteLabel => "dl",
        }
    }

    /// 删除类事件不携带属性
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            EventKind::DeleteNode | EventKind::DeleteEdge | EventKind::DeleteLabel
        )
    }
}

/// 有序属性集 (键 → 字符串化的值)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个属性，值通过 `Display` 字符串化
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 单个图事件
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEvent {
    pub kind: EventKind,
    pub id: String,
    pub attributes: Attributes,
}

impl GraphEvent {
    pub fn new(kind: EventKind, id: impl ToString, attributes: Attributes) -> Self {
        Self {
            kind,
            id: id.to_string(),
            attributes,
        }
    }
}

struct IdEntry<'a>(&'a str, &'a Attributes);

impl Serialize for IdEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

impl Serialize for GraphEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.code(), &IdEntry(&self.id, &self.attributes))?;
        map.end()
    }
}

/// 事件缓冲
///
/// 累积一帧内的事件，`set_attributes` 设置的属性会一直沿用到下一次设置。
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<GraphEvent>,
    attributes: Attributes,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 替换当前属性集
    pub fn set_attributes(&mut self, attributes: Attributes) {
        self.attributes = attributes;
    }

    /// 以当前属性集生成一个事件
    pub fn emit(&mut self, kind: EventKind, id: impl ToString) {
        let attributes = if kind.is_delete() {
            Attributes::new()
        } else {
            self.attributes.clone()
        };
        self.events.push(GraphEvent::new(kind, id, attributes));
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 取出全部事件并清空缓冲
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// 取出全部事件并渲染为线格式：每个事件一个 JSON 对象，以 `\r` 结尾
    pub fn take_payload(&mut self) -> Result<String> {
        render(&self.drain())
    }
}

/// 把一组事件渲染为线格式
pub fn render(events: &[GraphEvent]) -> Result<String> {
    let mut payload = String::new();
    for event in events {
        payload.push_str(&serde_json::to_string(event)?);
        payload.push('\r');
    }
    Ok(payload)
}
