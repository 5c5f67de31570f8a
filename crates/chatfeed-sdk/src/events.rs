//! 事件系统模块 - 消息列表同步的输入与输出事件
//!
//! 功能包括：
//! - 频道实时事件（新消息 / 消息更新 / 消息删除 / 频道元数据变更）
//! - 列表变更事件（全量快照、拉取失败、频道通知）
//! - 事件广播和订阅机制
//!
//! 不走 delegate 回调，而是显式的事件发布：订阅方拿到的
//! broadcast receiver 就是它的订阅者身份，多个引擎实例可以共存在
//! 同一个 hub 上，各自过滤自己绑定的频道。

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::message::{ChannelInfo, Message};

/// 频道实时事件（输入侧，由外部 SDK 的推送转换而来）
///
/// 每个事件都带 channel_id；引擎只处理自己绑定频道的事件。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// 收到新消息
    MessageReceived { channel_id: u64, message: Message },
    /// 消息被更新（编辑、发送确认等）
    MessageUpdated { channel_id: u64, message: Message },
    /// 消息被删除
    MessagesDeleted { channel_id: u64, message_ids: Vec<u64> },
    /// 频道元数据变更
    ChannelUpdated { channel: ChannelInfo },
    /// 频道被删除
    ChannelDeleted { channel_id: u64 },
}

impl ChannelEvent {
    /// 获取事件类型字符串
    pub fn event_type(&self) -> &'static str {
        match self {
            ChannelEvent::MessageReceived { .. } => "message_received",
            ChannelEvent::MessageUpdated { .. } => "message_updated",
            ChannelEvent::MessagesDeleted { .. } => "messages_deleted",
            ChannelEvent::ChannelUpdated { .. } => "channel_updated",
            ChannelEvent::ChannelDeleted { .. } => "channel_deleted",
        }
    }

    /// 获取事件关联的频道 ID
    pub fn channel_id(&self) -> u64 {
        match self {
            ChannelEvent::MessageReceived { channel_id, .. } => *channel_id,
            ChannelEvent::MessageUpdated { channel_id, .. } => *channel_id,
            ChannelEvent::MessagesDeleted { channel_id, .. } => *channel_id,
            ChannelEvent::ChannelUpdated { channel } => channel.channel_id,
            ChannelEvent::ChannelDeleted { channel_id } => *channel_id,
        }
    }
}

/// 拉取错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// 历史消息分页拉取
    History,
    /// 变更日志拉取
    ChangeLog,
}

/// 列表变更事件（输出侧，推给 UI 层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ListEvent {
    /// 消息列表变化（全量快照）
    MessagesChanged { messages: Vec<Message> },
    /// 拉取失败
    FetchFailed { kind: FetchErrorKind, error: String },
    /// 频道元数据变更
    ChannelUpdated { channel: ChannelInfo },
    /// 频道被删除
    ChannelDeleted { channel_id: u64 },
}

impl ListEvent {
    /// 获取事件类型字符串
    pub fn event_type(&self) -> &'static str {
        match self {
            ListEvent::MessagesChanged { .. } => "messages_changed",
            ListEvent::FetchFailed { .. } => "fetch_failed",
            ListEvent::ChannelUpdated { .. } => "channel_updated",
            ListEvent::ChannelDeleted { .. } => "channel_deleted",
        }
    }
}

/// 频道事件广播 hub
///
/// 外部 SDK 的推送在接入层转成 [`ChannelEvent`] 后从这里发布；
/// 每个引擎实例持有自己的 receiver，互不影响。
pub struct ChannelEventHub {
    sender: broadcast::Sender<ChannelEvent>,
}

impl ChannelEventHub {
    /// 创建 hub，capacity 为每个订阅者的积压上限
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    pub fn publish(&self, event: ChannelEvent) {
        // 无订阅者时 send 会失败，属正常场景（如列表页未打开），仅打 debug
        if let Err(e) = self.sender.send(event) {
            debug!("Failed to broadcast channel event (no active receivers): {}", e);
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }

    /// 获取活跃订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_delivers_to_all_subscribers() {
        let hub = ChannelEventHub::new(16);

        let mut receiver1 = hub.subscribe();
        let mut receiver2 = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(ChannelEvent::ChannelDeleted { channel_id: 10 });

        let event1 = receiver1.recv().await.unwrap();
        let event2 = receiver2.recv().await.unwrap();
        assert_eq!(event1.event_type(), "channel_deleted");
        assert_eq!(event2.event_type(), "channel_deleted");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let hub = ChannelEventHub::new(16);
        hub.publish(ChannelEvent::ChannelDeleted { channel_id: 10 });
    }

    #[test]
    fn test_event_channel_id() {
        let event = ChannelEvent::MessagesDeleted {
            channel_id: 7,
            message_ids: vec![1, 2],
        };
        assert_eq!(event.channel_id(), 7);
        assert_eq!(event.event_type(), "messages_deleted");
    }
}
