//! 消息实体定义
//!
//! UI 层消息列表的最小数据表示，用于：
//! - 类型安全的数据传输
//! - 统一的数据表示
//! - 序列化/反序列化支持
//!
//! 消息的持久化与传输由外部聊天 SDK 负责，这里只承载列表同步需要的字段。

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendingStatus {
    /// 发送中（尚未拿到服务端 message_id）
    Pending,
    /// 发送成功
    Succeeded,
    /// 发送失败
    Failed,
}

/// 消息实体
///
/// 身份匹配规则：
/// - `message_id`：服务端分配的稳定 ID；刚发送的本地消息可能还没有
/// - `request_id`：客户端发送时生成的关联 ID（uuid v4）
///
/// 两条消息视为同一条，当且仅当双方的 `message_id` 相等，
/// 或双方的 `request_id` 相等（覆盖"本地 Pending 消息被服务端确认"的场景）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// 服务端消息 ID（发送/同步成功后赋值）
    pub message_id: Option<u64>,
    /// 客户端请求 ID
    ///
    /// request_id is a local correlation identifier,
    /// it MUST NOT be relied on across devices.
    pub request_id: Option<String>,
    pub channel_id: u64,
    pub sender_id: u64,
    pub body: String,
    /// 创建时间，毫秒时间戳（与服务端一致），列表的排序键
    pub created_at: i64,
    pub status: SendingStatus,
}

impl Message {
    /// 构造一条刚发出的本地消息：无服务端 ID，带新 request_id，状态 Pending
    pub fn outgoing(channel_id: u64, sender_id: u64, body: impl Into<String>) -> Self {
        Self {
            message_id: None,
            request_id: Some(uuid::Uuid::new_v4().to_string()),
            channel_id,
            sender_id,
            body: body.into(),
            created_at: Utc::now().timestamp_millis(),
            status: SendingStatus::Pending,
        }
    }

    /// 身份匹配：message_id 相等，或 request_id 相等
    pub fn matches(&self, other: &Message) -> bool {
        if let (Some(a), Some(b)) = (self.message_id, other.message_id) {
            if a == b {
                return true;
            }
        }
        if let (Some(a), Some(b)) = (&self.request_id, &other.request_id) {
            if a == b {
                return true;
            }
        }
        false
    }

    /// 生成 JSON 格式（调试用）
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 频道信息
///
/// 引擎只保留所绑定频道的元数据快照；频道本身由外部 SDK 管理。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_message_defaults() {
        let message = Message::outgoing(10, 1, "hello");

        assert_eq!(message.message_id, None);
        assert!(message.request_id.is_some());
        assert_eq!(message.status, SendingStatus::Pending);
        assert!(message.created_at > 0);
    }

    #[test]
    fn test_matches_by_message_id() {
        let mut a = Message::outgoing(10, 1, "a");
        let mut b = Message::outgoing(10, 2, "b");
        a.message_id = Some(42);
        b.message_id = Some(42);

        assert!(a.matches(&b));
    }

    #[test]
    fn test_matches_by_request_id() {
        let pending = Message::outgoing(10, 1, "a");
        let mut confirmed = pending.clone();
        confirmed.message_id = Some(42);
        confirmed.status = SendingStatus::Succeeded;

        // 服务端确认的消息还带着同一个 request_id
        assert!(pending.matches(&confirmed));
    }

    #[test]
    fn test_no_match_without_shared_identity() {
        let a = Message::outgoing(10, 1, "a");
        let b = Message::outgoing(10, 1, "b");

        assert!(!a.matches(&b));
    }
}
