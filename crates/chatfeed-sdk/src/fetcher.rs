//! 拉取能力契约
//!
//! 引擎消费的两个外部能力，由外部聊天 SDK 实现：
//! - 按时间戳分页查询历史消息
//! - 按时间戳 / 续传 token 拉取变更日志（增量 diff）
//!
//! 网络协议、重试、超时均不在本层，属于传输层职责。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

/// 历史消息查询参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// 锚点时间戳（毫秒）；初始加载用 i64::MAX 表示"现在"
    pub anchor_ts: i64,
    /// 结果是否包含锚点时间戳本身
    pub inclusive: bool,
    /// 锚点之前最多返回多少条
    pub before_count: u32,
    /// 锚点之后最多返回多少条
    pub after_count: u32,
}

/// 历史消息拉取接口
///
/// 约定：返回的消息按 created_at 升序。
#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    async fn fetch_history(&self, query: HistoryQuery) -> Result<Vec<Message>>;
}

/// 变更日志锚点
///
/// 第一页用断连前最新消息的时间戳，后续页用服务端返回的续传 token。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeLogAnchor {
    Timestamp(i64),
    Token(String),
}

/// 变更日志分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogPage {
    /// 锚点之后被更新过的消息
    pub updated: Vec<Message>,
    /// 锚点之后被删除的消息 ID
    pub deleted_ids: Vec<u64>,
    /// 是否还有更多页
    pub has_more: bool,
    /// 下一页的续传 token
    pub next_token: Option<String>,
}

/// 变更日志拉取接口
#[async_trait]
pub trait ChangeLogFetcher: Send + Sync {
    async fn fetch_change_log(&self, anchor: ChangeLogAnchor) -> Result<ChangeLogPage>;
}
