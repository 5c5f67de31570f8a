//! ChatFeed SDK - 聊天消息列表同步核心
//!
//! 本 crate 为聊天 App 的 UI 层提供单个频道消息列表的本地一致视图，
//! 消息传输、持久化与实时投递全部委托给外部聊天 SDK。功能包括：
//! - 📄 初始加载与双向分页（以时间戳为锚点，短页判定历史取尽）
//! - 📡 实时事件调和：新消息、消息更新、消息删除、频道元数据变更
//! - 🔁 重连后的变更日志回放（时间戳锚定首页，token 续传直到取尽）
//! - ⚙️ 事件系统：显式订阅的列表变更通知，多引擎实例可共存
//! - 🧵 单属主并发模型：一个在途守卫，close 后迟到结果一律丢弃
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use chatfeed_sdk::{ChannelEventHub, ChannelInfo, ConnectionMonitor, MessageListEngine};
//!
//! // history / change_log 由外部聊天 SDK 的接入层实现
//! let hub = ChannelEventHub::new(64);
//! let monitor = ConnectionMonitor::new();
//!
//! let channel = ChannelInfo { channel_id: 10, name: "general".into() };
//! let engine = MessageListEngine::new(channel, history, change_log);
//! engine.clone().start(hub.subscribe(), monitor.subscribe());
//!
//! // 订阅列表变更，驱动 UI 刷新
//! let mut events = engine.subscribe();
//!
//! engine.load_initial().await?;
//! engine.load_previous().await?;   // 用户上滑
//!
//! // 离开页面
//! engine.close();
//! ```

// 导出核心模块
pub mod collection;
pub mod connection;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod message;
pub mod sync;

// 重新导出核心类型，方便使用
pub use collection::MessageCollection;
pub use connection::{ConnectionMonitor, ConnectionSignal, ConnectionStatus};
pub use error::{ChatFeedSDKError, Result};
pub use events::{ChannelEvent, ChannelEventHub, FetchErrorKind, ListEvent};
pub use fetcher::{ChangeLogAnchor, ChangeLogFetcher, ChangeLogPage, HistoryFetcher, HistoryQuery};
pub use message::{ChannelInfo, Message, SendingStatus};
pub use sync::{MessageListEngine, PAGE_SIZE};
