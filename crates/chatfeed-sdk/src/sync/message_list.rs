//! 消息列表同步引擎
//!
//! 把四路并发输入调和进同一个有序消息集合：
//! - 初始分页加载（以"现在"为锚点的双向页）
//! - 向前 / 向后分页
//! - 实时推送事件
//! - 重连后的变更日志回放
//!
//! ## NOTE: Engine 不做重试
//!
//! MessageListEngine does not retry. Retry / backoff policies belong to the
//! transport layer behind [`HistoryFetcher`] / [`ChangeLogFetcher`].
//!
//! 并发模型：集合与分页标志放在一把 `RwLock` 里，所有变更都发生在 await
//! 恢复点之间；`loading` 是唯一的准入控制，保证同一时刻至多一个历史
//! 拉取在途。实时事件与回放不受该标志约束，可以和在途分页交错。

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collection::MessageCollection;
use crate::connection::ConnectionSignal;
use crate::error::{ChatFeedSDKError, Result};
use crate::events::{ChannelEvent, FetchErrorKind, ListEvent};
use crate::fetcher::{ChangeLogAnchor, ChangeLogFetcher, HistoryFetcher, HistoryQuery};
use crate::message::{ChannelInfo, Message};

/// 每页消息条数；返回少于一页视为该方向历史已取尽
pub const PAGE_SIZE: u32 = 30;

/// "现在"哨兵锚点：初始加载以它为上界
const NOW_SENTINEL_TS: i64 = i64::MAX;

/// 列表状态（集合 + 分页标志），整体放在一把锁里
struct ListState {
    messages: MessageCollection,
    /// 更早方向可能还有历史
    has_previous: bool,
    /// 更新方向可能还有历史（true 表示当前视图和实时边缘之间存在间隙）
    has_next: bool,
    /// 在途守卫：同一时刻至多一个历史拉取
    loading: bool,
}

impl ListState {
    fn new() -> Self {
        Self {
            messages: MessageCollection::new(),
            has_previous: true,
            has_next: false,
            loading: false,
        }
    }
}

/// 消息列表同步引擎
///
/// 单逻辑属主组件：面向 UI 绑定的顺序执行环境设计，
/// 所有状态变更通过同一把 `RwLock` 串行化。
pub struct MessageListEngine {
    channel: RwLock<ChannelInfo>,
    history: Arc<dyn HistoryFetcher>,
    change_log: Arc<dyn ChangeLogFetcher>,
    state: RwLock<ListState>,
    emitter: broadcast::Sender<ListEvent>,
    /// 存活令牌：close 后迟到的拉取结果一律丢弃
    cancel: CancellationToken,
}

impl MessageListEngine {
    /// 创建引擎，集合初始为空
    pub fn new(
        channel: ChannelInfo,
        history: Arc<dyn HistoryFetcher>,
        change_log: Arc<dyn ChangeLogFetcher>,
    ) -> Arc<Self> {
        let (emitter, _) = broadcast::channel(64);
        Arc::new(Self {
            channel: RwLock::new(channel),
            history,
            change_log,
            state: RwLock::new(ListState::new()),
            emitter,
            cancel: CancellationToken::new(),
        })
    }

    /// 启动事件循环：消费频道实时事件与连接信号
    ///
    /// 循环持有弱引用，引擎被丢弃或 close 后自行退出，
    /// 等效于从两个事件源注销。
    pub fn start(
        self: Arc<Self>,
        mut live_rx: broadcast::Receiver<ChannelEvent>,
        mut conn_rx: broadcast::Receiver<ConnectionSignal>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        let cancel = self.cancel.clone();
        drop(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = live_rx.recv() => match event {
                        Ok(event) => {
                            let Some(engine) = weak.upgrade() else { break };
                            engine.handle_channel_event(event).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("频道事件积压丢失 {} 条", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    signal = conn_rx.recv() => match signal {
                        Ok(ConnectionSignal::Recovered) => {
                            let Some(engine) = weak.upgrade() else { break };
                            engine.handle_reconnected().await;
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("连接信号积压丢失 {} 条", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("消息列表事件循环退出");
        })
    }

    /// 订阅列表变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.emitter.subscribe()
    }

    /// 关闭引擎：事件循环退出，迟到的拉取结果不再落地
    pub fn close(&self) {
        info!("关闭消息列表引擎");
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ============================================================
    // 分页加载
    // ============================================================

    /// 初始加载：以"现在"为锚点拉一页（含锚点，前后各 PAGE_SIZE 条），
    /// 成功后整体替换集合
    ///
    /// 注意：这里不把 has_next 置 true。以"现在"为上界时假定没有更新的
    /// 历史，实时边缘之后的扩展只能来自实时事件或重连回放。
    pub async fn load_initial(&self) -> Result<()> {
        if !self.try_begin_loading().await {
            return Ok(());
        }

        let query = HistoryQuery {
            anchor_ts: NOW_SENTINEL_TS,
            inclusive: true,
            before_count: PAGE_SIZE,
            after_count: PAGE_SIZE,
        };
        let result = self.history.fetch_history(query).await;

        let mut state = self.state.write().await;
        state.loading = false;
        if self.cancel.is_cancelled() {
            return Err(ChatFeedSDKError::Closed);
        }

        match result {
            Ok(page) => {
                state.has_previous = !page.is_empty();
                state.messages.replace_all(page);
                debug!("初始加载完成: {} 条", state.messages.len());
                let snapshot = state.messages.snapshot();
                drop(state);
                self.emit_messages_changed(snapshot);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.emit_fetch_failed(FetchErrorKind::History, &e);
                Err(e)
            }
        }
    }

    /// 向前分页：拉取最老消息之前的一页（不含锚点），整页插到头部
    ///
    /// 前置条件不满足（无更早历史 / 有拉取在途 / 集合为空）时静默返回。
    pub async fn load_previous(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        let anchor_ts = {
            let mut state = self.state.write().await;
            if !state.has_previous || state.loading {
                return Ok(());
            }
            let Some(ts) = state.messages.oldest_created_at() else {
                return Ok(());
            };
            state.loading = true;
            ts
        };

        let query = HistoryQuery {
            anchor_ts,
            inclusive: false,
            before_count: PAGE_SIZE,
            after_count: 0,
        };
        let result = self.history.fetch_history(query).await;

        let mut state = self.state.write().await;
        state.loading = false;
        if self.cancel.is_cancelled() {
            return Err(ChatFeedSDKError::Closed);
        }

        match result {
            Ok(page) => {
                // 短页意味着该方向历史取尽
                state.has_previous = page.len() >= PAGE_SIZE as usize;
                debug!("向前分页完成: {} 条, has_previous={}", page.len(), state.has_previous);
                state.messages.prepend_page(page);
                let snapshot = state.messages.snapshot();
                drop(state);
                self.emit_messages_changed(snapshot);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.emit_fetch_failed(FetchErrorKind::History, &e);
                Err(e)
            }
        }
    }

    /// 向后分页：拉取最新消息之后的一页（不含锚点），整页追加到尾部
    pub async fn load_next(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        let anchor_ts = {
            let mut state = self.state.write().await;
            if !state.has_next || state.loading {
                return Ok(());
            }
            let Some(ts) = state.messages.newest_created_at() else {
                return Ok(());
            };
            state.loading = true;
            ts
        };

        let query = HistoryQuery {
            anchor_ts,
            inclusive: false,
            before_count: 0,
            after_count: PAGE_SIZE,
        };
        let result = self.history.fetch_history(query).await;

        let mut state = self.state.write().await;
        state.loading = false;
        if self.cancel.is_cancelled() {
            return Err(ChatFeedSDKError::Closed);
        }

        match result {
            Ok(page) => {
                state.has_next = page.len() >= PAGE_SIZE as usize;
                debug!("向后分页完成: {} 条, has_next={}", page.len(), state.has_next);
                state.messages.append_page(page);
                let snapshot = state.messages.snapshot();
                drop(state);
                self.emit_messages_changed(snapshot);
                Ok(())
            }
            Err(e) => {
                drop(state);
                self.emit_fetch_failed(FetchErrorKind::History, &e);
                Err(e)
            }
        }
    }

    // ============================================================
    // 本地发送
    // ============================================================

    /// 调用方刚发出一条消息，交给引擎上列表
    ///
    /// 走与实时新消息相同的按身份去重路径：即使同一条消息的推送事件
    /// 先到或并发到达，也不会重复追加。自己发的消息不受 has_next 门限，
    /// 始终立即可见。
    pub async fn handle_sent_message(&self, message: Message) {
        let mut state = self.state.write().await;
        if state.messages.append_new(message) {
            let snapshot = state.messages.snapshot();
            drop(state);
            self.emit_messages_changed(snapshot);
        }
    }

    // ============================================================
    // 实时事件调和
    // ============================================================

    async fn handle_channel_event(&self, event: ChannelEvent) {
        // 只处理绑定频道的事件
        if event.channel_id() != self.bound_channel_id().await {
            return;
        }

        match event {
            ChannelEvent::MessageReceived { message, .. } => {
                let mut state = self.state.write().await;
                // 存在向后分页间隙时丢弃，避免乱序追加
                if state.has_next {
                    debug!("存在 forward 间隙，丢弃实时新消息");
                    return;
                }
                if state.messages.append_new(message) {
                    let snapshot = state.messages.snapshot();
                    drop(state);
                    self.emit_messages_changed(snapshot);
                }
            }
            ChannelEvent::MessageUpdated { message, .. } => {
                let mut state = self.state.write().await;
                // 未物化的消息收到更新：静默忽略，不回源拉取
                if state.messages.replace_matching(&message) {
                    let snapshot = state.messages.snapshot();
                    drop(state);
                    self.emit_messages_changed(snapshot);
                }
            }
            ChannelEvent::MessagesDeleted { message_ids, .. } => {
                let mut state = self.state.write().await;
                if state.messages.remove_by_ids(&message_ids) > 0 {
                    let snapshot = state.messages.snapshot();
                    drop(state);
                    self.emit_messages_changed(snapshot);
                }
            }
            ChannelEvent::ChannelUpdated { channel } => {
                // 元数据事件不动消息集合，换掉持有的频道信息并转发通知
                *self.channel.write().await = channel.clone();
                self.emit(ListEvent::ChannelUpdated { channel });
            }
            ChannelEvent::ChannelDeleted { channel_id } => {
                self.emit(ListEvent::ChannelDeleted { channel_id });
            }
        }
    }

    // ============================================================
    // 重连回放
    // ============================================================

    /// 重连成功：乐观假定回到实时边缘，从最新消息的时间戳开始回放变更日志
    ///
    /// 一次重连只跑一条回放链：逐页拉取直到没有更多页或没有续传 token；
    /// 中途出错静默终止（重连同步是尽力而为，下次重连或后续实时事件会纠正）。
    async fn handle_reconnected(&self) {
        let anchor_ts = {
            let mut state = self.state.write().await;
            state.has_next = true;
            state.messages.newest_created_at()
        };
        // 集合为空则无从锚定，跳过回放
        let Some(anchor_ts) = anchor_ts else {
            debug!("重连时集合为空，跳过变更日志回放");
            return;
        };

        info!("开始变更日志回放: since_ts={}", anchor_ts);
        let mut anchor = ChangeLogAnchor::Timestamp(anchor_ts);
        let mut pages = 0usize;

        loop {
            let page = match self.change_log.fetch_change_log(anchor).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("变更日志拉取失败，终止回放: {}", e);
                    return;
                }
            };
            if self.cancel.is_cancelled() {
                return;
            }
            pages += 1;

            let snapshot = {
                let mut state = self.state.write().await;
                let mut changed = false;
                for updated in &page.updated {
                    changed |= state.messages.replace_matching(updated);
                }
                changed |= state.messages.remove_by_ids(&page.deleted_ids) > 0;
                debug!(
                    "回放第 {} 页: {} 条更新, {} 条删除",
                    pages,
                    page.updated.len(),
                    page.deleted_ids.len()
                );
                if changed {
                    Some(state.messages.snapshot())
                } else {
                    None
                }
            };
            if let Some(snapshot) = snapshot {
                self.emit_messages_changed(snapshot);
            }

            match (page.has_more, page.next_token) {
                (true, Some(token)) => anchor = ChangeLogAnchor::Token(token),
                _ => break,
            }
        }

        info!("变更日志回放完成: {} 页", pages);
    }

    // ============================================================
    // 状态访问
    // ============================================================

    /// 当前列表快照
    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.snapshot()
    }

    pub async fn has_previous(&self) -> bool {
        self.state.read().await.has_previous
    }

    pub async fn has_next(&self) -> bool {
        self.state.read().await.has_next
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// 绑定频道的当前信息
    pub async fn channel(&self) -> ChannelInfo {
        self.channel.read().await.clone()
    }

    // ============================================================
    // 私有方法
    // ============================================================

    /// 准入控制：占用在途守卫；已有拉取在途或引擎已关闭时返回 false
    async fn try_begin_loading(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut state = self.state.write().await;
        if state.loading {
            return false;
        }
        state.loading = true;
        true
    }

    async fn bound_channel_id(&self) -> u64 {
        self.channel.read().await.channel_id
    }

    fn emit_messages_changed(&self, messages: Vec<Message>) {
        self.emit(ListEvent::MessagesChanged { messages });
    }

    fn emit_fetch_failed(&self, kind: FetchErrorKind, error: &ChatFeedSDKError) {
        self.emit(ListEvent::FetchFailed {
            kind,
            error: error.to_string(),
        });
    }

    fn emit(&self, event: ListEvent) {
        // 无订阅者时 send 会失败，属正常场景，仅打 debug
        if let Err(e) = self.emitter.send(event) {
            debug!("Failed to broadcast list event (no active receivers): {}", e);
        }
    }
}

impl Drop for MessageListEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
