//! 连接状态信号
//!
//! 传输层的连接恢复信号从这里广播给各个列表引擎。
//! 本组件只消费"重连成功"这一种信号，用于触发变更日志回放；
//! 连接管理本身（重连、退避、鉴权）属于外部 SDK。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// 已连接
    Connected,
    /// 未连接
    Disconnected,
}

/// 连接信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionSignal {
    /// 连接断开
    Lost,
    /// 重连成功
    Recovered,
}

/// 连接状态监视器（线程安全）
///
/// 接入层在传输回调里调用 mark_lost / mark_recovered，
/// 引擎通过 subscribe 拿到信号流。
#[derive(Clone)]
pub struct ConnectionMonitor {
    status: Arc<RwLock<ConnectionStatus>>,
    sender: broadcast::Sender<ConnectionSignal>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            status: Arc::new(RwLock::new(ConnectionStatus::Connected)),
            sender,
        }
    }

    /// 标记连接断开
    pub async fn mark_lost(&self) {
        let mut status = self.status.write().await;
        if *status == ConnectionStatus::Disconnected {
            return;
        }
        *status = ConnectionStatus::Disconnected;
        info!("连接断开");
        self.send(ConnectionSignal::Lost);
    }

    /// 标记重连成功
    pub async fn mark_recovered(&self) {
        let mut status = self.status.write().await;
        *status = ConnectionStatus::Connected;
        info!("重连成功，广播恢复信号");
        self.send(ConnectionSignal::Recovered);
    }

    /// 获取当前状态快照
    pub async fn status(&self) -> ConnectionStatus {
        *self.status.read().await
    }

    /// 订阅连接信号
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.sender.subscribe()
    }

    fn send(&self, signal: ConnectionSignal) {
        if let Err(e) = self.sender.send(signal) {
            debug!("Failed to broadcast connection signal (no active receivers): {}", e);
        }
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recovered_signal_is_broadcast() {
        let monitor = ConnectionMonitor::new();
        let mut receiver = monitor.subscribe();

        monitor.mark_lost().await;
        monitor.mark_recovered().await;

        assert_eq!(receiver.recv().await.unwrap(), ConnectionSignal::Lost);
        assert_eq!(receiver.recv().await.unwrap(), ConnectionSignal::Recovered);
        assert_eq!(monitor.status().await, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_mark_lost_is_deduplicated() {
        let monitor = ConnectionMonitor::new();
        let mut receiver = monitor.subscribe();

        monitor.mark_lost().await;
        monitor.mark_lost().await;
        monitor.mark_recovered().await;

        assert_eq!(receiver.recv().await.unwrap(), ConnectionSignal::Lost);
        // 第二次 mark_lost 不重复发信号
        assert_eq!(receiver.recv().await.unwrap(), ConnectionSignal::Recovered);
    }
}
