/// 消息列表同步模块
///
/// 职责：
/// - 维护单个频道消息列表的本地一致视图
/// - 初始加载 / 向前向后分页
/// - 实时事件调和（新消息、更新、删除、频道元数据）
/// - 重连后的变更日志回放

pub mod message_list;

pub use message_list::{MessageListEngine, PAGE_SIZE};
