//! 有序消息集合
//!
//! 消息列表的本地一致视图：按 created_at 升序，两端可扩展，无重复身份。
//! 所有分页结果整页应用，不存在半页成功的状态。

use crate::message::Message;

/// 有序消息集合
#[derive(Debug, Default)]
pub struct MessageCollection {
    items: Vec<Message>,
}

impl MessageCollection {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 最老一条消息的时间戳（向前分页的锚点）
    pub fn oldest_created_at(&self) -> Option<i64> {
        self.items.first().map(|m| m.created_at)
    }

    /// 最新一条消息的时间戳（向后分页 / 变更日志回放的锚点）
    pub fn newest_created_at(&self) -> Option<i64> {
        self.items.last().map(|m| m.created_at)
    }

    /// 当前列表的完整快照
    pub fn snapshot(&self) -> Vec<Message> {
        self.items.clone()
    }

    /// 用初始页整体替换集合内容
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.items = messages;
    }

    /// 整页插入到头部，保留服务端返回的页内顺序
    pub fn prepend_page(&mut self, page: Vec<Message>) {
        self.items.splice(0..0, page);
    }

    /// 整页追加到尾部
    pub fn append_page(&mut self, page: Vec<Message>) {
        self.items.extend(page);
    }

    /// 追加一条新消息到尾部；身份已存在则丢弃（对重复投递幂等）
    ///
    /// 返回是否真的追加了。
    pub fn append_new(&mut self, message: Message) -> bool {
        if self.items.iter().any(|m| m.matches(&message)) {
            return false;
        }
        self.items.push(message);
        true
    }

    /// 用更新后的消息替换第一条身份匹配的条目；无匹配则不动
    ///
    /// 覆盖"本地 Pending 消息被服务端确认"：匹配可以落在 request_id 上，
    /// 替换后条目携带真正的 message_id。
    pub fn replace_matching(&mut self, updated: &Message) -> bool {
        if let Some(index) = self.items.iter().position(|m| m.matches(updated)) {
            self.items[index] = updated.clone();
            return true;
        }
        false
    }

    /// 删除所有 message_id 命中给定集合的条目，返回删除数量
    pub fn remove_by_ids(&mut self, message_ids: &[u64]) -> usize {
        let before = self.items.len();
        self.items.retain(|m| match m.message_id {
            Some(id) => !message_ids.contains(&id),
            None => true,
        });
        before - self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SendingStatus;

    fn server_message(id: u64, created_at: i64) -> Message {
        Message {
            message_id: Some(id),
            request_id: None,
            channel_id: 10,
            sender_id: 1,
            body: format!("message-{}", id),
            created_at,
            status: SendingStatus::Succeeded,
        }
    }

    #[test]
    fn test_prepend_preserves_page_order() {
        let mut collection = MessageCollection::new();
        collection.replace_all(vec![server_message(3, 300), server_message(4, 400)]);

        collection.prepend_page(vec![server_message(1, 100), server_message(2, 200)]);

        let timestamps: Vec<i64> = collection.snapshot().iter().map(|m| m.created_at).collect();
        assert_eq!(timestamps, vec![100, 200, 300, 400]);
    }

    #[test]
    fn test_append_new_is_idempotent() {
        let mut collection = MessageCollection::new();

        assert!(collection.append_new(server_message(1, 100)));
        assert!(!collection.append_new(server_message(1, 100)));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_replace_matching_by_request_id() {
        let mut collection = MessageCollection::new();
        let pending = Message::outgoing(10, 1, "hi");
        let request_id = pending.request_id.clone();
        collection.append_new(pending);

        let confirmed = Message {
            message_id: Some(42),
            request_id,
            channel_id: 10,
            sender_id: 1,
            body: "hi".to_string(),
            created_at: 500,
            status: SendingStatus::Succeeded,
        };

        assert!(collection.replace_matching(&confirmed));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.snapshot()[0].message_id, Some(42));
    }

    #[test]
    fn test_replace_matching_without_match_is_noop() {
        let mut collection = MessageCollection::new();
        collection.append_new(server_message(1, 100));

        assert!(!collection.replace_matching(&server_message(2, 200)));
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_remove_by_ids_keeps_pending() {
        let mut collection = MessageCollection::new();
        collection.append_new(server_message(1, 100));
        collection.append_new(server_message(2, 200));
        collection.append_new(Message::outgoing(10, 1, "pending"));

        let removed = collection.remove_by_ids(&[1, 2, 99]);

        assert_eq!(removed, 2);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.snapshot()[0].message_id, None);
    }
}
