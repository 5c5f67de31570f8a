use std::fmt;

#[derive(Debug)]
pub enum ChatFeedSDKError {
    /// 历史消息 / 变更日志拉取失败（携带底层原因描述）
    FetchFailed(String),
    JsonError(String),
    InvalidArgument(String),
    /// 引擎已关闭，后续操作一律拒绝
    Closed,
    Other(String),
}

impl fmt::Display for ChatFeedSDKError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatFeedSDKError::FetchFailed(e) => write!(f, "Fetch failed: {}", e),
            ChatFeedSDKError::JsonError(e) => write!(f, "JSON error: {}", e),
            ChatFeedSDKError::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            ChatFeedSDKError::Closed => write!(f, "Engine closed"),
            ChatFeedSDKError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl std::error::Error for ChatFeedSDKError {}

impl From<serde_json::Error> for ChatFeedSDKError {
    fn from(error: serde_json::Error) -> Self {
        ChatFeedSDKError::JsonError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatFeedSDKError>;
