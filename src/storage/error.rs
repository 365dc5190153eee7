//! 存储层错误类型
//!
//! 所有存储操作失败时返回 [`StoreError`]，其 `Display` 文本直接展示给用户

use thiserror::Error;

/// 存储操作错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 网络请求失败
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 存储端返回的错误（非 2xx）
    #[error("{message}")]
    Api { status: u16, message: String },

    /// 行数据无法解析
    #[error("malformed row: {0}")]
    Decode(#[from] serde_json::Error),

    /// 其他存储端错误
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    /// 从错误响应体构造，优先取 JSON 中的 `message` 字段
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("store responded with status {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        StoreError::Api { status, message }
    }
}
