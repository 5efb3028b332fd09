//! 错误类型定义
//!
//! 引擎内部统一使用 [`AnalysisError`]；跨越 worker 边界时投影为可序列化的 [`ErrorKind`]。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Lane;

/// 分析引擎错误类型
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 内容单元格式错误（例如 text 不是字符串）
    #[error("内容单元无效: {reason}")]
    InvalidContent { reason: String },

    /// 向 Researcher 请求了未注册的计算
    #[error("未注册的计算: {name}")]
    UnknownComputation { name: String },

    /// 检查单元在 execute 中失败
    #[error("检查 {identifier} 执行失败: {message}")]
    CheckExecution { identifier: String, message: String },

    /// 消息格式错误或顺序错误
    #[error("协议错误: {message}")]
    Protocol { message: String },

    /// 已被取代的请求的响应，只记录，不向用户展示
    #[error("请求 #{request_id} 的响应已过期 (通道: {lane})")]
    StaleResponse { request_id: u64, lane: Lane },

    /// 分析被协作式取消
    #[error("分析已取消")]
    Cancelled,

    /// 配置错误
    #[error("配置错误: {message}")]
    Config { message: String },

    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 错误种类（worker 协议中传输的数据形式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidContent,
    UnknownComputation,
    CheckExecution,
    Protocol,
    StaleResponse,
    Cancelled,
    Config,
    Io,
}

impl AnalysisError {
    /// 获取错误种类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidContent { .. } => ErrorKind::InvalidContent,
            AnalysisError::UnknownComputation { .. } => ErrorKind::UnknownComputation,
            AnalysisError::CheckExecution { .. } => ErrorKind::CheckExecution,
            AnalysisError::Protocol { .. } => ErrorKind::Protocol,
            AnalysisError::StaleResponse { .. } => ErrorKind::StaleResponse,
            AnalysisError::Cancelled => ErrorKind::Cancelled,
            AnalysisError::Config { .. } => ErrorKind::Config,
            AnalysisError::Io { .. } => ErrorKind::Io,
        }
    }

    /// 获取引发错误的标识（检查 ID 或计算名）
    pub fn identifier(&self) -> Option<&str> {
        match self {
            AnalysisError::CheckExecution { identifier, .. } => Some(identifier),
            AnalysisError::UnknownComputation { name } => Some(name),
            _ => None,
        }
    }

    /// 不带种类前缀的错误信息（worker 协议中的 `message` 字段）
    pub fn detail(&self) -> String {
        match self {
            AnalysisError::InvalidContent { reason } => reason.clone(),
            AnalysisError::UnknownComputation { name } => name.clone(),
            AnalysisError::CheckExecution { message, .. }
            | AnalysisError::Protocol { message }
            | AnalysisError::Config { message } => message.clone(),
            AnalysisError::Io { source, .. } => source.to_string(),
            AnalysisError::StaleResponse { .. } | AnalysisError::Cancelled => self.to_string(),
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Protocol {
            message: format!("JSON 解析失败: {}", err),
        }
    }
}

impl From<toml::de::Error> for AnalysisError {
    fn from(err: toml::de::Error) -> Self {
        AnalysisError::Config {
            message: format!("TOML 解析失败: {}", err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AnalysisError {
    /// 创建内容单元无效错误
    pub fn invalid_content(reason: impl Into<String>) -> Self {
        AnalysisError::InvalidContent {
            reason: reason.into(),
        }
    }

    /// 创建未注册计算错误
    pub fn unknown_computation(name: impl Into<String>) -> Self {
        AnalysisError::UnknownComputation { name: name.into() }
    }

    /// 创建检查执行错误
    pub fn check_execution(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::CheckExecution {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// 创建协议错误
    pub fn protocol(message: impl Into<String>) -> Self {
        AnalysisError::Protocol {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        AnalysisError::Config {
            message: message.into(),
        }
    }

    /// 创建文件错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 分析引擎结果类型
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_identifier() {
        let err = AnalysisError::check_execution("seo/text-length", "boom");
        assert_eq!(err.kind(), ErrorKind::CheckExecution);
        assert_eq!(err.identifier(), Some("seo/text-length"));

        let err = AnalysisError::unknown_computation("words");
        assert_eq!(err.kind(), ErrorKind::UnknownComputation);
        assert_eq!(err.identifier(), Some("words"));

        assert_eq!(AnalysisError::Cancelled.identifier(), None);
    }

    #[test]
    fn test_error_kind_wire_format() {
        let json = serde_json::to_string(&ErrorKind::StaleResponse).unwrap();
        assert_eq!(json, "\"stale_response\"");
    }
}
