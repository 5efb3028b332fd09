//! Worker 消息协议
//!
//! 请求与响应都是带标签的枚举，可以直接在 channel 中传递，也可以序列化为 JSON（每条消息一个对象）。
//!
//! ```text
//! 请求方 → worker: initialize / analyze / update_configuration / cancel / run_research
//! worker → 请求方: ready / result / error / research
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::{AnalysisConfig, ConfigPatch};
use crate::error::{AnalysisError, ErrorKind, Result};
use crate::models::{Lane, Paper, ResultSet};

/// 请求 ID（单调递增）
pub type RequestId = u64;

/// 请求方发往 worker 的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    Initialize {
        configuration: AnalysisConfig,
    },
    Analyze {
        request_id: RequestId,
        lane: Lane,
        paper: Paper,
    },
    UpdateConfiguration {
        patch: ConfigPatch,
    },
    Cancel {
        request_id: RequestId,
    },
    RunResearch {
        request_id: RequestId,
        name: String,
        paper: Paper,
    },
}

/// worker 发往请求方的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    Ready,
    Result {
        request_id: RequestId,
        lane: Lane,
        result_set: ResultSet,
    },
    /// `request_id` 为空表示与具体请求无关（例如配置错误）
    Error {
        request_id: Option<RequestId>,
        kind: ErrorKind,
        identifier: Option<String>,
        message: String,
    },
    Research {
        request_id: RequestId,
        value: JsonValue,
    },
}

impl WorkerRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 解析请求；格式错误返回 [`AnalysisError::Protocol`]
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 请求 ID（`initialize` / `update_configuration` 没有）
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            WorkerRequest::Analyze { request_id, .. }
            | WorkerRequest::Cancel { request_id }
            | WorkerRequest::RunResearch { request_id, .. } => Some(*request_id),
            WorkerRequest::Initialize { .. } | WorkerRequest::UpdateConfiguration { .. } => None,
        }
    }
}

impl WorkerResponse {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 把错误转换为 `error` 消息
    pub fn error(request_id: Option<RequestId>, err: &AnalysisError) -> Self {
        WorkerResponse::Error {
            request_id,
            kind: err.kind(),
            identifier: err.identifier().map(str::to_string),
            message: err.detail(),
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            WorkerResponse::Ready => None,
            WorkerResponse::Result { request_id, .. } | WorkerResponse::Research { request_id, .. } => {
                Some(*request_id)
            }
            WorkerResponse::Error { request_id, .. } => *request_id,
        }
    }
}

/// 从 `error` 消息还原错误
pub fn error_from_wire(kind: ErrorKind, identifier: Option<String>, message: String) -> AnalysisError {
    match kind {
        ErrorKind::InvalidContent => AnalysisError::invalid_content(message),
        ErrorKind::UnknownComputation => AnalysisError::unknown_computation(identifier.unwrap_or(message)),
        ErrorKind::CheckExecution => AnalysisError::check_execution(identifier.unwrap_or_default(), message),
        ErrorKind::Cancelled => AnalysisError::Cancelled,
        ErrorKind::Config => AnalysisError::config(message),
        ErrorKind::Io => AnalysisError::io(identifier.unwrap_or_default(), std::io::Error::other(message)),
        ErrorKind::Protocol | ErrorKind::StaleResponse => AnalysisError::protocol(message),
    }
}
