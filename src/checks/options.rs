//! 检查配置合并
//!
//! 调用方提供的配置覆盖在内置默认值之上：缺失的键取默认值，未知的键忽略。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{AnalysisError, Result};

/// 把 `overrides` 中已知的键覆盖到 `defaults` 上
pub fn merge_options<T>(defaults: T, overrides: Option<&JsonValue>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let Some(overrides) = overrides else {
        return Ok(defaults);
    };
    let overrides = overrides
        .as_object()
        .ok_or_else(|| AnalysisError::config(format!("检查配置必须是对象: {}", overrides)))?;

    let mut base = serde_json::to_value(&defaults)
        .map_err(|e| AnalysisError::config(format!("无法序列化默认配置: {}", e)))?;

    if let Some(base) = base.as_object_mut() {
        for (key, value) in overrides {
            if base.contains_key(key) {
                base.insert(key.clone(), value.clone());
            } else {
                tracing::debug!("忽略未知配置项: {}", key);
            }
        }
    }

    serde_json::from_value(base).map_err(|e| AnalysisError::config(format!("检查配置无效: {}", e)))
}
