//! 程序配置
//!
//! - [`Config`]：批量分析程序的运行配置（环境变量或 TOML 文件）
//! - [`AnalysisConfig`]：分析引擎配置，worker 初始化时传入
//! - [`ConfigPatch`]：`updateConfiguration` 使用的部分配置

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::models::{Lane, DEFAULT_SCALE_MAX};
use crate::orchestrator::scoring::AggregationKind;

/// 分析引擎配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 设置后覆盖内容单元自带的语言区域（影响分词与分句）
    pub locale: Option<String>,
    /// 使用基石内容的严格评分配置
    pub use_cornerstone: bool,
    /// 内部评分满分
    pub score_scale_max: f64,
    /// 总分聚合方式
    pub aggregation: AggregationKind,
    /// 禁用的检查标识
    pub disabled_checks: Vec<String>,
    /// 每个检查的配置（检查标识 → 配置对象）
    pub checks: BTreeMap<String, JsonValue>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            locale: None,
            use_cornerstone: false,
            score_scale_max: DEFAULT_SCALE_MAX,
            aggregation: AggregationKind::Mean,
            disabled_checks: Vec::new(),
            checks: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if !(self.score_scale_max > 0.0) {
            return Err(AnalysisError::config(format!(
                "score_scale_max 必须大于 0，实际为 {}",
                self.score_scale_max
            )));
        }
        if let Some(locale) = &self.locale {
            if locale.trim().is_empty() {
                return Err(AnalysisError::config("locale 不能为空字符串"));
            }
        }
        Ok(())
    }

    /// 合并部分配置；`checks` 按检查标识逐个覆盖
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(locale) = patch.locale {
            self.locale = Some(locale);
        }
        if let Some(use_cornerstone) = patch.use_cornerstone {
            self.use_cornerstone = use_cornerstone;
        }
        if let Some(max) = patch.score_scale_max {
            self.score_scale_max = max;
        }
        if let Some(aggregation) = patch.aggregation {
            self.aggregation = aggregation;
        }
        if let Some(disabled) = patch.disabled_checks {
            self.disabled_checks = disabled;
        }
        if let Some(checks) = patch.checks {
            self.checks.extend(checks);
        }
    }

    /// 某个检查的配置
    pub fn check_options(&self, identifier: &str) -> Option<&JsonValue> {
        self.checks.get(identifier)
    }

    pub fn is_disabled(&self, identifier: &str) -> bool {
        self.disabled_checks.iter().any(|id| id == identifier)
    }
}

/// 部分配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub locale: Option<String>,
    pub use_cornerstone: Option<bool>,
    pub score_scale_max: Option<f64>,
    pub aggregation: Option<AggregationKind>,
    pub disabled_checks: Option<Vec<String>>,
    pub checks: Option<BTreeMap<String, JsonValue>>,
}

/// 程序配置文件
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时分析的内容单元数量
    pub max_concurrent_papers: usize,
    /// TOML 内容单元存放目录
    pub paper_folder: String,
    /// 是否显示详细日志（逐条反馈）
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 要运行的分析通道
    pub lanes: Vec<Lane>,
    /// 分析引擎配置
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_papers: 8,
            paper_folder: "papers".to_string(),
            verbose_logging: false,
            output_log_file: "analysis.log".to_string(),
            lanes: Lane::ALL.to_vec(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_papers: std::env::var("MAX_CONCURRENT_PAPERS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_papers),
            paper_folder: std::env::var("PAPER_FOLDER").unwrap_or(default.paper_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            lanes: std::env::var("ANALYSIS_LANES").ok().map(|v| parse_lanes(&v)).filter(|l| !l.is_empty()).unwrap_or(default.lanes),
            analysis: AnalysisConfig {
                locale: std::env::var("LOCALE").ok().filter(|v| !v.trim().is_empty()),
                use_cornerstone: std::env::var("USE_CORNERSTONE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.analysis.use_cornerstone),
                ..default.analysis
            },
        }
    }

    /// 从 TOML 文件加载，缺失的键取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_papers == 0 {
            return Err(AnalysisError::config("max_concurrent_papers 必须大于 0"));
        }
        if self.lanes.is_empty() {
            return Err(AnalysisError::config("至少需要一个分析通道"));
        }
        self.analysis.validate()
    }
}

fn parse_lanes(raw: &str) -> Vec<Lane> {
    raw.split(',').filter_map(Lane::from_str).collect()
}
