//! # Content Assessor
//!
//! 一个可扩展的文本内容分析引擎：对一段文本运行一组独立的检查单元，
//! 汇总成带总分、按优先级排列的反馈列表。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 内容单元 `Paper`、检查结果、结果集、评分尺度、分析通道
//!
//! ### ② 共享计算层（Research）
//! - `research/` - `Researcher` 按名称注册计算，并为单个内容单元缓存结果
//!
//! ### ③ 检查单元层（Checks）
//! - `checks/` - `Check` 接口与内置检查，每个检查只描述一条评分规则
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/assessor` - 运行适用的检查、隔离失败、聚合总分
//! - `orchestrator/pluggable` - 插件扩展注册表
//! - `orchestrator/batch_processor` - 批量分析程序
//!
//! ### ⑤ Worker 层
//! - `worker/` - 基于消息的隔离执行：请求 ID、通道取代、取消与配置更新
//!
//! ## 模块结构

pub mod checks;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod research;
pub mod utils;
pub mod worker;

// 重新导出常用类型
pub use checks::Check;
pub use config::{AnalysisConfig, Config, ConfigPatch};
pub use error::{AnalysisError, ErrorKind, Result};
pub use i18n::{DefaultTranslator, Translator};
pub use models::{AssessmentResult, Lane, Mark, OverallScore, Paper, Rating, ResultSet, ScoreScale};
pub use orchestrator::{App, Assessor, Pluggable};
pub use research::Researcher;
pub use worker::{AnalysisWorker, WorkerClient, WorkerRequest, WorkerResponse};
