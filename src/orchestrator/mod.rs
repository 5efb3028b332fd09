//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层把检查单元组织成一次完整的分析，是整个引擎的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `assessor` - 编排器
//! - 持有有序的检查注册表
//! - 运行适用的检查，隔离单个检查的失败
//! - 聚合总分，按分数升序输出反馈
//!
//! ### `pluggable` - 扩展注册表
//! - 插件生命周期（注册 → 就绪）
//! - 新增、替换、禁用检查
//! - 结果修改钩子
//!
//! ### `profiles` - 通道配置
//! - 按通道与配置装配编排器
//!
//! ### `scoring` - 总分聚合
//!
//! ### `batch_processor` - 批量分析程序
//! - 扫描内容单元目录，通过 worker 并发分析
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Paper>)
//!     ↓
//! worker::WorkerClient → worker::AnalysisWorker
//!     ↓
//! Assessor (处理单个 Paper)
//!     ↓
//! checks (单条评分规则) → research (共享计算)
//! ```

pub mod assessor;
pub mod batch_processor;
pub mod pluggable;
pub mod profiles;
pub mod scoring;

// 重新导出主要类型
pub use assessor::{Assessor, AssessorState};
pub use batch_processor::App;
pub use pluggable::{apply_modifications, PluginStatus, Pluggable, ResultModification};
pub use profiles::builtin_identifiers;
pub use scoring::{AggregationKind, MeanAggregator, ScoreAggregator, WeightedMeanAggregator, WeightedScore};
