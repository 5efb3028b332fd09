//! 共享计算层（Research）
//!
//! ## 职责
//!
//! - `Researcher`：计算注册表 + 单个内容单元的结果缓存
//! - `builtins`：内置的文本计算（去 HTML、分词、分句、关键词统计、列表检测）
//!
//! 检查单元只通过名称读取计算结果，不直接依赖具体的分词实现。

pub mod builtins;
pub mod researcher;

pub use builtins::register_defaults;
pub use researcher::{ResearchFn, ResearchValue, Researcher};
