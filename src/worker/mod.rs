//! Worker 层（隔离执行）
//!
//! ## 模块划分
//!
//! - `protocol`：请求 / 响应消息（可序列化为 JSON）
//! - `analysis_worker`：执行上下文，按通道调度分析任务
//! - `client`：请求方，分配请求 ID 并丢弃过期响应
//!
//! ## 消息流
//!
//! ```text
//! WorkerClient ──WorkerRequest──▶ AnalysisWorker ──▶ Assessor (spawn_blocking)
//!      ▲                                │
//!      └──────────WorkerResponse────────┘
//! ```
//!
//! 两端只通过 channel 通信，跨越边界的数据全部按值复制。

pub mod analysis_worker;
pub mod client;
pub mod protocol;

pub use analysis_worker::{AnalysisWorker, WorkerChannel};
pub use client::{AnalysisTicket, WorkerClient};
pub use protocol::{RequestId, WorkerRequest, WorkerResponse};
