//! 批量内容分析程序 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责批量内容单元的分析与统计。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建日志文件、准备扩展注册表
//! 2. **批量加载**：扫描并加载所有待分析的内容单元（`Vec<LoadedPaper>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将内容单元分批次处理，每批完成后再开始下一批
//! 5. **全局统计**：汇总所有内容单元的分析结果
//!
//! 每个并发任务拥有自己的 worker：同一个 worker 的通道只保留最新请求，
//! 多个内容单元共用一个 worker 会互相取代。

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_all_papers, LoadedPaper};
use crate::orchestrator::Pluggable;
use crate::utils::logging::{
    append_to_log, format_result_set, init_log_file, log_batch_complete, log_batch_start, log_papers_loaded,
    log_startup, print_final_stats,
};
use crate::worker::{AnalysisWorker, WorkerClient};

/// 应用主结构
pub struct App {
    config: Config,
    pluggable: Pluggable,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        Self::with_pluggable(config, Pluggable::new()).await
    }

    /// 使用自定义扩展注册表初始化
    pub async fn with_pluggable(config: Config, pluggable: Pluggable) -> Result<Self> {
        config.validate()?;
        init_log_file(&config.output_log_file)?;

        let lanes: Vec<String> = config.lanes.iter().map(|l| l.to_string()).collect();
        log_startup(config.max_concurrent_papers, &lanes);

        Ok(Self { config, pluggable })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待分析的内容单元...");
        let all_papers = load_all_papers(&self.config.paper_folder).await?;

        if all_papers.is_empty() {
            warn!("⚠️ 没有找到待分析的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        log_papers_loaded(all_papers.len(), self.config.max_concurrent_papers);
        let stats = self.process_all_papers(all_papers).await?;

        print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            stats.average_percent(),
            &self.config.output_log_file,
        );
        Ok(stats)
    }

    /// 分批处理所有内容单元
    async fn process_all_papers(&self, all_papers: Vec<LoadedPaper>) -> Result<ProcessingStats> {
        let batch_size = self.config.max_concurrent_papers;
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total_papers = all_papers.len();
        let total_batches = total_papers.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total: total_papers,
            ..Default::default()
        };

        for (batch_index, batch) in all_papers.chunks(batch_size).enumerate() {
            let batch_start = batch_index * batch_size;
            log_batch_start(
                batch_index + 1,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total_papers,
            );

            let outcomes = self.process_batch(batch, batch_start, semaphore.clone()).await?;
            let batch_success = outcomes.iter().filter(|o| o.is_some()).count();
            for percents in outcomes.into_iter().flatten() {
                stats.success += 1;
                stats.percents.extend(percents);
            }
            stats.failed += batch.len() - batch_success;

            log_batch_complete(batch_index + 1, batch_success, batch.len());
        }

        Ok(stats)
    }

    /// 处理单个批次；每个内容单元返回各通道的展示分数，失败为 `None`
    async fn process_batch(
        &self,
        batch: &[LoadedPaper],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<Option<Vec<u8>>>> {
        let mut handles = Vec::new();

        for (idx, loaded) in batch.iter().enumerate() {
            let paper_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let loaded = loaded.clone();
            let config = self.config.clone();
            let pluggable = self.pluggable.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                match analyze_paper(&loaded, &config, pluggable).await {
                    Ok(percents) => Some(percents),
                    Err(e) => {
                        error!("[内容 {}] ❌ {} 分析失败: {}", paper_index, loaded.file_name(), e);
                        None
                    }
                }
            });
            handles.push(handle);
        }

        // 等待本批所有任务完成
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(idx, joined)| {
                joined.unwrap_or_else(|e| {
                    error!("[内容 {}] 任务执行失败: {}", batch_start + idx + 1, e);
                    None
                })
            })
            .collect();
        Ok(outcomes)
    }
}

/// 用独立的 worker 分析一个内容单元的所有通道
async fn analyze_paper(loaded: &LoadedPaper, config: &Config, pluggable: Pluggable) -> Result<Vec<u8>> {
    let client = WorkerClient::spawn(AnalysisWorker::new(pluggable));
    client.initialize(config.analysis.clone()).await?;

    let name = loaded.file_name();
    let mut percents = Vec::new();
    for &lane in &config.lanes {
        let Some(result_set) = client.analyze(lane, loaded.paper.clone()).await? else {
            warn!("⚠️ {} 的 {} 分析被取代", name, lane);
            continue;
        };

        let report = format_result_set(&name, lane.name(), &result_set);
        if config.verbose_logging {
            info!("{}", report);
        } else {
            info!(
                "[{}] {} 总分: {:?}",
                name,
                lane,
                result_set.overall.percent()
            );
        }
        if result_set.has_diagnostics() {
            warn!("⚠️ {} 有 {} 个检查执行失败", name, result_set.diagnostics.len());
        }
        append_to_log(&config.output_log_file, &report)?;
        percents.extend(result_set.overall.percent());
    }

    client.shutdown().await;
    Ok(percents)
}

/// 分析统计
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    /// 所有通道的展示分数（无内容的通道不计入）
    pub percents: Vec<u8>,
}

impl ProcessingStats {
    /// 平均展示分数
    pub fn average_percent(&self) -> Option<f64> {
        if self.percents.is_empty() {
            return None;
        }
        let total: f64 = self.percents.iter().map(|&p| f64::from(p)).sum();
        Some(total / self.percents.len() as f64)
    }
}
