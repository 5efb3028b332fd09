//! AnalysisWorker - 隔离执行上下文
//!
//! ## 职责
//!
//! 1. 接收请求消息，按通道调度分析任务
//! 2. 每个通道同时只运行一个分析，另有一个等待位；新请求取代等待位中的旧请求
//! 3. 已被取代或取消的请求即使算完，结果也不会发出
//! 4. 任何检查或计算的失败都转换为消息，worker 继续服务后续请求
//!
//! 分析本身是同步的 CPU 计算，放在 `spawn_blocking` 中执行；
//! 每个任务拿到通道模板编排器和 Researcher 的独立副本，与 worker 不共享可变状态。

use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{Id as TaskId, JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{AnalysisConfig, ConfigPatch};
use crate::error::{AnalysisError, Result};
use crate::i18n::{DefaultTranslator, Translator};
use crate::models::{Lane, Paper, ResultSet};
use crate::orchestrator::assessor::panic_message;
use crate::orchestrator::{Assessor, Pluggable};
use crate::research::Researcher;
use crate::worker::protocol::{RequestId, WorkerRequest, WorkerResponse};

/// 已初始化的分析会话
struct Session {
    config: AnalysisConfig,
    templates: HashMap<Lane, Assessor>,
}

struct RunningJob {
    request_id: RequestId,
    cancel: Arc<AtomicBool>,
}

struct PendingJob {
    request_id: RequestId,
    paper: Paper,
}

/// 单个通道的调度状态
#[derive(Default)]
struct LaneState {
    latest: Option<RequestId>,
    running: Option<RunningJob>,
    pending: Option<PendingJob>,
}

/// 任务属于哪个请求，任务异常结束时据此恢复调度状态
#[derive(Debug, Clone, Copy)]
enum JobSlot {
    Analysis(Lane),
    Research(RequestId),
}

enum JobOutcome {
    Analysis {
        lane: Lane,
        request_id: RequestId,
        outcome: Result<ResultSet>,
    },
    Research {
        request_id: RequestId,
        outcome: Result<JsonValue>,
    },
}

/// worker 的两端 channel 与任务句柄
pub struct WorkerChannel {
    pub requests: mpsc::UnboundedSender<WorkerRequest>,
    pub responses: mpsc::UnboundedReceiver<WorkerResponse>,
    pub handle: JoinHandle<()>,
}

/// 分析 worker
pub struct AnalysisWorker {
    pluggable: Pluggable,
    translator: Arc<dyn Translator>,
    researcher: Researcher,
    session: Option<Session>,
    lanes: HashMap<Lane, LaneState>,
    /// 进行中的计算请求，完成后移除
    research_in_flight: HashSet<RequestId>,
    jobs_by_task: HashMap<TaskId, JobSlot>,
}

impl AnalysisWorker {
    /// 使用内置计算的 worker
    pub fn new(pluggable: Pluggable) -> Self {
        Self {
            pluggable,
            translator: Arc::new(DefaultTranslator::new()),
            researcher: Researcher::with_default_researches(),
            session: None,
            lanes: HashMap::new(),
            research_in_flight: HashSet::new(),
            jobs_by_task: HashMap::new(),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// 替换计算注册表（例如换一个分词器）
    pub fn with_researcher(mut self, researcher: Researcher) -> Self {
        self.researcher = researcher;
        self
    }

    /// 在后台任务中启动 worker
    pub fn spawn(self) -> WorkerChannel {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.serve(request_rx, response_tx));
        WorkerChannel {
            requests: request_tx,
            responses: response_rx,
            handle,
        }
    }

    /// 消息循环：请求 channel 关闭后，把进行中和等待中的任务跑完再退出
    pub async fn serve(
        mut self,
        mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
        responses: mpsc::UnboundedSender<WorkerResponse>,
    ) {
        info!("🚀 分析 worker 启动");
        let mut jobs: JoinSet<JobOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                // 先处理已到达的请求，保证后来的请求能在旧任务交付前将其取代
                biased;

                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request, &mut jobs, &responses),
                    None => break,
                },
                Some(joined) = jobs.join_next_with_id(), if !jobs.is_empty() => {
                    self.handle_joined(joined, &mut jobs, &responses);
                }
            }
        }

        while let Some(joined) = jobs.join_next_with_id().await {
            self.handle_joined(joined, &mut jobs, &responses);
        }
        info!("分析 worker 已停止");
    }

    fn handle_request(
        &mut self,
        request: WorkerRequest,
        jobs: &mut JoinSet<JobOutcome>,
        responses: &mpsc::UnboundedSender<WorkerResponse>,
    ) {
        match request {
            WorkerRequest::Initialize { configuration } => match self.initialize(configuration) {
                Ok(()) => send(responses, WorkerResponse::Ready),
                Err(e) => {
                    error!("❌ worker 初始化失败: {}", e);
                    send(responses, WorkerResponse::error(None, &e));
                }
            },
            WorkerRequest::UpdateConfiguration { patch } => {
                if let Err(e) = self.update_configuration(patch) {
                    warn!("⚠️ 配置更新失败，保留原配置: {}", e);
                    send(responses, WorkerResponse::error(None, &e));
                }
            }
            WorkerRequest::Analyze {
                request_id,
                lane,
                paper,
            } => {
                if let Err(e) = self.accept_analysis(request_id, lane, paper, jobs) {
                    warn!("⚠️ 拒绝请求 #{}: {}", request_id, e);
                    send(responses, WorkerResponse::error(Some(request_id), &e));
                }
            }
            WorkerRequest::Cancel { request_id } => self.cancel(request_id),
            WorkerRequest::RunResearch {
                request_id,
                name,
                paper,
            } => {
                if !self.research_in_flight.insert(request_id) {
                    debug!("重复的请求 #{}，忽略", request_id);
                    return;
                }
                let researcher = self.researcher.for_paper(self.localize(paper));
                let task = jobs.spawn_blocking(move || JobOutcome::Research {
                    request_id,
                    outcome: isolate("research", || researcher.get(&name)),
                });
                self.jobs_by_task.insert(task.id(), JobSlot::Research(request_id));
            }
        }
    }

    fn initialize(&mut self, config: AnalysisConfig) -> Result<()> {
        let templates = self.build_templates(&config)?;
        info!(
            "✓ worker 初始化完成 (locale: {:?}, cornerstone: {})",
            config.locale, config.use_cornerstone
        );
        self.session = Some(Session { config, templates });
        Ok(())
    }

    fn update_configuration(&mut self, patch: ConfigPatch) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AnalysisError::protocol("update_configuration 早于 initialize"))?;

        let mut config = session.config.clone();
        config.apply(patch);
        let templates = self.build_templates(&config)?;
        info!("✓ 配置已更新，新请求使用新配置");
        self.session = Some(Session { config, templates });
        Ok(())
    }

    fn build_templates(&self, config: &AnalysisConfig) -> Result<HashMap<Lane, Assessor>> {
        Lane::ALL
            .iter()
            .map(|&lane| {
                let assessor = Assessor::for_lane(lane, config, &self.pluggable, self.translator.clone())?;
                Ok((lane, assessor))
            })
            .collect()
    }

    /// 配置中的 locale 覆盖内容单元自带的 locale
    fn localize(&self, paper: Paper) -> Paper {
        match self.session.as_ref().and_then(|s| s.config.locale.as_deref()) {
            Some(locale) if locale != paper.locale() => paper.with_locale(locale),
            _ => paper,
        }
    }

    fn accept_analysis(
        &mut self,
        request_id: RequestId,
        lane: Lane,
        paper: Paper,
        jobs: &mut JoinSet<JobOutcome>,
    ) -> Result<()> {
        if self.session.is_none() {
            return Err(AnalysisError::protocol("analyze 早于 initialize"));
        }
        let paper = self.localize(paper);
        let state = self.lanes.entry(lane).or_default();
        match state.latest {
            Some(latest) if request_id == latest => {
                debug!("重复的请求 #{}，忽略", request_id);
                return Ok(());
            }
            Some(latest) if request_id < latest => {
                return Err(AnalysisError::protocol(format!(
                    "请求 #{} 早于通道 {} 的最新请求 #{}",
                    request_id, lane, latest
                )));
            }
            _ => {}
        }
        state.latest = Some(request_id);

        if let Some(running) = &state.running {
            // 协作式取消：运行中的任务在下一个检查之前停止
            running.cancel.store(true, Ordering::SeqCst);
            if let Some(old) = state.pending.replace(PendingJob { request_id, paper }) {
                debug!("[通道 {} #{}] 被 #{} 取代", lane, old.request_id, request_id);
            }
            return Ok(());
        }

        self.start_analysis(lane, request_id, paper, jobs);
        Ok(())
    }

    fn start_analysis(&mut self, lane: Lane, request_id: RequestId, paper: Paper, jobs: &mut JoinSet<JobOutcome>) {
        let Some(template) = self.session.as_ref().and_then(|s| s.templates.get(&lane)) else {
            return;
        };
        let mut assessor = template.clone();
        let mut researcher = self.researcher.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();

        debug!("[通道 {} #{}] 开始分析", lane, request_id);
        let task = jobs.spawn_blocking(move || JobOutcome::Analysis {
            lane,
            request_id,
            outcome: isolate("assessor", || assessor.run_with_cancel(&paper, &mut researcher, &flag)),
        });
        self.jobs_by_task.insert(task.id(), JobSlot::Analysis(lane));

        self.lanes.entry(lane).or_default().running = Some(RunningJob { request_id, cancel });
    }

    fn cancel(&mut self, request_id: RequestId) {
        for (lane, state) in self.lanes.iter_mut() {
            if state.pending.as_ref().map(|p| p.request_id) == Some(request_id) {
                state.pending = None;
                info!("取消通道 {} 等待中的请求 #{}", lane, request_id);
                return;
            }
            if let Some(running) = state.running.as_ref().filter(|r| r.request_id == request_id) {
                running.cancel.store(true, Ordering::SeqCst);
                info!("取消通道 {} 运行中的请求 #{}", lane, request_id);
                return;
            }
        }
        debug!("请求 #{} 不在进行中，取消被忽略", request_id);
    }

    fn handle_joined(
        &mut self,
        joined: std::result::Result<(TaskId, JobOutcome), JoinError>,
        jobs: &mut JoinSet<JobOutcome>,
        responses: &mpsc::UnboundedSender<WorkerResponse>,
    ) {
        let outcome = match joined {
            Ok((task, outcome)) => {
                self.jobs_by_task.remove(&task);
                outcome
            }
            Err(e) => {
                // isolate 已经捕获 panic，这里只会是任务被中止
                error!("❌ 分析任务异常结束: {}", e);
                self.recover_aborted(e, jobs, responses);
                return;
            }
        };

        match outcome {
            JobOutcome::Research { request_id, outcome } => {
                self.research_in_flight.remove(&request_id);
                match outcome {
                    Ok(value) => send(responses, WorkerResponse::Research { request_id, value }),
                    Err(e) => send(responses, WorkerResponse::error(Some(request_id), &e)),
                }
            }
            JobOutcome::Analysis {
                lane,
                request_id,
                outcome,
            } => {
                let state = self.lanes.entry(lane).or_default();
                let cancelled = state
                    .running
                    .take()
                    .map_or(false, |r| r.cancel.load(Ordering::SeqCst));

                if cancelled || Some(request_id) != state.latest {
                    let stale = AnalysisError::StaleResponse { request_id, lane };
                    debug!("{}，不发送", stale);
                } else {
                    match outcome {
                        Ok(result_set) => {
                            info!(
                                "[通道 {} #{}] ✓ 完成: {} 条反馈, 总分 {:?}",
                                lane,
                                request_id,
                                result_set.len(),
                                result_set.overall.percent()
                            );
                            send(
                                responses,
                                WorkerResponse::Result {
                                    request_id,
                                    lane,
                                    result_set,
                                },
                            );
                        }
                        Err(AnalysisError::Cancelled) => debug!("请求 #{} 已取消", request_id),
                        Err(e) => send(responses, WorkerResponse::error(Some(request_id), &e)),
                    }
                }

                if let Some(next) = state.pending.take() {
                    self.start_analysis(lane, next.request_id, next.paper, jobs);
                }
            }
        }
    }

    /// 任务被中止：释放它占用的通道，最新请求得到 `error`，等待位中的请求照常开始
    fn recover_aborted(
        &mut self,
        e: JoinError,
        jobs: &mut JoinSet<JobOutcome>,
        responses: &mpsc::UnboundedSender<WorkerResponse>,
    ) {
        let failure = AnalysisError::check_execution("worker", e.to_string());
        match self.jobs_by_task.remove(&e.id()) {
            Some(JobSlot::Research(request_id)) => {
                self.research_in_flight.remove(&request_id);
                send(responses, WorkerResponse::error(Some(request_id), &failure));
            }
            Some(JobSlot::Analysis(lane)) => {
                let state = self.lanes.entry(lane).or_default();
                if let Some(running) = state.running.take() {
                    let cancelled = running.cancel.load(Ordering::SeqCst);
                    if !cancelled && Some(running.request_id) == state.latest {
                        send(responses, WorkerResponse::error(Some(running.request_id), &failure));
                    }
                }
                if let Some(next) = state.pending.take() {
                    self.start_analysis(lane, next.request_id, next.paper, jobs);
                }
            }
            None => warn!("⚠️ 未知任务 {} 异常结束", e.id()),
        }
    }
}

/// 把任务中的 panic 转换为 `CheckExecution` 错误
fn isolate<T>(identifier: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|panic| Err(AnalysisError::check_execution(identifier, panic_message(panic.as_ref()))))
}

fn send(responses: &mpsc::UnboundedSender<WorkerResponse>, response: WorkerResponse) {
    if responses.send(response).is_err() {
        debug!("请求方已断开，响应被丢弃");
    }
}
