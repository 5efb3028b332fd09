//! WorkerClient - 请求方
//!
//! 负责分配请求 ID、记录每个通道的最新请求，并把响应路由回对应的等待者。
//! 不是最新请求的响应一律丢弃，即使 worker 已经发出。

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, ConfigPatch};
use crate::error::{AnalysisError, Result};
use crate::models::{Lane, Paper, ResultSet};
use crate::worker::analysis_worker::AnalysisWorker;
use crate::worker::protocol::{error_from_wire, RequestId, WorkerRequest, WorkerResponse};

type AnalysisReply = oneshot::Sender<Result<Option<ResultSet>>>;
type ResearchReply = oneshot::Sender<Result<JsonValue>>;

enum Waiter {
    Analysis { lane: Lane, reply: AnalysisReply },
    Research { reply: ResearchReply },
}

#[derive(Default)]
struct RouterState {
    latest: HashMap<Lane, RequestId>,
    waiters: HashMap<RequestId, Waiter>,
    ready: Option<oneshot::Sender<Result<()>>>,
}

/// 已提交的分析请求
pub struct AnalysisTicket {
    pub request_id: RequestId,
    pub lane: Lane,
    reply: oneshot::Receiver<Result<Option<ResultSet>>>,
}

impl AnalysisTicket {
    /// 等待结果；请求被取代或取消时返回 `None`
    pub async fn wait(self) -> Result<Option<ResultSet>> {
        self.reply
            .await
            .map_err(|_| AnalysisError::protocol("worker 已停止"))?
    }
}

/// worker 的请求方
pub struct WorkerClient {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    state: Arc<Mutex<RouterState>>,
    next_id: AtomicU64,
    worker: JoinHandle<()>,
    router: JoinHandle<()>,
}

impl WorkerClient {
    /// 启动 worker 并连接
    pub fn spawn(worker: AnalysisWorker) -> Self {
        let channel = worker.spawn();
        let state = Arc::new(Mutex::new(RouterState::default()));
        let router = tokio::spawn(route_responses(channel.responses, state.clone()));

        Self {
            requests: channel.requests,
            state,
            next_id: AtomicU64::new(0),
            worker: channel.handle,
            router,
        }
    }

    fn send(&self, request: WorkerRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| AnalysisError::protocol("worker 已停止"))
    }

    fn next_request_id(&self) -> RequestId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 初始化 worker，等待 `ready`
    pub async fn initialize(&self, configuration: AnalysisConfig) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().await.ready = Some(tx);
        self.send(WorkerRequest::Initialize { configuration })?;
        rx.await.map_err(|_| AnalysisError::protocol("worker 已停止"))?
    }

    /// 部分更新配置（之后提交的请求生效）
    pub fn update_configuration(&self, patch: ConfigPatch) -> Result<()> {
        self.send(WorkerRequest::UpdateConfiguration { patch })
    }

    /// 提交分析请求；同一通道中尚未完成的旧请求立即以 `None` 结束
    pub async fn submit(&self, lane: Lane, paper: Paper) -> Result<AnalysisTicket> {
        let (tx, rx) = oneshot::channel();
        let request_id = {
            let mut state = self.state.lock().await;
            let request_id = self.next_request_id();
            if let Some(previous) = state.latest.insert(lane, request_id) {
                if let Some(Waiter::Analysis { reply, .. }) = state.waiters.remove(&previous) {
                    debug!("通道 {} 的请求 #{} 被 #{} 取代", lane, previous, request_id);
                    let _ = reply.send(Ok(None));
                }
            }
            state.waiters.insert(request_id, Waiter::Analysis { lane, reply: tx });
            // 持锁发送，保证 ID 顺序与消息顺序一致
            self.send(WorkerRequest::Analyze {
                request_id,
                lane,
                paper,
            })?;
            request_id
        };

        Ok(AnalysisTicket {
            request_id,
            lane,
            reply: rx,
        })
    }

    /// 提交并等待结果
    pub async fn analyze(&self, lane: Lane, paper: Paper) -> Result<Option<ResultSet>> {
        self.submit(lane, paper).await?.wait().await
    }

    /// 取消请求；等待者立即得到 `None`
    pub async fn cancel(&self, request_id: RequestId) -> Result<()> {
        if let Some(Waiter::Analysis { reply, .. }) = self.state.lock().await.waiters.remove(&request_id) {
            let _ = reply.send(Ok(None));
        }
        self.send(WorkerRequest::Cancel { request_id })
    }

    /// 在 worker 中执行单个计算
    pub async fn run_research(&self, name: impl Into<String>, paper: Paper) -> Result<JsonValue> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            let request_id = self.next_request_id();
            state.waiters.insert(request_id, Waiter::Research { reply: tx });
            self.send(WorkerRequest::RunResearch {
                request_id,
                name: name.into(),
                paper,
            })?;
        }
        rx.await.map_err(|_| AnalysisError::protocol("worker 已停止"))?
    }

    /// 关闭请求 channel，等待 worker 与路由任务退出
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.worker.await {
            warn!("⚠️ worker 任务异常结束: {}", e);
        }
        if let Err(e) = self.router.await {
            warn!("⚠️ 路由任务异常结束: {}", e);
        }
        info!("worker 连接已关闭");
    }
}

async fn route_responses(mut responses: mpsc::UnboundedReceiver<WorkerResponse>, state: Arc<Mutex<RouterState>>) {
    while let Some(response) = responses.recv().await {
        let mut state = state.lock().await;
        match response {
            WorkerResponse::Ready => match state.ready.take() {
                Some(ready) => {
                    let _ = ready.send(Ok(()));
                }
                None => debug!("收到未等待的 ready"),
            },
            WorkerResponse::Result {
                request_id,
                lane,
                result_set,
            } => {
                if state.latest.get(&lane) != Some(&request_id) {
                    debug!("{}，丢弃", AnalysisError::StaleResponse { request_id, lane });
                    continue;
                }
                match state.waiters.remove(&request_id) {
                    Some(Waiter::Analysis { reply, .. }) => {
                        let _ = reply.send(Ok(Some(result_set)));
                    }
                    Some(other) => {
                        state.waiters.insert(request_id, other);
                        warn!("⚠️ 请求 #{} 的响应类型不匹配", request_id);
                    }
                    None => debug!("请求 #{} 的重复响应，丢弃", request_id),
                }
            }
            WorkerResponse::Research { request_id, value } => match state.waiters.remove(&request_id) {
                Some(Waiter::Research { reply }) => {
                    let _ = reply.send(Ok(value));
                }
                Some(other) => {
                    state.waiters.insert(request_id, other);
                    warn!("⚠️ 请求 #{} 的响应类型不匹配", request_id);
                }
                None => debug!("请求 #{} 的重复响应，丢弃", request_id),
            },
            WorkerResponse::Error {
                request_id: Some(request_id),
                kind,
                identifier,
                message,
            } => {
                let err = error_from_wire(kind, identifier, message);
                match state.waiters.remove(&request_id) {
                    Some(Waiter::Analysis { lane, reply }) => {
                        if state.latest.get(&lane) == Some(&request_id) {
                            let _ = reply.send(Err(err));
                        } else {
                            let _ = reply.send(Ok(None));
                        }
                    }
                    Some(Waiter::Research { reply }) => {
                        let _ = reply.send(Err(err));
                    }
                    None => debug!("请求 #{} 的错误已无人等待: {}", request_id, err),
                }
            }
            WorkerResponse::Error {
                request_id: None,
                kind,
                identifier,
                message,
            } => {
                let err = error_from_wire(kind, identifier, message);
                match state.ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(err));
                    }
                    None => warn!("⚠️ worker 报告错误: {}", err),
                }
            }
        }
    }
    debug!("worker 响应 channel 已关闭");
}
