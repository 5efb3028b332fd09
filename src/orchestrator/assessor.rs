//! Assessor - 编排器
//!
//! ## 职责
//!
//! 1. **持有检查注册表**：按注册顺序保存检查单元，运行之间可以增删
//! 2. **运行检查**：只执行适用的检查，单个检查失败不会中断整次分析
//! 3. **结果修改**：在聚合前执行插件钩子
//! 4. **聚合**：计算总分，按分数升序（同分按注册顺序）排列反馈
//!
//! 状态机：`Idle → Running → Aggregated`。`run` 需要 `&mut self`，所以同一个实例不可能重入。

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::checks::Check;
use crate::error::{AnalysisError, ErrorKind, Result};
use crate::models::{AssessmentResult, Diagnostic, Mark, OverallScore, Paper, ResultSet, ScoreScale};
use crate::orchestrator::pluggable::{apply_modifications, ResultModification};
use crate::orchestrator::scoring::{MeanAggregator, ScoreAggregator, WeightedScore};
use crate::research::Researcher;

/// 编排器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessorState {
    Idle,
    Running,
    Aggregated,
}

/// 编排器
#[derive(Clone)]
pub struct Assessor {
    checks: Vec<Arc<dyn Check>>,
    modifications: Vec<ResultModification>,
    scale: ScoreScale,
    aggregator: Arc<dyn ScoreAggregator>,
    state: AssessorState,
}

impl std::fmt::Debug for Assessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assessor")
            .field("checks", &self.checks.iter().map(|c| c.identifier()).collect::<Vec<_>>())
            .field("modifications", &self.modifications)
            .field("scale", &self.scale)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for Assessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Assessor {
    /// 创建空的编排器（默认 0–9 尺度、算术平均）
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            modifications: Vec::new(),
            scale: ScoreScale::default(),
            aggregator: Arc::new(MeanAggregator),
            state: AssessorState::Idle,
        }
    }

    pub fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn ScoreAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    pub fn state(&self) -> AssessorState {
        self.state
    }

    /// 注册检查；标识已存在时不添加并返回 `false`
    pub fn register_check(&mut self, check: Arc<dyn Check>) -> bool {
        if self.has_check(check.identifier()) {
            warn!("⚠️ 检查 {} 已存在，忽略重复注册", check.identifier());
            return false;
        }
        self.checks.push(check);
        true
    }

    /// 移除检查
    pub fn remove_check(&mut self, identifier: &str) -> Option<Arc<dyn Check>> {
        let index = self.checks.iter().position(|c| c.identifier() == identifier)?;
        Some(self.checks.remove(index))
    }

    pub fn has_check(&self, identifier: &str) -> bool {
        self.checks.iter().any(|c| c.identifier() == identifier)
    }

    /// 注册顺序的检查标识
    pub fn check_identifiers(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.identifier()).collect()
    }

    /// 添加结果修改钩子（调用方负责排序）
    pub fn add_modification(&mut self, modification: ResultModification) {
        self.modifications.push(modification);
    }

    /// 运行一次完整分析
    pub fn run(&mut self, paper: &Paper, researcher: &mut Researcher) -> ResultSet {
        let never = AtomicBool::new(false);
        match self.run_with_cancel(paper, researcher, &never) {
            Ok(result_set) => result_set,
            // 取消标志永远为 false，不会走到这里
            Err(_) => ResultSet::empty(self.scale),
        }
    }

    /// 运行一次完整分析；每个检查执行前检查取消标志
    pub fn run_with_cancel(
        &mut self,
        paper: &Paper,
        researcher: &mut Researcher,
        cancel: &AtomicBool,
    ) -> Result<ResultSet> {
        self.state = AssessorState::Running;
        researcher.set_paper(paper.clone());
        let researcher: &Researcher = researcher;

        let mut scored: Vec<(AssessmentResult, f64)> = Vec::new();
        let mut diagnostics = Vec::new();

        for check in &self.checks {
            if cancel.load(Ordering::SeqCst) {
                info!("分析在 {} 之前被取消", check.identifier());
                self.state = AssessorState::Idle;
                return Err(AnalysisError::Cancelled);
            }

            let identifier = check.identifier();
            let outcome = match applicable_isolated(check.as_ref(), paper) {
                Ok(false) => {
                    debug!("检查 {} 不适用，跳过", identifier);
                    continue;
                }
                Ok(true) => execute_isolated(check.as_ref(), paper, researcher),
                Err(e) => Err(e),
            };

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("❌ 检查 {} 执行失败: {}", identifier, e);
                    diagnostics.push(Diagnostic {
                        identifier: identifier.to_string(),
                        kind: ErrorKind::CheckExecution,
                        message: failure_message(e),
                    });
                    continue;
                }
            };

            let result = apply_modifications(&self.modifications, result, paper);
            let Some(score) = result.score else {
                debug!("检查 {} 没有分数，不计入结果", identifier);
                continue;
            };

            let clamped = self.scale.clamp(score);
            if clamped != score {
                warn!(
                    "⚠️ 检查 {} 的分数 {} 超出范围 [0, {}]，已截断",
                    identifier, score, self.scale.max
                );
            }
            let result = AssessmentResult {
                score: Some(clamped),
                ..result
            };
            scored.push((result, check.weight()));
        }

        let result_set = self.aggregate(scored, diagnostics);
        self.state = AssessorState::Aggregated;
        Ok(result_set)
    }

    fn aggregate(&self, scored: Vec<(AssessmentResult, f64)>, diagnostics: Vec<Diagnostic>) -> ResultSet {
        let weighted: Vec<WeightedScore> = scored
            .iter()
            .filter_map(|(r, weight)| {
                r.score.map(|score| WeightedScore {
                    score,
                    weight: *weight,
                })
            })
            .collect();

        let overall = match self.aggregator.aggregate(&weighted) {
            Some(mean) => OverallScore::Scored {
                score: self.scale.round(mean),
                percent: self.scale.to_percent(mean),
            },
            None => OverallScore::NoContent,
        };

        let mut results: Vec<AssessmentResult> = scored.into_iter().map(|(r, _)| r).collect();
        // 稳定排序：同分保持注册顺序
        results.sort_by(|a, b| {
            a.score
                .unwrap_or(0.0)
                .total_cmp(&b.score.unwrap_or(0.0))
        });

        ResultSet {
            results,
            overall,
            scale: self.scale,
            diagnostics,
        }
    }

    /// 重新计算某个检查的高亮片段
    pub fn marks_for(&self, identifier: &str, paper: &Paper, researcher: &mut Researcher) -> Result<Vec<Mark>> {
        let check = self
            .checks
            .iter()
            .find(|c| c.identifier() == identifier)
            .ok_or_else(|| AnalysisError::check_execution(identifier, "未注册的检查"))?;

        researcher.set_paper(paper.clone());
        if !applicable_isolated(check.as_ref(), paper)? {
            return Ok(Vec::new());
        }
        check.marks(paper, researcher)
    }
}

/// 适用性判断，panic 转换为 `CheckExecution`
fn applicable_isolated(check: &dyn Check, paper: &Paper) -> Result<bool> {
    catch_unwind(AssertUnwindSafe(|| check.is_applicable(paper)))
        .map_err(|panic| AnalysisError::check_execution(check.identifier(), panic_message(panic.as_ref())))
}

/// 执行单个检查，把返回的错误和 panic 都转换为 `CheckExecution`
fn execute_isolated(check: &dyn Check, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
    let identifier = check.identifier();
    let outcome = catch_unwind(AssertUnwindSafe(|| check.execute(paper, researcher)));

    let mut result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(AnalysisError::CheckExecution { message, .. })) => {
            return Err(AnalysisError::check_execution(identifier, message))
        }
        Ok(Err(e)) => return Err(AnalysisError::check_execution(identifier, e.to_string())),
        Err(panic) => return Err(AnalysisError::check_execution(identifier, panic_message(panic.as_ref()))),
    };

    if result.identifier != identifier {
        debug!("结果标识 {} 与检查 {} 不一致，已修正", result.identifier, identifier);
        result.identifier = identifier.to_string();
    }
    Ok(result)
}

/// panic 负载中的文本
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

/// 诊断中只保留失败原因，检查标识已在 `Diagnostic::identifier` 中
fn failure_message(err: AnalysisError) -> String {
    match err {
        AnalysisError::CheckExecution { message, .. } => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// 固定分数的检查，记录 execute 调用次数
    struct Fixed {
        id: &'static str,
        score: Option<f64>,
        needs_text: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(id: &'static str, score: Option<f64>) -> Self {
            Self {
                id,
                score,
                needs_text: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Check for Fixed {
        fn identifier(&self) -> &str {
            self.id
        }
        fn is_applicable(&self, paper: &Paper) -> bool {
            !self.needs_text || paper.has_text()
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = AssessmentResult::new(self.id).with_text(self.id);
            Ok(match self.score {
                Some(score) => result.with_score(score),
                None => result,
            })
        }
    }

    struct Failing;

    impl Check for Failing {
        fn identifier(&self) -> &str {
            "test/failing"
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            true
        }
        fn execute(&self, _: &Paper, researcher: &Researcher) -> Result<AssessmentResult> {
            researcher.get("not-registered")?;
            Ok(AssessmentResult::new("test/failing"))
        }
    }

    struct Panicking;

    impl Check for Panicking {
        fn identifier(&self) -> &str {
            "test/panicking"
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            true
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            panic!("boom")
        }
    }

    #[test]
    fn test_ordering_ascending_with_stable_ties() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(Fixed::new("a", Some(9.0))));
        assessor.register_check(Arc::new(Fixed::new("b", Some(3.0))));
        assessor.register_check(Arc::new(Fixed::new("c", Some(9.0))));
        assessor.register_check(Arc::new(Fixed::new("d", Some(3.0))));
        assessor.register_check(Arc::new(Fixed::new("e", None)));

        let result_set = assessor.run(&Paper::new("text"), &mut Researcher::new());
        let order: Vec<&str> = result_set.results.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
        assert_eq!(result_set.overall, OverallScore::Scored { score: 6.0, percent: 67 });
        assert_eq!(assessor.state(), AssessorState::Aggregated);
    }

    #[test]
    fn test_inapplicable_checks_never_execute() {
        let check = Fixed {
            needs_text: true,
            ..Fixed::new("needs-text", Some(9.0))
        };
        let calls = check.calls.clone();
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(check));

        let result_set = assessor.run(&Paper::builder("").keyphrase("cats").build(), &mut Researcher::new());
        assert!(result_set.is_empty());
        assert!(result_set.overall.is_no_content());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failures_are_isolated() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(Failing));
        assessor.register_check(Arc::new(Panicking));
        assessor.register_check(Arc::new(Fixed::new("ok", Some(7.0))));

        let result_set = assessor.run(&Paper::new("text"), &mut Researcher::new());
        assert_eq!(result_set.len(), 1);
        assert_eq!(result_set.overall.score(), Some(7.0));
        let failed: Vec<&str> = result_set.diagnostics.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(failed, vec!["test/failing", "test/panicking"]);
        assert!(result_set.diagnostics.iter().all(|d| d.kind == ErrorKind::CheckExecution));
    }

    struct PanicsWhenAsked;

    impl Check for PanicsWhenAsked {
        fn identifier(&self) -> &str {
            "test/applicability"
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            panic!("applicability boom")
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            Ok(AssessmentResult::new("test/applicability").with_score(9.0))
        }
    }

    #[test]
    fn test_applicability_panic_is_isolated() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(PanicsWhenAsked));
        assessor.register_check(Arc::new(Fixed::new("ok", Some(5.0))));

        let result_set = assessor.run(&Paper::new("text"), &mut Researcher::new());
        assert_eq!(result_set.len(), 1);
        assert_eq!(result_set.results[0].identifier, "ok");
        assert_eq!(result_set.overall.score(), Some(5.0));
        assert_eq!(result_set.diagnostics.len(), 1);
        assert_eq!(result_set.diagnostics[0].identifier, "test/applicability");
        assert_eq!(result_set.diagnostics[0].message, "applicability boom");
        assert_eq!(assessor.state(), AssessorState::Aggregated);

        let err = assessor
            .marks_for("test/applicability", &Paper::new("text"), &mut Researcher::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CheckExecution);
    }

    #[test]
    fn test_register_and_remove() {
        let mut assessor = Assessor::new();
        assert!(assessor.register_check(Arc::new(Fixed::new("a", Some(1.0)))));
        assert!(!assessor.register_check(Arc::new(Fixed::new("a", Some(2.0)))));
        assert!(assessor.register_check(Arc::new(Fixed::new("b", Some(2.0)))));
        assert!(assessor.remove_check("a").is_some());
        assert!(assessor.remove_check("a").is_none());
        assert_eq!(assessor.check_identifiers(), vec!["b"]);
    }

    #[test]
    fn test_scores_are_clamped() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(Fixed::new("high", Some(42.0))));
        let result_set = assessor.run(&Paper::new("text"), &mut Researcher::new());
        assert_eq!(result_set.results[0].score, Some(9.0));
    }

    #[test]
    fn test_cancelled_run() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(Fixed::new("a", Some(1.0))));
        let cancel = AtomicBool::new(true);
        let err = assessor
            .run_with_cancel(&Paper::new("text"), &mut Researcher::new(), &cancel)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
        assert_eq!(assessor.state(), AssessorState::Idle);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut assessor = Assessor::new();
        assessor.register_check(Arc::new(Fixed::new("a", Some(4.0))));
        assessor.register_check(Arc::new(Fixed::new("b", Some(8.0))));
        let paper = Paper::new("text");
        let mut researcher = Researcher::new();
        let first = assessor.run(&paper, &mut researcher);
        let second = assessor.run(&paper, &mut researcher);
        assert_eq!(first, second);
    }
}
