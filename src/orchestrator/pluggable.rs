//! Pluggable - 扩展注册表
//!
//! 外部代码通过插件名注册：
//! - 新的检查单元（标识必须以 `插件名/` 开头）
//! - 替换或禁用内置检查
//! - 结果修改钩子（检查产生结果之后、聚合之前执行）
//!
//! 只有进入 `Ready` 状态的插件，其检查和钩子才会被装配进编排器。
//! 注册表在启动时构建，分析期间只读。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::checks::Check;
use crate::error::{AnalysisError, Result};
use crate::models::{AssessmentResult, Lane, Paper};
use crate::orchestrator::assessor::panic_message;

/// 插件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// 已注册，尚未就绪
    Registered,
    /// 已就绪，检查与钩子生效
    Ready,
}

/// 结果修改函数
pub type ModifyFn = Arc<dyn Fn(AssessmentResult, &Paper) -> Result<AssessmentResult> + Send + Sync>;

/// 结果修改钩子
#[derive(Clone)]
pub struct ResultModification {
    pub plugin: String,
    /// 只作用于该检查；`None` 表示作用于所有结果
    pub target: Option<String>,
    /// 越小越先执行，相同优先级按注册顺序
    pub priority: i32,
    sequence: usize,
    modify: ModifyFn,
}

impl ResultModification {
    fn applies_to(&self, identifier: &str) -> bool {
        self.target.as_deref().map_or(true, |t| t == identifier)
    }
}

impl std::fmt::Debug for ResultModification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultModification")
            .field("plugin", &self.plugin)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .finish()
    }
}

#[derive(Clone)]
struct PluginCheck {
    plugin: String,
    lane: Lane,
    check: Arc<dyn Check>,
}

/// 扩展注册表
#[derive(Clone, Default)]
pub struct Pluggable {
    plugins: BTreeMap<String, PluginStatus>,
    checks: Vec<PluginCheck>,
    replacements: HashMap<String, (String, Arc<dyn Check>)>,
    disabled: HashSet<String>,
    modifications: Vec<ResultModification>,
}

impl Pluggable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册插件
    pub fn register_plugin(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() || name.contains('/') {
            return Err(AnalysisError::config(format!("插件名无效: {:?}", name)));
        }
        if self.plugins.contains_key(&name) {
            return Err(AnalysisError::config(format!("插件 {} 已注册", name)));
        }
        info!("🔌 注册插件: {}", name);
        self.plugins.insert(name, PluginStatus::Registered);
        Ok(())
    }

    /// 标记插件就绪
    pub fn plugin_ready(&mut self, name: &str) -> Result<()> {
        let status = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| AnalysisError::config(format!("插件 {} 未注册", name)))?;
        *status = PluginStatus::Ready;
        info!("✓ 插件就绪: {}", name);
        Ok(())
    }

    pub fn status(&self, name: &str) -> Option<PluginStatus> {
        self.plugins.get(name).copied()
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.status(name) == Some(PluginStatus::Ready)
    }

    fn ensure_plugin(&self, plugin: &str) -> Result<()> {
        if self.plugins.contains_key(plugin) {
            Ok(())
        } else {
            Err(AnalysisError::config(format!("插件 {} 未注册", plugin)))
        }
    }

    /// 注册新的检查单元
    pub fn register_check(&mut self, plugin: &str, lane: Lane, check: Arc<dyn Check>) -> Result<()> {
        self.ensure_plugin(plugin)?;

        let identifier = check.identifier().to_string();
        let prefix = format!("{}/", plugin);
        if !identifier.starts_with(&prefix) || identifier.len() == prefix.len() {
            return Err(AnalysisError::config(format!(
                "插件 {} 的检查标识必须以 {} 开头: {}",
                plugin, prefix, identifier
            )));
        }
        if self.checks.iter().any(|c| c.check.identifier() == identifier) {
            return Err(AnalysisError::config(format!("检查 {} 已注册", identifier)));
        }

        debug!("插件 {} 注册检查 {} ({})", plugin, identifier, lane);
        self.checks.push(PluginCheck {
            plugin: plugin.to_string(),
            lane,
            check,
        });
        Ok(())
    }

    /// 用插件提供的实现替换内置检查（标识保持不变）
    pub fn replace_check(&mut self, plugin: &str, check: Arc<dyn Check>) -> Result<()> {
        self.ensure_plugin(plugin)?;
        let identifier = check.identifier().to_string();
        debug!("插件 {} 替换检查 {}", plugin, identifier);
        self.replacements
            .insert(identifier, (plugin.to_string(), check));
        Ok(())
    }

    /// 禁用检查（内置或插件提供的）
    pub fn disable_check(&mut self, identifier: impl Into<String>) {
        self.disabled.insert(identifier.into());
    }

    pub fn is_disabled(&self, identifier: &str) -> bool {
        self.disabled.contains(identifier)
    }

    /// 注册结果修改钩子
    pub fn register_modification<F>(
        &mut self,
        plugin: &str,
        target: Option<&str>,
        priority: i32,
        modify: F,
    ) -> Result<()>
    where
        F: Fn(AssessmentResult, &Paper) -> Result<AssessmentResult> + Send + Sync + 'static,
    {
        self.ensure_plugin(plugin)?;
        let sequence = self.modifications.len();
        self.modifications.push(ResultModification {
            plugin: plugin.to_string(),
            target: target.map(str::to_string),
            priority,
            sequence,
            modify: Arc::new(modify),
        });
        Ok(())
    }

    /// 就绪插件为该通道提供的检查（注册顺序）
    pub fn checks_for(&self, lane: Lane) -> Vec<Arc<dyn Check>> {
        self.checks
            .iter()
            .filter(|c| c.lane == lane && self.is_ready(&c.plugin))
            .filter(|c| !self.is_disabled(c.check.identifier()))
            .map(|c| c.check.clone())
            .collect()
    }

    /// 就绪插件提供的替换实现
    pub fn replacement(&self, identifier: &str) -> Option<Arc<dyn Check>> {
        self.replacements
            .get(identifier)
            .filter(|(plugin, _)| self.is_ready(plugin))
            .map(|(_, check)| check.clone())
    }

    /// 就绪插件的钩子，按 (优先级, 注册顺序) 排序
    pub fn modifications(&self) -> Vec<ResultModification> {
        let mut modifications: Vec<ResultModification> = self
            .modifications
            .iter()
            .filter(|m| self.is_ready(&m.plugin))
            .cloned()
            .collect();
        modifications.sort_by_key(|m| (m.priority, m.sequence));
        modifications
    }
}

/// 依次执行钩子；出错（或 panic）的钩子被跳过，结果保持上一步的值
pub fn apply_modifications(
    modifications: &[ResultModification],
    mut result: AssessmentResult,
    paper: &Paper,
) -> AssessmentResult {
    for modification in modifications {
        if !modification.applies_to(&result.identifier) {
            continue;
        }
        let input = result.clone();
        match catch_unwind(AssertUnwindSafe(|| (modification.modify)(input, paper))) {
            Ok(Ok(modified)) => result = modified,
            Ok(Err(e)) => {
                warn!(
                    "⚠️ 插件 {} 的钩子处理 {} 失败，已跳过: {}",
                    modification.plugin, result.identifier, e
                );
            }
            Err(panic) => {
                warn!(
                    "⚠️ 插件 {} 的钩子处理 {} 时 panic，已跳过: {}",
                    modification.plugin,
                    result.identifier,
                    panic_message(panic.as_ref())
                );
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::Researcher;

    struct Fixed(&'static str);

    impl Check for Fixed {
        fn identifier(&self) -> &str {
            self.0
        }
        fn is_applicable(&self, _: &Paper) -> bool {
            true
        }
        fn execute(&self, _: &Paper, _: &Researcher) -> Result<AssessmentResult> {
            Ok(AssessmentResult::new(self.0).with_score(5.0))
        }
    }

    #[test]
    fn test_check_requires_namespace_and_known_plugin() {
        let mut pluggable = Pluggable::new();
        assert!(pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("acme/x"))).is_err());

        pluggable.register_plugin("acme").unwrap();
        assert!(pluggable.register_plugin("acme").is_err());
        assert!(pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("other/x"))).is_err());
        assert!(pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("acme/"))).is_err());
        pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("acme/x"))).unwrap();
        assert!(pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("acme/x"))).is_err());
    }

    #[test]
    fn test_only_ready_plugins_contribute() {
        let mut pluggable = Pluggable::new();
        pluggable.register_plugin("acme").unwrap();
        pluggable.register_check("acme", Lane::Seo, Arc::new(Fixed("acme/x"))).unwrap();
        pluggable.replace_check("acme", Arc::new(Fixed("seo/text-length"))).unwrap();
        assert!(pluggable.checks_for(Lane::Seo).is_empty());
        assert!(pluggable.replacement("seo/text-length").is_none());

        pluggable.plugin_ready("acme").unwrap();
        assert_eq!(pluggable.checks_for(Lane::Seo).len(), 1);
        assert!(pluggable.checks_for(Lane::Readability).is_empty());
        assert!(pluggable.replacement("seo/text-length").is_some());

        pluggable.disable_check("acme/x");
        assert!(pluggable.checks_for(Lane::Seo).is_empty());
    }

    #[test]
    fn test_modifications_order_and_failure_isolation() {
        let mut pluggable = Pluggable::new();
        pluggable.register_plugin("acme").unwrap();
        pluggable
            .register_modification("acme", None, 10, |r: AssessmentResult, _: &Paper| {
                Ok(r.with_text("late"))
            })
            .unwrap();
        pluggable
            .register_modification("acme", Some("acme/x"), 0, |r: AssessmentResult, _: &Paper| {
                let score = r.score.unwrap_or(0.0);
                Ok(r.with_score(score + 1.0))
            })
            .unwrap();
        pluggable
            .register_modification("acme", None, 5, |_: AssessmentResult, _: &Paper| {
                Err(AnalysisError::protocol("broken hook"))
            })
            .unwrap();
        pluggable.plugin_ready("acme").unwrap();

        let modifications = pluggable.modifications();
        let priorities: Vec<i32> = modifications.iter().map(|m| m.priority).collect();
        assert_eq!(priorities, vec![0, 5, 10]);

        let paper = Paper::new("text");
        let result = apply_modifications(
            &modifications,
            AssessmentResult::new("acme/x").with_score(5.0),
            &paper,
        );
        assert_eq!(result.score, Some(6.0));
        assert_eq!(result.text, "late");

        let other = apply_modifications(
            &modifications,
            AssessmentResult::new("seo/text-length").with_score(5.0),
            &paper,
        );
        assert_eq!(other.score, Some(5.0));
    }

    #[test]
    fn test_panicking_hook_is_skipped() {
        let mut pluggable = Pluggable::new();
        pluggable.register_plugin("acme").unwrap();
        pluggable
            .register_modification("acme", None, 0, |r: AssessmentResult, _: &Paper| {
                Ok(r.with_score(4.0))
            })
            .unwrap();
        pluggable
            .register_modification("acme", None, 1, |_: AssessmentResult, _: &Paper| -> Result<AssessmentResult> {
                panic!("hook boom")
            })
            .unwrap();
        pluggable
            .register_modification("acme", None, 2, |r: AssessmentResult, _: &Paper| {
                Ok(r.with_text("after panic"))
            })
            .unwrap();
        pluggable.plugin_ready("acme").unwrap();

        let result = apply_modifications(
            &pluggable.modifications(),
            AssessmentResult::new("acme/x").with_score(9.0),
            &Paper::new("text"),
        );
        assert_eq!(result.score, Some(4.0));
        assert_eq!(result.text, "after panic");
    }
}
