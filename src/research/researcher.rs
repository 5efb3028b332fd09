//! Researcher - 共享计算缓存
//!
//! 按名称注册计算函数，多个检查单元通过 `get(name)` 共享同一次计算的结果。
//! 缓存只对绑定的那一个内容单元有效，换一个内容单元就从空缓存开始。

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::{AnalysisError, Result};
use crate::models::Paper;

/// 计算结果
pub type ResearchValue = JsonValue;

/// 计算函数：可以通过 `&Researcher` 读取其他计算结果
pub type ResearchFn = Arc<dyn Fn(&Paper, &Researcher) -> Result<ResearchValue> + Send + Sync>;

/// 共享计算缓存
///
/// 职责：
/// - 持有计算注册表（可在多个 Researcher 之间共享）
/// - 为当前内容单元缓存每个计算的结果
/// - 不认识检查单元，不关心评分
#[derive(Clone, Default)]
pub struct Researcher {
    researches: HashMap<String, ResearchFn>,
    data: HashMap<String, ResearchValue>,
    paper: Option<Paper>,
    cache: RefCell<HashMap<String, ResearchValue>>,
    /// 正在计算中的名称，用于发现循环依赖
    in_progress: RefCell<HashSet<String>>,
}

impl Researcher {
    /// 创建空的 Researcher
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册（或替换）一个计算
    ///
    /// 替换已有名称时只清除该名称的缓存。
    pub fn register<F>(&mut self, name: impl Into<String>, compute: F)
    where
        F: Fn(&Paper, &Researcher) -> Result<ResearchValue> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.researches.contains_key(&name) {
            debug!("替换计算: {}", name);
        }
        self.cache.get_mut().remove(&name);
        self.researches.insert(name, Arc::new(compute));
    }

    /// 绑定内容单元
    ///
    /// 与当前绑定的内容单元不同时清空整个缓存。
    pub fn set_paper(&mut self, paper: Paper) {
        if self.paper.as_ref() != Some(&paper) {
            self.cache.get_mut().clear();
        }
        self.paper = Some(paper);
    }

    /// 共享注册表、绑定到新内容单元的 Researcher（缓存为空）
    pub fn for_paper(&self, paper: Paper) -> Self {
        Self {
            researches: self.researches.clone(),
            data: self.data.clone(),
            paper: Some(paper),
            cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// 当前绑定的内容单元
    pub fn paper(&self) -> Option<&Paper> {
        self.paper.as_ref()
    }

    /// 获取计算结果
    ///
    /// 同一内容单元上，每个计算只执行一次。计算之间的循环依赖返回 `CheckExecution` 错误。
    pub fn get(&self, name: &str) -> Result<ResearchValue> {
        let compute = self
            .researches
            .get(name)
            .ok_or_else(|| AnalysisError::unknown_computation(name))?;

        if let Some(cached) = self.cache.borrow().get(name) {
            trace!("计算 {} 命中缓存", name);
            return Ok(cached.clone());
        }

        let paper = self
            .paper
            .as_ref()
            .ok_or_else(|| AnalysisError::invalid_content("Researcher 尚未绑定内容单元"))?;

        let Some(_guard) = InProgress::enter(&self.in_progress, name) else {
            warn!("⚠️ 计算 {} 存在循环依赖", name);
            return Err(AnalysisError::check_execution(name, "计算之间存在循环依赖"));
        };

        // 计算期间不持有借用，允许计算函数递归读取其他计算
        debug!("执行计算: {}", name);
        let value = compute(paper, self)?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), value.clone());

        Ok(value)
    }

    /// 获取计算结果并反序列化为指定类型
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        serde_json::from_value(value).map_err(|e| {
            AnalysisError::check_execution(name, format!("计算结果类型不匹配: {}", e))
        })
    }

    pub fn has_research(&self, name: &str) -> bool {
        self.researches.contains_key(name)
    }

    /// 所有已注册的计算名（排序）
    pub fn available_researches(&self) -> Vec<String> {
        let mut names: Vec<String> = self.researches.keys().cloned().collect();
        names.sort();
        names
    }

    /// 添加调用方提供的数据（不参与计算缓存）
    pub fn add_research_data(&mut self, name: impl Into<String>, value: ResearchValue) {
        self.data.insert(name.into(), value);
    }

    /// 读取调用方提供的数据
    pub fn research_data(&self, name: &str) -> Option<&ResearchValue> {
        self.data.get(name)
    }
}

/// 计算结束（包括 panic 展开）时把名称移出进行中集合
struct InProgress<'a> {
    names: &'a RefCell<HashSet<String>>,
    name: String,
}

impl<'a> InProgress<'a> {
    fn enter(names: &'a RefCell<HashSet<String>>, name: &str) -> Option<Self> {
        if !names.borrow_mut().insert(name.to_string()) {
            return None;
        }
        Some(Self {
            names,
            name: name.to_string(),
        })
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.names.borrow_mut().remove(&self.name);
    }
}

impl fmt::Debug for Researcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Researcher")
            .field("researches", &self.available_researches())
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}
