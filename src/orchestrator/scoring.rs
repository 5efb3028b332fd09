//! 总分聚合
//!
//! 只有带分数的结果参与聚合；没有任何分数时返回 `None`，由编排层换成"无内容"哨兵值。

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 参与聚合的单个分数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScore {
    pub score: f64,
    pub weight: f64,
}

/// 聚合函数接口
pub trait ScoreAggregator: Send + Sync {
    fn aggregate(&self, scores: &[WeightedScore]) -> Option<f64>;
}

/// 算术平均（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAggregator;

impl ScoreAggregator for MeanAggregator {
    fn aggregate(&self, scores: &[WeightedScore]) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        let total: f64 = scores.iter().map(|s| s.score).sum();
        Some(total / scores.len() as f64)
    }
}

/// 加权平均；负权重按 0 处理，总权重为 0 时退回算术平均
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMeanAggregator;

impl ScoreAggregator for WeightedMeanAggregator {
    fn aggregate(&self, scores: &[WeightedScore]) -> Option<f64> {
        let total_weight: f64 = scores.iter().map(|s| s.weight.max(0.0)).sum();
        if total_weight <= 0.0 {
            return MeanAggregator.aggregate(scores);
        }
        let weighted: f64 = scores.iter().map(|s| s.score * s.weight.max(0.0)).sum();
        Some(weighted / total_weight)
    }
}

/// 配置中的聚合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    #[default]
    Mean,
    WeightedMean,
}

impl AggregationKind {
    pub fn aggregator(self) -> Arc<dyn ScoreAggregator> {
        match self {
            AggregationKind::Mean => Arc::new(MeanAggregator),
            AggregationKind::WeightedMean => Arc::new(WeightedMeanAggregator),
        }
    }
}
