//! 检查单元层（Checks）
//!
//! ## 职责
//!
//! 每个检查单元描述"一条独立的评分规则"，只处理单个内容单元：
//! - `is_applicable`：纯谓词，不修改内容单元，也不读取缓存
//! - `execute`：通过 `Researcher` 读取共享计算，直接返回结果，不在实例上保存中间状态
//!
//! 同一个检查实例可以被多个内容单元、多个线程反复使用。
//!
//! ## 内置检查
//!
//! - `readability/list-presence`
//! - `readability/sentence-length`
//! - `seo/text-length`
//! - `seo/keyphrase-density`

pub mod keyphrase_density;
pub mod list_presence;
pub mod options;
pub mod sentence_length;
pub mod text_length;

use crate::error::Result;
use crate::models::{AssessmentResult, Mark, Paper};
use crate::research::Researcher;

pub use keyphrase_density::{KeyphraseDensity, KeyphraseDensityOptions};
pub use list_presence::{ListPresence, ListPresenceOptions};
pub use options::merge_options;
pub use sentence_length::{SentenceLength, SentenceLengthOptions};
pub use text_length::{TextLength, TextLengthOptions};

/// 检查单元接口
pub trait Check: Send + Sync {
    /// 唯一标识，插件提供的检查使用 `插件名/检查名`
    fn identifier(&self) -> &str;

    /// 是否适用于该内容单元；不适用的检查不产生任何结果
    fn is_applicable(&self, paper: &Paper) -> bool;

    /// 执行检查
    ///
    /// 对满足 `is_applicable` 的输入必须返回结果；返回错误视为程序错误，由编排层隔离记录。
    fn execute(&self, paper: &Paper, researcher: &Researcher) -> Result<AssessmentResult>;

    /// 加权平均时使用的权重
    fn weight(&self) -> f64 {
        1.0
    }

    /// 需要高亮的文本片段
    fn marks(&self, _paper: &Paper, _researcher: &Researcher) -> Result<Vec<Mark>> {
        Ok(Vec::new())
    }
}

impl std::fmt::Debug for dyn Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Check({})", self.identifier())
    }
}
