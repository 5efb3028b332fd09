/// 分析通道
///
/// 每个通道独立追踪自己最新的请求，新请求会取代同一通道中尚未完成的旧请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// 可读性
    Readability,
    /// 搜索引擎优化
    Seo,
}

impl Lane {
    /// 所有通道（固定顺序）
    pub const ALL: [Lane; 2] = [Lane::Readability, Lane::Seo];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Lane::Readability => "readability",
            Lane::Seo => "seo",
        }
    }

    /// 从名称解析通道
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "readability" | "content" => Some(Lane::Readability),
            "seo" => Some(Lane::Seo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
