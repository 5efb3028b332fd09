use crate::models::Paper;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从文件加载的内容单元
#[derive(Debug, Clone)]
pub struct LoadedPaper {
    pub path: PathBuf,
    pub paper: Paper,
}

impl LoadedPaper {
    /// 文件名（用于日志显示）
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// 从 TOML 文件加载内容单元
pub async fn load_paper(toml_file_path: &Path) -> Result<LoadedPaper> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let paper = Paper::from_toml_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    Ok(LoadedPaper {
        path: toml_file_path.to_path_buf(),
        paper,
    })
}

/// 从文件夹中加载所有 TOML 内容单元，按文件名排序
///
/// 解析失败的文件记录警告后跳过。
pub async fn load_all_papers(folder_path: &str) -> Result<Vec<LoadedPaper>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut papers = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_paper(&path).await {
            Ok(loaded) => {
                tracing::info!("成功加载，正文 {} 字符", loaded.paper.text().chars().count());
                papers.push(loaded);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(papers)
}
