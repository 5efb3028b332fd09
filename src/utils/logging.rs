use anyhow::{Context, Result};
/// 日志工具模块
///
/// 运行日志文件的写入，以及批量分析过程中的格式化输出
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;

use crate::models::{Rating, ResultSet};

/// 初始化日志文件（覆盖旧文件，写入带时间的标题）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
///
/// # 返回
/// 写入失败时返回错误
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n内容分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).with_context(|| format!("无法创建日志文件: {}", log_file_path))?;
    Ok(())
}

/// 追加一段内容到日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `content`: 追加的内容（自动补换行）
pub fn append_to_log(log_file_path: &str, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    writeln!(file, "{}", content)?;
    Ok(())
}

/// 把一个通道的结果集格式化为日志文本
///
/// # 参数
/// - `paper_name`: 内容单元的文件名
/// - `lane`: 通道名
/// - `result_set`: 该通道的结果集
pub fn format_result_set(paper_name: &str, lane: &str, result_set: &ResultSet) -> String {
    let mut lines = Vec::new();
    let overall = match result_set.overall.percent() {
        Some(percent) => format!("{}/100 ({})", percent, result_set.rating()),
        None => "无内容".to_string(),
    };
    lines.push(format!("[{}] {} 总分: {}", paper_name, lane, overall));

    for result in &result_set.results {
        let rating = result.rating(&result_set.scale);
        lines.push(format!(
            "  {} {:<28} {:>4} {}",
            rating.glyph(),
            result.identifier,
            result.score.map(|s| s.to_string()).unwrap_or_default(),
            truncate_text(&result.text, 80)
        ));
    }
    for diagnostic in &result_set.diagnostics {
        lines.push(format!(
            "  {} {:<28} 内部错误: {}",
            Rating::Feedback.glyph(),
            diagnostic.identifier,
            diagnostic.message
        ));
    }
    lines.join("\n")
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 最大并发数
/// - `lanes`: 启用的分析通道
pub fn log_startup(max_concurrent: usize, lanes: &[String]) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并发内容分析模式");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("🧭 分析通道: {}", lanes.join(", "));
    info!("{}", "=".repeat(60));
}

/// 记录内容单元加载信息
///
/// # 参数
/// - `total`: 内容单元总数
/// - `max_concurrent`: 最大并发数
pub fn log_papers_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 个待分析的内容单元", total);
    info!("📋 将以每批 {} 个的方式处理", max_concurrent);
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始内容单元编号
/// - `end`: 结束内容单元编号
/// - `total`: 内容单元总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批内容单元: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `success`: 成功数量
/// - `total`: 批次总数
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `average_percent`: 所有通道的平均展示分数（没有分数时为 `None`）
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, average_percent: Option<f64>, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部分析完成统计");
    info!("完成时间: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    if let Some(average) = average_percent {
        info!("📈 平均得分: {:.1}/100", average);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原文本
/// - `max_len`: 保留的最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
