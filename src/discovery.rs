//! 文件与目录发现模块
//!
//! 负责扫描待处理的 JSON 文件、查找最新的 promo 文件夹，
//! 以及判断某个文件夹是否已经处理过（幂等性检查）

use crate::error::{AppError, AppResult, FileError};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{info, warn};

/// 保留标记：以此字符开头的文件名不参与处理
const RESERVED_MARKER: char = '_';

/// 合并结果文件名前缀，用于幂等性检查
pub const FINAL_RESULT_PREFIX: &str = "final_analysis_";

/// 扫描目录下所有符合条件的 JSON 文件
///
/// 排除以保留标记开头的文件，按文件名升序排序保证批次划分稳定。
/// 目录为空或没有符合条件的文件时返回空列表，由调用方决定是否致命。
///
/// # 参数
/// - `dir`: 输入目录
///
/// # 返回
/// 返回排序后的文件路径列表；目录不存在时返回 DirectoryNotFound
pub async fn find_json_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: dir.display().to_string(),
        }));
    }

    let mut json_files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }

        // 跳过特殊文件
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(RESERVED_MARKER) {
            continue;
        }

        json_files.push(path);
    }

    json_files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    info!("✓ 找到 {} 个待处理的 JSON 文件", json_files.len());

    Ok(json_files)
}

/// 查找最近修改的 promo 文件夹
///
/// # 参数
/// - `output_dir`: promo 文件夹的根目录
///
/// # 返回
/// 返回修改时间最新的 `promo_*` 目录；一个都没有时返回 None
pub async fn latest_promo_folder(output_dir: &Path) -> AppResult<Option<PathBuf>> {
    if !output_dir.exists() {
        return Err(AppError::File(FileError::DirectoryNotFound {
            path: output_dir.display().to_string(),
        }));
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    let mut entries = fs::read_dir(output_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("promo_") {
            continue;
        }

        let modified = entry
            .metadata()
            .await?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        match &latest {
            Some((best, _)) if *best >= modified => {}
            _ => latest = Some((modified, path)),
        }
    }

    match &latest {
        Some((_, path)) => info!(
            "📁 最新的 promo 文件夹: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        ),
        None => warn!("⚠️ 没有找到 promo 文件夹"),
    }

    Ok(latest.map(|(_, path)| path))
}

/// 检查某个 promo 文件夹是否已经处理过
///
/// 处理目录下存在 `final_analysis_*` 文件即视为已处理，
/// 避免定时重复调用时重复消耗远端任务
pub async fn already_processed(processed_root: &Path, folder_name: &str) -> AppResult<bool> {
    let processed_dir = processed_root.join(folder_name);

    if !processed_dir.exists() {
        return Ok(false);
    }

    let mut entries = fs::read_dir(&processed_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(FINAL_RESULT_PREFIX) {
            info!("✓ 文件夹已处理过: {}", name.to_string_lossy());
            return Ok(true);
        }
    }

    Ok(false)
}
