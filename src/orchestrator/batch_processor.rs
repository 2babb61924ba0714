//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一个 promo 文件夹的完整处理：
//!
//! 1. **文件发现**：扫描符合条件的 JSON 文件
//! 2. **批次划分**：按配置的批次大小切分
//! 3. **顺序处理**：批次之间严格串行，一个批次走完整条流水线
//!    之后才开始下一个，批次失败不影响整体运行
//! 4. **结果合并**：把成功批次的 CSV 合并为一份最终结果
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有 Ren3Client 的模块
//! - **向下委托**：单批次细节委托给 batch_pipeline
//! - **部分失败容忍**：只要有一个批次成功就产出合并结果

use crate::batching::create_batches;
use crate::clients::Ren3Client;
use crate::config::Config;
use crate::discovery::{self, FINAL_RESULT_PREFIX};
use crate::error::{AppError, AppResult};
use crate::orchestrator::batch_pipeline;
use crate::services::csv_merger;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// 成功批次之间的间隔
const INTER_BATCH_DELAY: Duration = Duration::from_secs(5);

/// 应用主结构
pub struct App {
    config: Config,
    client: Ren3Client,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        let client = Ren3Client::new(&config)?;
        Ok(Self { config, client })
    }

    /// 处理一个 promo 文件夹
    ///
    /// # 参数
    /// - `promo_folder`: 输入目录
    ///
    /// # 返回
    /// 产出合并结果时返回其路径；没有可处理文件或所有批次失败时返回 None
    pub async fn run(&self, promo_folder: &Path) -> AppResult<Option<PathBuf>> {
        let folder_name = promo_folder
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        log_run_start(&folder_name);

        // 发现输入文件（目录不存在时这里直接报错）
        let json_files = discovery::find_json_files(promo_folder).await?;

        if json_files.is_empty() {
            warn!("⚠️ 没有找到待处理的 JSON 文件");
            return Ok(None);
        }

        // 创建输出目录
        let processed_dir = PathBuf::from(&self.config.processed_dir).join(&folder_name);
        tokio::fs::create_dir_all(&processed_dir)
            .await
            .map_err(|e| AppError::file_write_failed(processed_dir.display().to_string(), e))?;

        // 划分批次
        let batches = create_batches(json_files, self.config.batch_size);
        let total_batches = batches.len();

        // 顺序处理每个批次，失败的批次跳过，继续后面的
        let mut csv_files: Vec<PathBuf> = Vec::new();

        for batch in &batches {
            log_batch_start(batch.number, total_batches, batch.files.len());

            match batch_pipeline::process_batch(&self.client, &self.config, batch, &processed_dir)
                .await
            {
                Ok(csv_path) => {
                    csv_files.push(csv_path);
                    info!("✓ 批次 {} 处理完成", batch.number);

                    // 成功批次之间稍作间隔，最后一批之后不等
                    if batch.number < total_batches {
                        info!("等待 {} 秒后开始下一批...", INTER_BATCH_DELAY.as_secs());
                        sleep(INTER_BATCH_DELAY).await;
                    }
                }
                Err(e) => {
                    error!("✗ 批次 {} 失败: {}", batch.number, e);
                    continue;
                }
            }
        }

        // 合并所有成功批次的结果
        if csv_files.is_empty() {
            error!("没有任何批次处理成功");
            return Ok(None);
        }

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let final_path = processed_dir.join(format!("{}{}.csv", FINAL_RESULT_PREFIX, timestamp));
        csv_merger::combine_csvs(&csv_files, &final_path)?;

        log_run_complete(csv_files.len(), &final_path);

        Ok(Some(final_path))
    }
}

// ========== 日志辅助函数 ==========

fn log_run_start(folder_name: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 REN3 AGENT 批量处理");
    info!("{}", "=".repeat(60));
    info!("处理目录: {}", folder_name);
    info!(
        "开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}

fn log_batch_start(batch_num: usize, total_batches: usize, file_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 批次 {}/{} ({} 个文件)", batch_num, total_batches, file_count);
    info!("{}", "=".repeat(60));
}

fn log_run_complete(batch_count: usize, final_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("✅ 处理完成!");
    info!("{}", "=".repeat(60));
    info!("成功批次: {}", batch_count);
    info!("最终输出: {}", final_path.display());
}
