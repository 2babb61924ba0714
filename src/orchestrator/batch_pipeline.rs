//! 单批次处理流水线 - 编排层
//!
//! ## 职责
//!
//! 对一个批次执行严格顺序、不回退的状态序列：
//!
//! ```text
//! 上传 → 摄取等待(固定5秒) → 校验 → 启动任务 → 轮询
//!   → 获取详情 → 列出输出 → 定位结果文件 → 下载
//! ```
//!
//! 任何一步失败都只让当前批次失败，由上层决定是否继续后面的批次

use crate::batching::Batch;
use crate::clients::Ren3Client;
use crate::config::Config;
use crate::error::{AppError, AppResult, BusinessError};
use crate::services::job_poller;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;

/// 上传后的摄取等待时间
///
/// 服务端异步建索引，没有任何确认信号可查，只能盲等
const INGESTION_DELAY: Duration = Duration::from_secs(5);

/// 每个批次预期的结果文件名，由 agent 约定固定
pub const RESULT_FILENAME: &str = "competitive_analysis_results.csv";

/// 处理单个批次
///
/// # 参数
/// - `client`: Ren3 API 客户端
/// - `config`: 配置
/// - `batch`: 待处理的批次
/// - `processed_dir`: 本次运行的输出目录
///
/// # 返回
/// 返回下载好的批次 CSV 路径
pub async fn process_batch(
    client: &Ren3Client,
    config: &Config,
    batch: &Batch,
    processed_dir: &Path,
) -> AppResult<PathBuf> {
    // 每个批次一个全新的临时文件夹标识
    let temp_folder_uuid = Uuid::new_v4().to_string();
    info!("临时文件夹: {}", temp_folder_uuid);

    // 上传
    client.upload_files(&batch.files, &temp_folder_uuid).await?;

    // 摄取等待（盲等，无确认信号）
    info!("等待文件摄取...");
    sleep(INGESTION_DELAY).await;

    // 校验：返回的列表原样信任，不比对数量
    let input_files = client.get_job_input_files(&temp_folder_uuid).await?;

    // 启动任务
    let job_id = client.run_agent(&input_files, &temp_folder_uuid).await?;

    // 轮询直到完成
    job_poller::wait_for_completion(
        client,
        &job_id,
        config.poll_interval,
        config.poll_timeout_secs.map(Duration::from_secs),
    )
    .await?;

    // 获取输出文件夹并列出文档
    let output_folder = client.get_output_folder(&job_id).await?;
    let output_files = client.get_output_files(&output_folder).await?;

    // 定位结果文件（文件名精确匹配）
    let artifact = output_files
        .iter()
        .find(|doc| doc.doc_filename == RESULT_FILENAME)
        .ok_or_else(|| {
            AppError::Business(BusinessError::ArtifactNotFound {
                batch_num: batch.number,
                filename: RESULT_FILENAME.to_string(),
            })
        })?;

    // 下载到批次编号命名的本地文件
    let csv_path = processed_dir.join(format!("batch_{:03}.csv", batch.number));
    client.download_file(&artifact.uuid, &csv_path).await?;

    Ok(csv_path)
}
