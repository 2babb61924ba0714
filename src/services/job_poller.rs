//! 任务轮询服务 - 业务能力层
//!
//! 只负责"等一个远端任务跑完"这一件事：按固定间隔拉取任务日志，
//! 扫描终态标记，播报进度。完成判定集中在 `is_completion_log`
//! 这一个谓词里，后端换日志格式时只需要改这一处

use crate::clients::Ren3Client;
use crate::error::{AppError, ApiError, AppResult};
use crate::models::JobLog;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// 终态日志的类型码
const COMPLETION_LOG_TYPE: i64 = 2;

/// 判断一条日志是否表示任务完成
///
/// 类型码为 2 且文本包含 "completed"（不区分大小写）
pub fn is_completion_log(log: &JobLog) -> bool {
    log.log_type == COMPLETION_LOG_TYPE && log.text.to_lowercase().contains("completed")
}

/// 判断一条日志是否是进度播报
///
/// 只用于状态展示，不影响控制流
pub fn is_progress_log(log: &JobLog) -> bool {
    log.text.to_lowercase().contains("progress")
}

/// 进度播报去重器
///
/// 只与上一条播报过的文本比较，相同则不重复播报
#[derive(Debug, Default)]
struct ProgressTracker {
    last: Option<String>,
}

impl ProgressTracker {
    /// 该进度文本是否需要播报
    fn should_report(&mut self, text: &str) -> bool {
        if self.last.as_deref() == Some(text) {
            return false;
        }
        self.last = Some(text.to_string());
        true
    }
}

/// 轮询任务日志直到检测到完成
///
/// 每 `poll_interval` 秒拉取一次日志；拉取过程中的任何错误只记录
/// 警告，下个周期继续。进度日志与上次播报去重后输出。
/// `poll_timeout` 为 None 时无限等待（与原始行为一致），
/// 设置后超过墙钟上限返回 PollTimeout。
pub async fn wait_for_completion(
    client: &Ren3Client,
    job_id: &str,
    poll_interval: u64,
    poll_timeout: Option<Duration>,
) -> AppResult<()> {
    poll_until_complete(job_id, poll_interval, poll_timeout, || {
        client.get_agent_job_logs(job_id)
    })
    .await
}

/// 轮询循环本体，日志拉取方式由调用方注入
pub async fn poll_until_complete<F, Fut>(
    job_id: &str,
    poll_interval: u64,
    poll_timeout: Option<Duration>,
    mut fetch_logs: F,
) -> AppResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<Vec<JobLog>>>,
{
    info!("⏳ 等待 agent 完成...");

    let start = Instant::now();
    let mut progress = ProgressTracker::default();

    loop {
        match fetch_logs().await {
            Ok(logs) => {
                for log in &logs {
                    if is_completion_log(log) {
                        info!("✓ Agent 在 {} 秒内完成", start.elapsed().as_secs());
                        return Ok(());
                    }

                    // 播报进度更新（与上一条去重）
                    if is_progress_log(log) && progress.should_report(&log.text) {
                        info!("  进度: {}", log.text);
                    }
                }
            }
            Err(e) => {
                warn!("轮询任务状态出错: {}，下个周期重试", e);
            }
        }

        if let Some(timeout) = poll_timeout {
            if start.elapsed() >= timeout {
                return Err(AppError::Api(ApiError::PollTimeout {
                    job_id: job_id.to_string(),
                    waited_secs: start.elapsed().as_secs(),
                }));
            }
        }

        sleep(Duration::from_secs(poll_interval)).await;
    }
}
