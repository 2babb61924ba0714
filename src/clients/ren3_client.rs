//! Ren3 API 客户端
//!
//! 封装所有对 Ren3 后端的出站调用：统一的重试策略、
//! 分级超时（上传 300 秒 / JSON 60 秒 / 下载 120 秒）、
//! multipart 上传和流式下载

use crate::config::Config;
use crate::error::{AppError, ApiError, AppResult};
use crate::models::{JobLog, OutputDoc};
use futures::StreamExt;
use reqwest::multipart;
use serde_json::{json, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 普通 JSON 调用超时
const JSON_TIMEOUT: Duration = Duration::from_secs(60);
/// multipart 上传超时
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// 文件下载超时
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// 线性退避基数（秒）：第 k 次失败后等待 5*k 秒
const RETRY_BACKOFF_BASE_SECS: u64 = 5;

/// 带线性退避的重试执行器
///
/// 最多执行 `max_retries` 次；只重试传输层失败，
/// 第 k 次失败后（k 从 1 开始）等待 `5*k` 秒再重试，
/// 耗尽后把最后一次的错误原样向上传播（错误内携带尝试次数）
pub async fn with_retries<T, F, Fut>(max_retries: usize, endpoint: &str, mut op: F) -> AppResult<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1usize;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                let delay_secs = RETRY_BACKOFF_BASE_SECS * attempt as u64;
                warn!(
                    "API调用失败 ({}, 尝试 {}/{}): {}，{} 秒后重试",
                    endpoint, attempt, max_retries, e, delay_secs
                );
                sleep(Duration::from_secs(delay_secs)).await;
                attempt += 1;
            }
        }
    }
}

/// Ren3 API 客户端
///
/// 全程复用同一个 reqwest::Client 以复用连接
pub struct Ren3Client {
    http: reqwest::Client,
    api_url: String,
    user_id: String,
    workspace_id: String,
    agent_uuid: String,
    agent_folder: String,
    max_retries: usize,
}

impl Ren3Client {
    /// 创建新的 Ren3 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Ren3-Processor/1.0")
            .build()
            .map_err(|e| {
                AppError::Api(ApiError::ClientBuildFailed {
                    source: Box::new(e),
                })
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            user_id: config.user_id.clone(),
            workspace_id: config.workspace_id.clone(),
            agent_uuid: config.agent_uuid.clone(),
            agent_folder: config.agent_folder.clone(),
            max_retries: config.max_retries,
        })
    }

    /// 上传一个批次的文件到临时文件夹
    ///
    /// 所有文件打包进一个 multipart 请求，用 temp_folder_uuid 标记；
    /// 服务端必须报告 success，否则本批次失败
    pub async fn upload_files(&self, files: &[PathBuf], temp_folder_uuid: &str) -> AppResult<()> {
        info!("📤 上传 {} 个文件...", files.len());

        // 先把文件全部读进内存，失败的读取在发起请求前就暴露出来
        let mut parts: Vec<(String, Vec<u8>)> = Vec::with_capacity(files.len());
        for path in files {
            let name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                AppError::File(crate::error::FileError::ReadFailed {
                    path: path.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            parts.push((name, bytes));
        }

        let endpoint = "/upload_agenttmpfiles";
        let url = format!("{}{}", self.api_url, endpoint);
        let extra = json!({
            "tempfolderuuid": temp_folder_uuid,
            "agentuuid": self.agent_uuid,
            "agent_folder": self.agent_folder,
        })
        .to_string();

        let response = with_retries(self.max_retries, endpoint, |attempt| {
            // multipart::Form 不可复用，每次尝试重新构建
            let mut form = multipart::Form::new()
                .text("workspaceid", self.workspace_id.clone())
                .text("useruuid", self.user_id.clone())
                .text("uploadtype", "agents")
                .text("fileignoreparent", "false")
                .text("parentfolder", temp_folder_uuid.to_string())
                .text("forceOverwrite", "true")
                .text("tempfolderuuid", temp_folder_uuid.to_string())
                .text("agentuuid", self.agent_uuid.clone())
                .text("agent_folder", self.agent_folder.clone())
                .text("extra", extra.clone());

            for (name, bytes) in &parts {
                let part = multipart::Part::bytes(bytes.clone())
                    .file_name(name.clone())
                    .mime_str("application/json")
                    .expect("合法的固定 MIME 类型");
                form = form.part("file", part);
            }

            let request = self.http.post(&url).multipart(form).timeout(UPLOAD_TIMEOUT);
            async move { Self::send_and_parse(request, endpoint, attempt).await }
        })
        .await?;

        let response = Self::expect_success(endpoint, response)?;
        debug!("上传响应: {}", response);

        info!("✓ 成功上传 {} 个文件", files.len());
        Ok(())
    }

    /// 查询临时文件夹下可见的已上传文件
    ///
    /// 返回的列表原样透传给 run_agent，不做数量校验
    pub async fn get_job_input_files(&self, temp_folder_uuid: &str) -> AppResult<Vec<Value>> {
        info!("🔍 校验已上传的文件...");

        let body = json!({
            "input_folder": temp_folder_uuid,
            "userid": self.user_id,
            "workspaceid": self.workspace_id,
        });

        let return_object = self.post_json("/agentdrive/get_jobinputfiles", body).await?;
        let files = return_object.as_array().cloned().unwrap_or_default();

        info!("✓ 临时文件夹中确认到 {} 个文件", files.len());
        Ok(files)
    }

    /// 对已上传的文件启动 agent 任务
    ///
    /// # 返回
    /// 返回任务 uuid
    pub async fn run_agent(
        &self,
        input_files: &[Value],
        temp_folder_uuid: &str,
    ) -> AppResult<String> {
        info!("🚀 对 {} 个文件启动 agent...", input_files.len());

        let endpoint = "/agentdrive/run_agent";
        let body = json!({
            "data": {
                "agent_uuid": self.agent_uuid,
                "input_files": input_files,
                "temp_folder": temp_folder_uuid,
            },
            "userid": self.user_id,
            "workspaceid": self.workspace_id,
        });

        let return_object = self.post_json(endpoint, body).await?;
        let job_id = return_object
            .get("uuid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::missing_field(endpoint, "returnObject.uuid"))?
            .to_string();

        info!("✓ Agent 已启动 - 任务 ID: {}", job_id);
        Ok(job_id)
    }

    /// 获取任务日志
    pub async fn get_agent_job_logs(&self, job_id: &str) -> AppResult<Vec<JobLog>> {
        let endpoint = "/agentdrive/get_agentjoblogs";
        let body = json!({
            "uuid": job_id,
            "userid": self.user_id,
            "workspaceid": self.workspace_id,
        });

        let return_object = self.post_json(endpoint, body).await?;
        let logs: Vec<JobLog> = serde_json::from_value(return_object).map_err(|e| {
            AppError::Api(ApiError::JsonParseFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })
        })?;

        Ok(logs)
    }

    /// 获取任务详情中的输出文件夹
    pub async fn get_output_folder(&self, job_id: &str) -> AppResult<String> {
        info!("📋 获取任务详情...");

        let endpoint = "/agentdrive/get_jobdetails";
        let body = json!({
            "detailed": 1,
            "uuid": job_id,
            "userid": self.user_id,
            "workspaceid": self.workspace_id,
        });

        let return_object = self.post_json(endpoint, body).await?;
        let output_folder = return_object
            .pointer("/agentJob/output_folder")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::missing_field(endpoint, "returnObject.agentJob.output_folder"))?
            .to_string();

        info!("✓ 输出文件夹: {}", output_folder);
        Ok(output_folder)
    }

    /// 列出输出文件夹下的文档
    ///
    /// 过滤条件与排序规则由后端约定固定：仅保留已完成摄取
    /// (ingestion_status=5)、最新版本、非 bundle 子项的文档
    pub async fn get_output_files(&self, output_folder: &str) -> AppResult<Vec<OutputDoc>> {
        info!("📂 拉取输出文件列表...");

        let endpoint = "/tensordrive/get_docs";
        let body = json!({
            "type": "agents",
            "fields": ["uuid", "doc_filename", "is_folder", "doc_extension"],
            "filter": {
                "status": ["", null],
                "parent_folder": output_folder,
                "workspace_id": self.workspace_id,
                "ingestion_status": 5,
                "folder_type": { "operator": "ISNULLANDVALUE", "value": 0 },
                "isbundlechild": { "operator": "ISNULLANDVALUE", "value": 0 },
                "latest_version": 1,
            },
            "parent_folder": output_folder,
            "useruuid": self.user_id,
            "workspaceid": self.workspace_id,
            "order": "is_folder DESC,folder_type ASC,doc_filename ASC",
        });

        let return_object = self.post_json(endpoint, body).await?;
        let docs: Vec<OutputDoc> = serde_json::from_value(return_object).map_err(|e| {
            AppError::Api(ApiError::JsonParseFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })
        })?;

        info!("✓ 找到 {} 个输出文件", docs.len());
        Ok(docs)
    }

    /// 下载文档内容到本地文件
    ///
    /// 响应体按块流式写盘，内存占用与文件大小无关
    pub async fn download_file(&self, doc_uuid: &str, output_path: &Path) -> AppResult<()> {
        info!(
            "⬇️ 下载文件到 {}...",
            output_path.file_name().unwrap_or_default().to_string_lossy()
        );

        let endpoint = "/tensordrive/get_filestream";
        let url = format!("{}{}", self.api_url, endpoint);
        let body = json!({
            "docuuid": doc_uuid,
            "userid": self.user_id,
            "workspaceid": self.workspace_id,
        });

        with_retries(self.max_retries, endpoint, |attempt| {
            let request = self
                .http
                .post(&url)
                .json(&body)
                .timeout(DOWNLOAD_TIMEOUT);
            async move {
                let response = request
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| AppError::request_failed(endpoint, attempt, e))?;

                // 每次尝试都从头覆盖写入，丢弃上一次的半截文件
                let mut file = tokio::fs::File::create(output_path)
                    .await
                    .map_err(|e| AppError::file_write_failed(output_path.display().to_string(), e))?;

                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::request_failed(endpoint, attempt, e))?;
                    file.write_all(&chunk).await.map_err(|e| {
                        AppError::file_write_failed(output_path.display().to_string(), e)
                    })?;
                }

                file.flush()
                    .await
                    .map_err(|e| AppError::file_write_failed(output_path.display().to_string(), e))?;

                Ok(())
            }
        })
        .await?;

        info!(
            "✓ 已下载 {}",
            output_path.file_name().unwrap_or_default().to_string_lossy()
        );
        Ok(())
    }

    // ========== 内部辅助函数 ==========

    /// 发送 JSON 请求并返回 returnObject
    ///
    /// 传输层失败（含非 2xx）按重试策略处理；
    /// success=false 是业务级失败，不重试，直接向上传播
    async fn post_json(&self, endpoint: &str, body: Value) -> AppResult<Value> {
        let url = format!("{}{}", self.api_url, endpoint);

        let response = with_retries(self.max_retries, endpoint, |attempt| {
            let request = self.http.post(&url).json(&body).timeout(JSON_TIMEOUT);
            async move { Self::send_and_parse(request, endpoint, attempt).await }
        })
        .await?;

        Self::expect_success(endpoint, response)
    }

    /// 发送请求并解析 JSON 响应体
    async fn send_and_parse(
        request: reqwest::RequestBuilder,
        endpoint: &str,
        attempt: usize,
    ) -> AppResult<Value> {
        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::request_failed(endpoint, attempt, e))?;

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                // 响应体不是合法 JSON，重试也不会变好
                AppError::Api(ApiError::JsonParseFailed {
                    endpoint: endpoint.to_string(),
                    source: Box::new(e),
                })
            } else {
                AppError::request_failed(endpoint, attempt, e)
            }
        })
    }

    /// 校验 success 字段并取出 returnObject
    fn expect_success(endpoint: &str, response: Value) -> AppResult<Value> {
        if response.get("success").and_then(|v| v.as_bool()) == Some(true) {
            Ok(response.get("returnObject").cloned().unwrap_or(Value::Null))
        } else {
            Err(AppError::bad_response(endpoint, response.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AppError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn transport_error(attempt: usize) -> AppError {
        AppError::request_failed(
            "/test",
            attempt,
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "连接被拒绝"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_k_failures() {
        // K 次传输失败 + 1 次成功 → 恰好 K+1 次尝试
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let start = tokio::time::Instant::now();

        let result = with_retries(5, "/test", |attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt <= 2 {
                    Err(transport_error(attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 第 1 次失败后退避 5 秒，第 2 次失败后退避 10 秒
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_preserves_attempt_count() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result: AppResult<()> = with_retries(3, "/test", |attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transport_error(attempt))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            AppError::Api(ApiError::RequestFailed { attempts, .. }) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("预期 RequestFailed 错误，实际: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_application_error_is_not_retried() {
        // success=false 属于业务级失败，立即向上传播
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result: AppResult<()> = with_retries(5, "/test", |_attempt| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::bad_response("/test", r#"{"success":false}"#))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.unwrap_err(),
            AppError::Api(ApiError::BadResponse { .. })
        ));
    }

    #[test]
    fn test_expect_success_extracts_return_object() {
        let value = serde_json::json!({
            "success": true,
            "returnObject": { "uuid": "job-1" }
        });
        let result = Ren3Client::expect_success("/test", value).unwrap();
        assert_eq!(result["uuid"], "job-1");
    }

    #[test]
    fn test_expect_success_rejects_failure_body() {
        let value = serde_json::json!({ "success": false, "message": "quota exceeded" });
        let err = Ren3Client::expect_success("/test", value).unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::BadResponse { .. })));
    }

    #[test]
    fn test_expect_success_missing_return_object_is_null() {
        let value = serde_json::json!({ "success": true });
        let result = Ren3Client::expect_success("/test", value).unwrap();
        assert!(result.is_null());
    }
}
