use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置错误
    Config(ConfigError),
    /// 文件操作错误
    File(FileError),
    /// API 调用错误
    Api(ApiError),
    /// 业务逻辑错误
    Business(BusinessError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::Business(e) => Some(e),
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 必填环境变量缺失（一次性收集所有缺失项）
    MissingVars {
        names: Vec<String>,
    },
    /// 环境变量的值非法
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVars { names } => {
                write!(f, "缺少必填环境变量: {}", names.join(", "))
            }
            ConfigError::InvalidValue { name, value, reason } => {
                write!(f, "环境变量 {} 的值非法 ({}): {}", name, value, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 目录不存在
    DirectoryNotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// CSV 解析失败
    CsvParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::DirectoryNotFound { path } => write!(f, "目录不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::CsvParseFailed { path, source } => {
                write!(f, "CSV解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::CsvParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 传输层失败（超时、连接错误、非 2xx 状态），重试耗尽后携带尝试次数
    RequestFailed {
        endpoint: String,
        attempts: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务端明确返回 success=false，属于业务级失败，不重试
    BadResponse {
        endpoint: String,
        body: String,
    },
    /// JSON 解析失败，不重试
    JsonParseFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 响应中缺少预期字段
    MissingField {
        endpoint: String,
        field: String,
    },
    /// 轮询超过配置的时间上限
    PollTimeout {
        job_id: String,
        waited_secs: u64,
    },
    /// HTTP 客户端构建失败
    ClientBuildFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed {
                endpoint,
                attempts,
                source,
            } => {
                write!(
                    f,
                    "API请求失败 ({}, 已尝试 {} 次): {}",
                    endpoint, attempts, source
                )
            }
            ApiError::BadResponse { endpoint, body } => {
                write!(f, "API返回失败响应 ({}): {}", endpoint, body)
            }
            ApiError::JsonParseFailed { endpoint, source } => {
                write!(f, "JSON解析失败 ({}): {}", endpoint, source)
            }
            ApiError::MissingField { endpoint, field } => {
                write!(f, "API响应缺少字段 ({}): {}", endpoint, field)
            }
            ApiError::PollTimeout { job_id, waited_secs } => {
                write!(f, "轮询超时 (任务: {}, 已等待 {} 秒)", job_id, waited_secs)
            }
            ApiError::ClientBuildFailed { source } => {
                write!(f, "HTTP客户端构建失败: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. }
            | ApiError::JsonParseFailed { source, .. }
            | ApiError::ClientBuildFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 输出文件列表中找不到预期的结果文件
    ArtifactNotFound {
        batch_num: usize,
        filename: String,
    },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ArtifactNotFound { batch_num, filename } => {
                write!(
                    f,
                    "批次 {} 的输出中找不到结果文件: {}",
                    batch_num, filename
                )
            }
        }
    }
}

impl std::error::Error for BusinessError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            endpoint: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建传输层请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        attempts: usize,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            attempts,
            source: Box::new(source),
        })
    }

    /// 创建业务级失败响应错误
    pub fn bad_response(endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            body: body.into(),
        })
    }

    /// 创建响应字段缺失错误
    pub fn missing_field(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::Api(ApiError::MissingField {
            endpoint: endpoint.into(),
            field: field.into(),
        })
    }

    /// 创建文件写入失败错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 是否属于可重试的传输层失败
    ///
    /// 只有传输层失败可以重试；success=false 等业务级失败直接向上传播
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Api(ApiError::RequestFailed { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
