use crate::error::{AppResult, AppError, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// Ren3 后端服务地址
    pub api_url: String,
    /// 用户 UUID
    pub user_id: String,
    /// 工作区 UUID
    pub workspace_id: String,
    /// Agent UUID
    pub agent_uuid: String,
    /// Agent 文件夹
    pub agent_folder: String,
    /// 每批上传的文件数量
    pub batch_size: usize,
    /// 轮询间隔（秒）
    pub poll_interval: u64,
    /// 最大重试次数
    pub max_retries: usize,
    /// 轮询时间上限（秒），未设置时无限等待
    pub poll_timeout_secs: Option<u64>,
    /// 待处理 promo 文件夹的根目录
    pub output_dir: String,
    /// 处理结果输出的根目录
    pub processed_dir: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 必填项缺失时一次性报告所有缺失的变量名
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从自定义查找函数加载配置（便于测试）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut missing = Vec::new();
        let mut required = |name: &str| -> String {
            match lookup(name).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let user_id = required("REN3_USER_ID");
        let workspace_id = required("REN3_WORKSPACE_ID");
        let agent_uuid = required("REN3_AGENT_UUID");
        let agent_folder = required("REN3_AGENT_FOLDER");

        if !missing.is_empty() {
            return Err(AppError::Config(ConfigError::MissingVars { names: missing }));
        }

        // 批次大小为 0 没有意义，在这里拦截而不是留给下游崩溃
        let batch_size = lookup("BATCH_SIZE").and_then(|v| v.parse().ok()).unwrap_or(30);
        if batch_size == 0 {
            return Err(AppError::Config(ConfigError::InvalidValue {
                name: "BATCH_SIZE".to_string(),
                value: "0".to_string(),
                reason: "批次大小必须大于 0".to_string(),
            }));
        }

        Ok(Self {
            api_url: lookup("REN3_API_URL").unwrap_or_else(|| "https://backend.ren3.ai".to_string()),
            user_id,
            workspace_id,
            agent_uuid,
            agent_folder,
            batch_size,
            poll_interval: lookup("POLL_INTERVAL").and_then(|v| v.parse().ok()).unwrap_or(15),
            max_retries: lookup("MAX_RETRIES").and_then(|v| v.parse().ok()).unwrap_or(3),
            poll_timeout_secs: lookup("POLL_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
            output_dir: lookup("REN3_OUTPUT_DIR").unwrap_or_else(|| "output".to_string()),
            processed_dir: lookup("REN3_PROCESSED_DIR").unwrap_or_else(|| "processed".to_string()),
        })
    }
}
