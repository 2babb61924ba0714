//! Ren3 API 响应数据模型

use serde::Deserialize;

/// 任务日志条目
///
/// `type` 为日志类型码（2 表示终态），`text` 为自由文本
#[derive(Clone, Debug, Deserialize)]
pub struct JobLog {
    #[serde(rename = "type", default)]
    pub log_type: i64,
    #[serde(default)]
    pub text: String,
}

impl JobLog {
    pub fn new(log_type: i64, text: impl Into<String>) -> Self {
        Self {
            log_type,
            text: text.into(),
        }
    }
}

/// 输出文件夹中的一个文档
#[derive(Clone, Debug, Deserialize)]
pub struct OutputDoc {
    pub uuid: String,
    #[serde(default)]
    pub doc_filename: String,
}
