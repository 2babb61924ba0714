//! # Ren3 Agent Processor
//!
//! 一个把本地 JSON 文档批量提交给 Ren3 AI Agent 处理的客户端
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - Ren3Client 持有唯一的 HTTP 会话，封装重试、
//!   超时与流式下载
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单一职责
//! - `job_poller` - 等待远端任务完成的能力
//! - `csv_merger` - 合并 CSV 结果的能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，发现文件、划分
//!   批次、串行调度、合并结果
//! - `orchestrator/batch_pipeline` - 单批次流水线，执行上传到下载
//!   的完整状态序列
//!
//! ### 支撑模块
//! - `config` - 环境变量配置，必填项缺失时一次性全部报告
//! - `discovery` - 文件发现、最新 promo 文件夹选择、幂等性检查
//! - `batching` - 纯函数批次划分
//! - `error` - 应用错误类型
//! - `logger` - tracing 日志初始化

pub mod batching;
pub mod clients;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;

// 重新导出常用类型
pub use batching::{create_batches, Batch};
pub use clients::Ren3Client;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::App;
