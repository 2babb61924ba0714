//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，不关心批次流程：
//! - `job_poller` - 等待远端任务完成的能力
//! - `csv_merger` - 合并 CSV 结果的能力

pub mod csv_merger;
pub mod job_poller;
