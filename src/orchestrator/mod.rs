//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（初始化、运行）
//! - 文件发现、批次划分、结果合并
//! - 批次之间严格串行，单批失败不中断整体
//!
//! ### `batch_pipeline` - 单批次流水线
//! - 上传 → 摄取等待 → 校验 → 启动任务 → 轮询 → 定位结果 → 下载
//! - 严格顺序的状态序列，任何一步失败只废弃当前批次
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Batch>)
//!     ↓
//! batch_pipeline (处理单个 Batch)
//!     ↓
//! services (能力层：job_poller / csv_merger)
//!     ↓
//! clients (基础设施：Ren3Client)
//! ```

pub mod batch_pipeline;
pub mod batch_processor;

pub use batch_pipeline::process_batch;
pub use batch_processor::App;
