use anyhow::{Context, Result};
use ren3_agent_processor::{discovery, logger, App, Config};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 初始化日志
    logger::init();

    match run().await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("💥 致命错误: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// 驱动主流程
///
/// 返回 true 表示产出了合并结果（或文件夹已处理过）
async fn run() -> Result<bool> {
    // 加载配置
    let config = Config::from_env().context("加载配置失败")?;

    // 选择待处理的 promo 文件夹：优先使用命令行参数，
    // 否则自动选择最近修改的一个
    let promo_folder = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            match discovery::latest_promo_folder(config.output_dir.as_ref()).await? {
                Some(folder) => folder,
                None => {
                    error!("没有可处理的 promo 文件夹");
                    return Ok(false);
                }
            }
        }
    };

    let folder_name = promo_folder
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    // 幂等性检查：已处理过的文件夹直接跳过，不触碰远端服务
    if discovery::already_processed(config.processed_dir.as_ref(), &folder_name).await? {
        info!("文件夹已处理过，跳过: {}", folder_name);
        return Ok(true);
    }

    // 初始化并运行应用
    let app = App::initialize(config)?;

    match app.run(&promo_folder).await? {
        Some(final_path) => {
            info!("SUCCESS! 最终输出: {}", final_path.display());
            Ok(true)
        }
        None => {
            error!("FAILED! 详情见上方日志");
            Ok(false)
        }
    }
}
