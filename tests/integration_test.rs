use ren3_agent_processor::services::csv_merger;
use ren3_agent_processor::{create_batches, discovery, logger, App, Config};
use std::fs;
use std::path::PathBuf;

/// 构造一套测试配置（不触碰环境变量）
fn test_config(processed_dir: &str) -> Config {
    let processed = processed_dir.to_string();
    Config::from_lookup(move |name| match name {
        "REN3_USER_ID" => Some("user-test".to_string()),
        "REN3_WORKSPACE_ID" => Some("ws-test".to_string()),
        "REN3_AGENT_UUID" => Some("agent-test".to_string()),
        "REN3_AGENT_FOLDER" => Some("folder-test".to_string()),
        "REN3_PROCESSED_DIR" => Some(processed.clone()),
        _ => None,
    })
    .expect("测试配置应该有效")
}

/// 65 个输入文件、批次大小 30、1 个批次未产出结果文件的场景：
/// 发现 → 划分 → （模拟批次 2 失败）→ 合并，最终结果只含成功批次的行
#[tokio::test]
async fn test_partial_failure_scenario_offline() {
    let root = tempfile::tempdir().unwrap();

    // 准备 65 个输入文件（外加一个应被排除的特殊文件）
    let promo_dir = root.path().join("promo_20250601_080000");
    fs::create_dir(&promo_dir).unwrap();
    for i in 0..65 {
        fs::write(promo_dir.join(format!("promo_{:03}.json", i)), "{}").unwrap();
    }
    fs::write(promo_dir.join("_manifest.json"), "{}").unwrap();

    let json_files = discovery::find_json_files(&promo_dir).await.unwrap();
    assert_eq!(json_files.len(), 65);

    let batches = create_batches(json_files, 30);
    assert_eq!(batches.len(), 3);
    assert_eq!(
        batches.iter().map(|b| b.files.len()).collect::<Vec<_>>(),
        vec![30, 30, 5]
    );

    // 模拟流水线产出：批次 1、3 成功，批次 2 在定位结果文件时失败
    let processed_dir = root.path().join("processed").join("promo_20250601_080000");
    fs::create_dir_all(&processed_dir).unwrap();

    let mut csv_files: Vec<PathBuf> = Vec::new();
    for batch in &batches {
        if batch.number == 2 {
            continue; // 该批次被废弃，不产出文件
        }
        let path = processed_dir.join(format!("batch_{:03}.csv", batch.number));
        let mut content = String::from("promo_name,verdict\n");
        for file in &batch.files {
            content.push_str(&format!(
                "{},ok\n",
                file.file_name().unwrap().to_string_lossy()
            ));
        }
        fs::write(&path, content).unwrap();
        csv_files.push(path);
    }

    assert_eq!(csv_files.len(), 2);

    let final_path = processed_dir.join("final_analysis_20250601_120000.csv");
    let stats = csv_merger::combine_csvs(&csv_files, &final_path).unwrap();

    // 只有成功批次的行进入最终结果：30 + 5
    assert_eq!(stats.files_merged, 2);
    assert_eq!(stats.total_rows, 35);

    // 产出了 final_analysis_* 文件后，幂等性检查应该命中
    assert!(discovery::already_processed(
        &root.path().join("processed"),
        "promo_20250601_080000"
    )
    .await
    .unwrap());
}

/// 幂等性：已有 final_analysis_* 的文件夹不应被重复处理
#[tokio::test]
async fn test_idempotency_skip() {
    let root = tempfile::tempdir().unwrap();
    let processed_root = root.path().join("processed");
    let processed_dir = processed_root.join("promo_x");
    fs::create_dir_all(&processed_dir).unwrap();
    fs::write(processed_dir.join("final_analysis_20250101_000000.csv"), "a\n").unwrap();

    assert!(discovery::already_processed(&processed_root, "promo_x")
        .await
        .unwrap());
    assert!(!discovery::already_processed(&processed_root, "promo_y")
        .await
        .unwrap());
}

/// 输出目录无法创建时，错误里要带上具体路径
#[tokio::test]
async fn test_unwritable_processed_dir_reports_write_error() {
    use ren3_agent_processor::error::{AppError, FileError};

    let root = tempfile::tempdir().unwrap();
    let promo_dir = root.path().join("promo_bad_dest");
    fs::create_dir(&promo_dir).unwrap();
    fs::write(promo_dir.join("a.json"), "{}").unwrap();

    // 在输出位置预先放一个同名普通文件，目录创建必然失败
    let processed_root = root.path().join("processed");
    fs::create_dir(&processed_root).unwrap();
    fs::write(processed_root.join("promo_bad_dest"), "").unwrap();

    let config = test_config(processed_root.to_str().unwrap());
    let app = App::initialize(config).unwrap();

    match app.run(&promo_dir).await.unwrap_err() {
        AppError::File(FileError::WriteFailed { path, .. }) => {
            assert!(path.contains("promo_bad_dest"), "路径信息丢失: {}", path);
        }
        other => panic!("预期 WriteFailed 错误，实际: {:?}", other),
    }
}

/// 应用初始化只依赖配置，不需要网络
#[test]
fn test_app_initialize() {
    let config = test_config("processed");
    assert!(App::initialize(config).is_ok());
}

/// 完整流水线的在线测试
///
/// 需要真实的 Ren3 环境变量和一个待处理目录，
/// 手动运行：cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_process_promo_folder_live() {
    logger::init();

    let config = Config::from_env().expect("加载配置失败");
    let promo_folder = std::env::var("REN3_PROMO_FOLDER")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("output/promo_test"));

    let app = App::initialize(config).expect("初始化应用失败");
    let result = app.run(&promo_folder).await.expect("处理 promo 文件夹失败");

    assert!(result.is_some(), "应该产出合并结果");
}
