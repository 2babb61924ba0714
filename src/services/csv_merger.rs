//! CSV 合并服务 - 业务能力层
//!
//! 把各批次下载的 CSV 按批次顺序拼成一张表。
//! 列按名字做并集（首次出现的顺序），缺失的单元格留空，
//! 不做任何模式校验

use crate::error::{AppError, AppResult, FileError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 合并统计
#[derive(Debug, Default)]
pub struct MergeStats {
    /// 成功读入的文件数
    pub files_merged: usize,
    /// 合并后的总行数（不含表头）
    pub total_rows: usize,
}

/// 合并多个 CSV 文件为一个
///
/// 单个文件读取失败只记录错误并跳过，不影响其余文件；
/// 行顺序严格按输入文件顺序保留
///
/// # 参数
/// - `csv_files`: 按批次顺序排列的 CSV 文件路径
/// - `output_path`: 合并结果的输出路径
pub fn combine_csvs(csv_files: &[PathBuf], output_path: &Path) -> AppResult<MergeStats> {
    info!("🔗 合并 {} 个 CSV 文件...", csv_files.len());

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    let mut stats = MergeStats::default();

    for csv_file in csv_files {
        match read_rows(csv_file, &mut columns) {
            Ok(file_rows) => {
                info!(
                    "  从 {} 读入 {} 行",
                    csv_file.file_name().unwrap_or_default().to_string_lossy(),
                    file_rows.len()
                );
                stats.files_merged += 1;
                rows.extend(file_rows);
            }
            Err(e) => {
                error!(
                    "  读取 {} 失败: {}",
                    csv_file.file_name().unwrap_or_default().to_string_lossy(),
                    e
                );
            }
        }
    }

    stats.total_rows = rows.len();
    write_rows(output_path, &columns, &rows)?;

    info!("✓ 合并结果已保存: {}", output_path.display());
    info!("  总行数: {}", stats.total_rows);

    Ok(stats)
}

/// 读入单个 CSV 的所有行，同时把新列追加进列并集
fn read_rows(path: &Path, columns: &mut Vec<String>) -> AppResult<Vec<HashMap<String, String>>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::File(FileError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_parse_error(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    for header in &headers {
        if !columns.contains(header) {
            columns.push(header.clone());
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_parse_error(path, e))?;
        let row: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// 按列并集写出合并结果
fn write_rows(
    output_path: &Path,
    columns: &[String],
    rows: &[HashMap<String, String>],
) -> AppResult<()> {
    let write_failed = |e: csv::Error| {
        AppError::File(FileError::WriteFailed {
            path: output_path.display().to_string(),
            source: Box::new(e),
        })
    };

    let mut writer = csv::Writer::from_path(output_path).map_err(write_failed)?;

    writer.write_record(columns).map_err(write_failed)?;
    for row in rows {
        let record: Vec<&str> = columns
            .iter()
            .map(|c| row.get(c).map_or("", |v| v.as_str()))
            .collect();
        writer.write_record(&record).map_err(write_failed)?;
    }

    writer.flush().map_err(|e| {
        AppError::File(FileError::WriteFailed {
            path: output_path.display().to_string(),
            source: Box::new(e),
        })
    })
}

fn csv_parse_error(path: &Path, e: csv::Error) -> AppError {
    AppError::File(FileError::CsvParseFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_combine_same_schema() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "batch_001.csv", "name,score\nfoo,1\nbar,2\n");
        let b = write_csv(dir.path(), "batch_002.csv", "name,score\nbaz,3\n");
        let out = dir.path().join("combined.csv");

        let stats = combine_csvs(&[a, b], &out).unwrap();

        assert_eq!(stats.files_merged, 2);
        assert_eq!(stats.total_rows, 3);
        assert_eq!(
            read_lines(&out),
            vec!["name,score", "foo,1", "bar,2", "baz,3"]
        );
    }

    #[test]
    fn test_schema_union_fills_blanks() {
        // 不同批次的列不一致时取并集，缺失的单元格留空
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "batch_001.csv", "name,score\nfoo,1\n");
        let b = write_csv(dir.path(), "batch_002.csv", "name,region\nbar,eu\n");
        let out = dir.path().join("combined.csv");

        combine_csvs(&[a, b], &out).unwrap();

        assert_eq!(
            read_lines(&out),
            vec!["name,score,region", "foo,1,", "bar,,eu"]
        );
    }

    #[test]
    fn test_merge_associativity() {
        // 先合并 [A, B] 再追加 C，与一次性合并 [A, B, C] 行集一致
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "a.csv", "x\n1\n2\n");
        let b = write_csv(dir.path(), "b.csv", "x\n3\n");
        let c = write_csv(dir.path(), "c.csv", "x\n4\n");

        let ab = dir.path().join("ab.csv");
        combine_csvs(&[a.clone(), b.clone()], &ab).unwrap();
        let ab_c = dir.path().join("ab_c.csv");
        combine_csvs(&[ab, c.clone()], &ab_c).unwrap();

        let abc = dir.path().join("abc.csv");
        combine_csvs(&[a, b, c], &abc).unwrap();

        assert_eq!(read_lines(&ab_c), read_lines(&abc));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "a.csv", "x\n1\n");
        let missing = dir.path().join("missing.csv");
        let out = dir.path().join("combined.csv");

        let stats = combine_csvs(&[a, missing], &out).unwrap();

        assert_eq!(stats.files_merged, 1);
        assert_eq!(stats.total_rows, 1);
    }

    #[test]
    fn test_quoted_fields_survive() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(
            dir.path(),
            "a.csv",
            "name,notes\nfoo,\"hello, world\"\n",
        );
        let out = dir.path().join("combined.csv");

        combine_csvs(&[a], &out).unwrap();

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "hello, world");
    }
}
