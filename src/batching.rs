//! 批次划分模块
//!
//! 纯函数：把有序的文件列表按固定大小切分为连续批次，不打乱顺序

use std::path::PathBuf;
use tracing::info;

/// 一个待处理的批次
///
/// 编号从 1 开始，文件顺序与输入顺序一致
#[derive(Clone, Debug)]
pub struct Batch {
    pub number: usize,
    pub files: Vec<PathBuf>,
}

/// 把文件列表划分为若干批次
///
/// # 参数
/// - `files`: 已排序的文件列表
/// - `batch_size`: 每批最大文件数（必须大于 0）
///
/// # 返回
/// 返回 ⌈N/B⌉ 个连续批次，每批大小 ≤ batch_size
pub fn create_batches(files: Vec<PathBuf>, batch_size: usize) -> Vec<Batch> {
    assert!(batch_size > 0, "batch_size 必须大于 0");

    let batches: Vec<Batch> = files
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            number: i + 1,
            files: chunk.to_vec(),
        })
        .collect();

    info!("✓ 已划分 {} 个批次，每批最多 {} 个文件", batches.len(), batch_size);

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("file_{:03}.json", i))).collect()
    }

    #[test]
    fn test_batch_count_and_sizes() {
        // 65 个文件、每批 30 个 → 3 批（30、30、5）
        let batches = create_batches(make_files(65), 30);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].files.len(), 30);
        assert_eq!(batches[1].files.len(), 30);
        assert_eq!(batches[2].files.len(), 5);
    }

    #[test]
    fn test_batch_numbers_start_at_one() {
        let batches = create_batches(make_files(65), 30);
        let numbers: Vec<usize> = batches.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_concatenation_preserves_order() {
        let files = make_files(65);
        let batches = create_batches(files.clone(), 30);
        let rejoined: Vec<PathBuf> = batches.into_iter().flat_map(|b| b.files).collect();
        assert_eq!(rejoined, files);
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let batches = create_batches(Vec::new(), 30);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let batches = create_batches(make_files(60), 30);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.files.len() == 30));
    }

    #[test]
    fn test_batch_size_larger_than_input() {
        let batches = create_batches(make_files(5), 30);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].files.len(), 5);
    }

    #[test]
    #[should_panic]
    fn test_zero_batch_size_panics() {
        create_batches(make_files(3), 0);
    }
}
