use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{info, warn};
use walkdir::WalkDir;

use crate::codec::{FeatureCodec, FeatureRecord, WriteMode};
use crate::dnn::InferenceSession;
use crate::error::{CbirError, Result};
use crate::strategy::Strategy;
use crate::utils::{self, pb_style};

/// 批量建库时只处理该扩展名的文件，区分大小写
pub const INDEX_EXTENSION: &str = "jpg";

/// 建库结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub indexed: usize,
    pub skipped: usize,
}

/// 列出目录下（不递归）扩展名为 `.jpg` 的普通文件，按文件名排序
pub fn eligible_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        let message = format!("目录不存在: {}", dir.display());
        return Err(io::Error::new(io::ErrorKind::NotFound, message).into());
    }

    let mut images = vec![];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|s| s.to_str()) == Some(INDEX_EXTENSION) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// 遍历目录，为每张图片提取特征并写入特征文件
pub struct BatchIndexer {
    strategy: Strategy,
    codec: FeatureCodec,
    progress: bool,
}

impl BatchIndexer {
    pub fn new(strategy: Strategy, codec: FeatureCodec) -> Self {
        Self { strategy, codec, progress: true }
    }

    /// 是否显示进度条
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// 为 `dir` 中的图片建库，输出文件总会被覆盖
    ///
    /// 无法读取或提取失败的图片会被跳过，参数无效或写入特征文件失败则中止。
    pub fn index(
        &self,
        dir: impl AsRef<Path>,
        output: impl AsRef<Path>,
        session: &mut InferenceSession,
    ) -> Result<IndexSummary> {
        let (dir, output) = (dir.as_ref(), output.as_ref());
        if self.strategy == Strategy::DeepEmbedding {
            return Err(CbirError::Unsupported("深度嵌入向量需要由外部预先计算".to_string()));
        }

        let images = eligible_images(dir)?;
        info!("在 {} 中找到 {} 张图片，使用策略 {}", dir.display(), images.len(), self.strategy);

        let pb = if self.progress {
            ProgressBar::new(images.len() as u64).with_style(pb_style())
        } else {
            ProgressBar::hidden()
        };

        let mut summary = IndexSummary::default();
        for path in images {
            let identifier = path.to_string_lossy().to_string();
            pb.set_message(utils::file_name(&identifier).to_string());

            let extracted =
                utils::imread(&path).and_then(|image| self.strategy.extract(&image, session));
            let vector = match extracted {
                Ok(vector) => vector,
                // 参数错误对每张图片都成立，直接中止
                Err(e @ CbirError::InvalidParameter(_)) => {
                    pb.abandon();
                    return Err(e);
                }
                Err(e) => {
                    pb.suspend(|| warn!("跳过图片 {}: {}", identifier, e));
                    summary.skipped += 1;
                    pb.inc(1);
                    continue;
                }
            };

            let mode = if summary.indexed == 0 {
                WriteMode::Truncate
            } else {
                WriteMode::Append
            };
            self.codec.write(output, &FeatureRecord { identifier, vector }, mode)?;
            summary.indexed += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        if summary.indexed == 0 {
            File::create(output)?;
        }
        info!(
            "写入 {} 条记录到 {}，跳过 {} 张图片",
            summary.indexed,
            output.display(),
            summary.skipped
        );
        Ok(summary)
    }
}
