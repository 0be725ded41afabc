//! 建库与检索的入口
//!
//! 每次请求只加载一次推理网络，请求结束后释放。

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::codec::{FeatureCodec, FloatFormat, read_store};
use crate::dnn::{InferenceSession, ModelPaths};
use crate::error::{CbirError, Result};
use crate::features::highlight_faces;
use crate::indexer::{BatchIndexer, IndexSummary};
use crate::matcher::{MatchSet, Matcher};
use crate::strategy::Strategy;
use crate::utils::{self, file_name};

/// 建库请求
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// 图片所在目录
    pub directory: PathBuf,
    /// 输出的特征文件
    pub store: PathBuf,
    pub strategy: Strategy,
    pub float_format: FloatFormat,
    pub progress: bool,
}

/// 建库结果
#[derive(Debug, Clone)]
pub struct Generated {
    pub store: PathBuf,
    pub indexed: usize,
    pub skipped: usize,
}

/// 检索请求
#[derive(Debug, Clone)]
pub struct IdentifyRequest {
    pub query: PathBuf,
    pub store: PathBuf,
    pub strategy: Strategy,
    pub top_n: usize,
    /// 保留与查询完全相同的候选
    pub keep_exact_matches: bool,
}

/// 持有模型目录，按请求创建推理会话
#[derive(Debug, Clone)]
pub struct Engine {
    models: ModelPaths,
}

impl Engine {
    pub fn new(models: ModelPaths) -> Self {
        Self { models }
    }

    fn open_session(&self, strategy: &Strategy) -> Result<InferenceSession> {
        InferenceSession::open(&self.models, strategy.networks())
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<Generated> {
        let mut session = self.open_session(&request.strategy)?;
        generate_with(request, &mut session)
    }

    pub fn identify(&self, request: &IdentifyRequest) -> Result<MatchSet> {
        // 深度嵌入向量直接从特征文件中查找，不需要网络
        if request.strategy == Strategy::DeepEmbedding {
            return identify_with(request, &mut InferenceSession::default());
        }
        let mut session = self.open_session(&request.strategy)?;
        identify_with(request, &mut session)
    }
}

/// 使用已有的推理会话建库
pub fn generate_with(
    request: &GenerateRequest,
    session: &mut InferenceSession,
) -> Result<Generated> {
    let start = Instant::now();
    let IndexSummary { indexed, skipped } =
        BatchIndexer::new(request.strategy, FeatureCodec::new(request.float_format))
            .progress(request.progress)
            .index(&request.directory, &request.store, session)?;
    debug!("建库耗时 {:.2}s", start.elapsed().as_secs_f32());
    Ok(Generated { store: request.store.clone(), indexed, skipped })
}

/// 使用已有的推理会话检索
pub fn identify_with(
    request: &IdentifyRequest,
    session: &mut InferenceSession,
) -> Result<MatchSet> {
    let start = Instant::now();
    let query_path = request.query.to_string_lossy();
    let store = read_store(&request.store)?;
    let matcher = Matcher::new(request.strategy, request.top_n)
        .keep_exact_matches(request.keep_exact_matches);

    let matches = match request.strategy {
        Strategy::DeepEmbedding => {
            let name = file_name(&query_path);
            let query = store
                .iter()
                .find(|record| file_name(&record.identifier) == name)
                .ok_or_else(|| CbirError::EmbeddingNotFound(name.to_string()))?;

            let mut matches = matcher.rank(&query_path, &query.vector, &store)?;
            let dir = request.query.parent().unwrap_or(Path::new(""));
            for m in matches.iter_mut() {
                m.identifier = dir.join(file_name(&m.identifier)).to_string_lossy().to_string();
            }
            matches
        }
        strategy => {
            let image = utils::imread(&request.query)?;
            let query = strategy.extract(&image, session)?;
            let mut matches = matcher.rank(&query_path, &query, &store)?;
            if strategy == Strategy::CustomFace {
                annotate(&mut matches, session)?;
            }
            matches
        }
    };

    info!(
        "在 {} 条记录中找到 {} 个匹配，耗时 {:.2}s",
        store.len(),
        matches.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(matches)
}

/// 重新读取匹配图片并标出人脸，读取失败的图片保持未标注
fn annotate(matches: &mut MatchSet, session: &mut InferenceSession) -> Result<()> {
    let detector = session.face_detector()?;
    for m in matches.iter_mut() {
        let mut image = match utils::imread(&m.identifier) {
            Ok(image) => image,
            Err(e) => {
                warn!("无法标注 {}: {}", m.identifier, e);
                continue;
            }
        };
        let faces = highlight_faces(&mut image, detector)?;
        debug!("{} 中标注了 {} 张人脸", m.identifier, faces);
        m.annotated = Some(image);
    }
    Ok(())
}
