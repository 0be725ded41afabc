use thiserror::Error;

/// 检索流程中可能出现的错误
#[derive(Debug, Error)]
pub enum CbirError {
    /// 图片不存在或无法解码
    #[error("无法读取图片 {path}: {reason}")]
    ImageLoad { path: String, reason: String },
    /// 图片尺寸小于 7x7，无法提取中心块
    #[error("图片尺寸过小: {rows}x{cols}")]
    ImageTooSmall { rows: usize, cols: usize },
    #[error("特征维度不一致: {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },
    /// 特征文件中存在无法解析的行，行号从 1 开始
    #[error("特征文件第 {line} 行解析失败: {reason}")]
    CsvParse { line: usize, reason: String },
    #[error("特征文件中找不到图片 {0} 的嵌入向量")]
    EmbeddingNotFound(String),
    #[error("神经网络推理失败: {0}")]
    Inference(String),
    #[error("不支持的操作: {0}")]
    Unsupported(String),
    /// 直方图桶数等参数超出有效范围
    #[error("无效的参数: {0}")]
    InvalidParameter(String),
    #[error("OpenCV 调用失败: {0}")]
    OpenCv(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<opencv::Error> for CbirError {
    fn from(err: opencv::Error) -> Self {
        Self::OpenCv(err.to_string())
    }
}

pub type Result<T, E = CbirError> = std::result::Result<T, E>;
