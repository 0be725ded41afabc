use std::fmt;

use clap::ValueEnum;

use crate::distance::{
    Order, cosine_distance, euclidean_distance, histogram_intersection, l2_normalize,
    mean_part_intersection, sum_squared_difference,
};
use crate::dnn::{InferenceSession, Networks};
use crate::error::{CbirError, Result};
use crate::features::{self, ColorSpace};
use crate::image::Image;

/// 检索策略的名称，用于命令行与默认特征文件名
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// 中心 7x7 像素块，差的平方和
    Baseline,
    /// 三维颜色直方图，直方图交
    Histogram,
    /// 上下两半的颜色直方图，直方图交的平均值
    MultiHistogram,
    /// 颜色与纹理直方图，欧氏距离
    TextureColor,
    /// 预先计算的深度嵌入向量，余弦距离
    DeepEmbedding,
    /// 颜色、纹理、CNN 与边缘的组合特征
    Custom,
    /// 组合特征加人脸嵌入
    CustomFace,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Histogram => "histogram",
            Self::MultiHistogram => "multi-histogram",
            Self::TextureColor => "texture-color",
            Self::DeepEmbedding => "deep-embedding",
            Self::Custom => "custom",
            Self::CustomFace => "custom-face",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 一种检索策略：特征提取方式、比较方式与排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Baseline,
    Histogram { bins: usize, color_space: ColorSpace },
    MultiHistogram { bins: usize },
    TextureColor { color_bins: usize, texture_bins: usize },
    DeepEmbedding,
    /// `weighted` 为真时使用分段加权距离，否则使用整体欧氏距离
    Custom { weighted: bool },
    CustomFace,
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Baseline => StrategyKind::Baseline,
            Self::Histogram { .. } => StrategyKind::Histogram,
            Self::MultiHistogram { .. } => StrategyKind::MultiHistogram,
            Self::TextureColor { .. } => StrategyKind::TextureColor,
            Self::DeepEmbedding => StrategyKind::DeepEmbedding,
            Self::Custom { .. } => StrategyKind::Custom,
            Self::CustomFace => StrategyKind::CustomFace,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// 提取特征时需要加载的网络
    pub fn networks(&self) -> Networks {
        match self {
            Self::Custom { .. } => Networks { features: true, faces: false },
            Self::CustomFace => Networks { features: true, faces: true },
            _ => Networks::default(),
        }
    }

    /// 提取一张图片的特征向量
    pub fn extract(&self, image: &Image, session: &mut InferenceSession) -> Result<Vec<f32>> {
        match *self {
            Self::Baseline => features::center_patch(image),
            Self::Histogram { bins, color_space } => {
                features::color_histogram(image, bins, color_space)
            }
            Self::MultiHistogram { bins } => features::multi_part_histogram(image, bins),
            Self::TextureColor { color_bins, texture_bins } => {
                features::texture_and_color(image, color_bins, texture_bins)
            }
            Self::DeepEmbedding => {
                Err(CbirError::Unsupported("深度嵌入向量需要由外部预先计算".to_string()))
            }
            Self::Custom { .. } => features::custom_feature(image, session.network()?),
            Self::CustomFace => {
                let (network, detector, encoder) = session.all()?;
                features::custom_face_feature(image, network, detector, encoder)
            }
        }
    }

    /// 比较两个特征向量，返回距离或相似度
    pub fn score(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        match self {
            Self::Baseline => sum_squared_difference(a, b),
            Self::Histogram { .. } => histogram_intersection(a, b),
            Self::MultiHistogram { .. } => mean_part_intersection(a, b, 2),
            Self::TextureColor { .. } => euclidean_distance(a, b),
            Self::DeepEmbedding => cosine_distance(&l2_normalize(a), &l2_normalize(b)),
            Self::Custom { weighted: true } => features::weighted_custom_distance(a, b),
            Self::Custom { weighted: false } | Self::CustomFace => euclidean_distance(a, b),
        }
    }

    pub fn order(&self) -> Order {
        match self {
            Self::Histogram { .. } | Self::MultiHistogram { .. } => Order::Descending,
            _ => Order::Ascending,
        }
    }

    /// 得分恰好为 0 的候选是否视为重复图片而丢弃
    pub fn drops_exact_matches(&self) -> bool {
        matches!(self, Self::Baseline)
    }

    /// 特征长度随人脸数量变化，长度不同的候选直接跳过
    pub fn has_variable_length(&self) -> bool {
        matches!(self, Self::CustomFace)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Histogram { bins, color_space } => {
                write!(f, "{}(bins={}, {:?})", self.name(), bins, color_space)
            }
            Self::MultiHistogram { bins } => write!(f, "{}(bins={})", self.name(), bins),
            Self::TextureColor { color_bins, texture_bins } => {
                write!(f, "{}(bins={}, texture_bins={})", self.name(), color_bins, texture_bins)
            }
            Self::Custom { weighted: true } => write!(f, "{}(weighted)", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order() {
        assert_eq!(Strategy::Baseline.order(), Order::Ascending);
        assert_eq!(Strategy::MultiHistogram { bins: 8 }.order(), Order::Descending);
        assert_eq!(
            Strategy::Histogram { bins: 8, color_space: ColorSpace::Bgr }.order(),
            Order::Descending
        );
        assert_eq!(Strategy::DeepEmbedding.order(), Order::Ascending);
    }

    #[test]
    fn test_networks() {
        assert_eq!(Strategy::Baseline.networks(), Networks::default());
        assert!(Strategy::Custom { weighted: false }.networks().features);
        assert!(Strategy::CustomFace.networks().faces);
    }

    #[test]
    fn test_extract_without_networks() {
        let image = Image::filled(16, 16, [10, 20, 30]);
        let mut session = InferenceSession::default();
        assert_eq!(Strategy::Baseline.extract(&image, &mut session).unwrap().len(), 147);
        assert_eq!(
            Strategy::TextureColor { color_bins: 4, texture_bins: 8 }
                .extract(&image, &mut session)
                .unwrap()
                .len(),
            72
        );
        assert!(matches!(
            Strategy::DeepEmbedding.extract(&image, &mut session),
            Err(CbirError::Unsupported(_))
        ));
        assert!(Strategy::Custom { weighted: false }.extract(&image, &mut session).is_err());
    }

    #[test]
    fn test_extract_zero_bins() {
        let image = Image::filled(16, 16, [10, 20, 30]);
        let mut session = InferenceSession::default();
        let strategies = [
            Strategy::Histogram { bins: 0, color_space: ColorSpace::Bgr },
            Strategy::Histogram { bins: 0, color_space: ColorSpace::Hsv },
            Strategy::MultiHistogram { bins: 0 },
            Strategy::TextureColor { color_bins: 0, texture_bins: 8 },
            Strategy::TextureColor { color_bins: 4, texture_bins: 0 },
        ];
        for strategy in strategies {
            let result = strategy.extract(&image, &mut session);
            assert!(matches!(result, Err(CbirError::InvalidParameter(_))), "{}", strategy);
        }
    }

    #[test]
    fn test_deep_embedding_score_ignores_scale() {
        let score = Strategy::DeepEmbedding.score(&[1., 2., 3.], &[2., 4., 6.]).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn test_multi_histogram_score() {
        let a = [0.5, 0.5, 1., 0.];
        let b = [0.5, 0.5, 0., 1.];
        assert_eq!(Strategy::MultiHistogram { bins: 1 }.score(&a, &b).unwrap(), 0.5);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(StrategyKind::MultiHistogram.to_string(), "multi-histogram");
        assert_eq!(Strategy::Custom { weighted: true }.name(), "custom");
    }
}
