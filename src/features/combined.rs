use log::debug;

use super::histogram::{
    ColorSpace, HUE_BINS, SATURATION_BINS, color_histogram, hue_saturation_histogram,
};
use super::texture::{LBP_BINS, edge_feature, lbp_histogram};
use crate::distance::{cosine_distance, euclidean_distance, l2_normalize};
use crate::dnn::{FaceDetector, FaceEncoder, FeatureNetwork};
use crate::error::{CbirError, Result};
use crate::image::Image;
use crate::utils::draw_rect;

/// 人脸特征的最低置信度
pub const FACE_CONFIDENCE: f32 = 0.3;
/// 标注匹配结果时的最低置信度
pub const HIGHLIGHT_CONFIDENCE: f32 = 0.5;
/// 人脸组合特征中 HSV 颜色直方图每个通道的桶数
pub const FACE_COLOR_BINS: usize = 8;

/// 组合特征：色调-饱和度直方图、LBP 直方图、CNN 输出、边缘数量，各部分独立 L2 归一化后拼接
pub fn custom_feature(image: &Image, network: &mut dyn FeatureNetwork) -> Result<Vec<f32>> {
    let mut feature = hue_saturation_histogram(image)?;
    feature.extend(l2_normalize(&lbp_histogram(image)?));
    feature.extend(l2_normalize(&network.forward(image)?));
    feature.extend(edge_feature(image)?);
    Ok(feature)
}

/// 带人脸的组合特征：HSV 颜色直方图、LBP 直方图、CNN 输出，再按检测顺序拼接每张人脸的嵌入
///
/// 向量长度随检测到的人脸数量变化。
pub fn custom_face_feature(
    image: &Image,
    network: &mut dyn FeatureNetwork,
    detector: &mut dyn FaceDetector,
    encoder: &mut dyn FaceEncoder,
) -> Result<Vec<f32>> {
    let mut feature = l2_normalize(&color_histogram(image, FACE_COLOR_BINS, ColorSpace::Hsv)?);
    feature.extend(l2_normalize(&lbp_histogram(image)?));
    feature.extend(l2_normalize(&network.forward(image)?));
    feature.extend(face_embeddings(image, detector, encoder)?);
    Ok(feature)
}

/// 置信度高于 0.3 的每张人脸的嵌入向量，按检测器输出顺序拼接
pub fn face_embeddings(
    image: &Image,
    detector: &mut dyn FaceDetector,
    encoder: &mut dyn FaceEncoder,
) -> Result<Vec<f32>> {
    let mut embeddings = vec![];
    for detection in detector.detect(image)? {
        if detection.confidence <= FACE_CONFIDENCE {
            continue;
        }
        let rect = detection.rect(image.rows(), image.cols());
        if rect.is_empty() {
            debug!("跳过图片范围外的人脸: {:?}", detection);
            continue;
        }
        embeddings.extend(encoder.encode(&image.crop(rect))?);
    }
    Ok(embeddings)
}

/// 用绿色边框标出置信度高于 0.5 的人脸，返回标注数量
pub fn highlight_faces(image: &mut Image, detector: &mut dyn FaceDetector) -> Result<usize> {
    let mut count = 0;
    for detection in detector.detect(image)? {
        if detection.confidence > HIGHLIGHT_CONFIDENCE {
            let rect = detection.rect(image.rows(), image.cols());
            draw_rect(image, rect, [0, 255, 0], 2)?;
            count += 1;
        }
    }
    Ok(count)
}

/// 组合特征的加权距离权重：颜色、纹理、CNN、边缘
pub const CUSTOM_WEIGHTS: [f32; 4] = [0.4, 0.1, 0.2, 0.3];

/// 组合特征的加权距离
///
/// 按 3000 / 256 / 剩余 / 1 切分向量，CNN 部分使用余弦距离，其余部分使用欧氏距离。
pub fn weighted_custom_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    const COLOR: usize = HUE_BINS * SATURATION_BINS;
    const FIXED: usize = COLOR + LBP_BINS + 1;

    if a.len() != b.len() {
        return Err(CbirError::DimensionMismatch { left: a.len(), right: b.len() });
    }
    if a.len() < FIXED {
        return Err(CbirError::DimensionMismatch { left: a.len(), right: FIXED });
    }

    let dnn_end = a.len() - 1;
    let [w_color, w_texture, w_dnn, w_edge] = CUSTOM_WEIGHTS;
    let color = euclidean_distance(&a[..COLOR], &b[..COLOR])?;
    let texture = euclidean_distance(&a[COLOR..COLOR + LBP_BINS], &b[COLOR..COLOR + LBP_BINS])?;
    let dnn = cosine_distance(&a[COLOR + LBP_BINS..dnn_end], &b[COLOR + LBP_BINS..dnn_end])?;
    let edge = euclidean_distance(&a[dnn_end..], &b[dnn_end..])?;
    Ok(w_color * color + w_texture * texture + w_dnn * dnn + w_edge * edge)
}
