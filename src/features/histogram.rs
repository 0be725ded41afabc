use clap::ValueEnum;
use ndarray::ArrayView3;

use crate::distance::l2_normalize;
use crate::error::{CbirError, Result};
use crate::image::Image;
use crate::utils::to_hsv;

/// 每个通道最多 256 个桶
pub const MAX_COLOR_BINS: usize = 256;

/// 颜色直方图统计所用的颜色空间
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpace {
    #[default]
    Bgr,
    Hsv,
}

/// 三维颜色直方图
///
/// 每个通道在 [0, 256) 上等宽划分为 `bins` 个桶，索引为 `c2 * bins² + c1 * bins + c0`，
/// 结果除以像素总数，空图片返回全零向量。`bins` 必须在 1 到 256 之间。
pub fn color_histogram_3d(image: ArrayView3<'_, u8>, bins: usize) -> Result<Vec<f32>> {
    if bins == 0 || bins > MAX_COLOR_BINS {
        return Err(CbirError::InvalidParameter(format!(
            "颜色直方图的桶数必须在 1 到 {} 之间: {}",
            MAX_COLOR_BINS, bins
        )));
    }
    let bin_width = 256.0 / bins as f32;
    let bin = |v: u8| ((v as f32 / bin_width) as usize).min(bins - 1);

    let mut histogram = vec![0f32; bins * bins * bins];
    for pixel in image.rows() {
        let index = bin(pixel[2]) * bins * bins + bin(pixel[1]) * bins + bin(pixel[0]);
        histogram[index] += 1.;
    }

    let total = (image.dim().0 * image.dim().1) as f32;
    if total > 0. {
        histogram.iter_mut().for_each(|v| *v /= total);
    }
    Ok(histogram)
}

/// 在指定颜色空间下计算整张图片的三维颜色直方图
pub fn color_histogram(image: &Image, bins: usize, space: ColorSpace) -> Result<Vec<f32>> {
    match space {
        ColorSpace::Bgr => color_histogram_3d(image.view(), bins),
        ColorSpace::Hsv => color_histogram_3d(to_hsv(image)?.view(), bins),
    }
}

/// 上下两半分别统计颜色直方图后拼接，长度为 `2 * bins³`
///
/// 两半的高度均为 `rows / 2`，行数为奇数时最后一行不参与统计。
pub fn multi_part_histogram(image: &Image, bins: usize) -> Result<Vec<f32>> {
    let half = image.rows() / 2;
    let mut feature = color_histogram_3d(image.row_band(0, half), bins)?;
    feature.extend(color_histogram_3d(image.row_band(half, half * 2), bins)?);
    Ok(feature)
}

pub const HUE_BINS: usize = 50;
pub const SATURATION_BINS: usize = 60;

/// 色调-饱和度二维直方图，先线性拉伸到 [0, 1] 再做 L2 归一化
pub fn hue_saturation_histogram(image: &Image) -> Result<Vec<f32>> {
    let hsv = to_hsv(image)?;

    let mut histogram = vec![0f32; HUE_BINS * SATURATION_BINS];
    for pixel in hsv.view().rows() {
        let h = (pixel[0] as usize * HUE_BINS / 180).min(HUE_BINS - 1);
        let s = pixel[1] as usize * SATURATION_BINS / 256;
        histogram[h * SATURATION_BINS + s] += 1.;
    }

    let min = histogram.iter().copied().fold(f32::INFINITY, f32::min);
    let max = histogram.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    for v in histogram.iter_mut() {
        *v = if range > f32::EPSILON {
            (*v - min) / range
        } else {
            0.
        };
    }

    Ok(l2_normalize(&histogram))
}
