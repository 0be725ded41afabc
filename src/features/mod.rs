//! 各检索策略使用的特征提取函数
//!
//! 除组合特征外均为纯函数，只依赖输入图片与参数。

mod combined;
mod histogram;
mod patch;
mod texture;

pub use combined::*;
pub use histogram::*;
pub use patch::*;
pub use texture::*;

use crate::error::Result;
use crate::image::Image;

/// 颜色直方图与纹理直方图拼接，颜色在前
pub fn texture_and_color(
    image: &Image,
    color_bins: usize,
    texture_bins: usize,
) -> Result<Vec<f32>> {
    let mut feature = color_histogram(image, color_bins, ColorSpace::Bgr)?;
    feature.extend(texture_histogram(image, texture_bins)?);
    Ok(feature)
}
