use crate::error::{CbirError, Result};
use crate::image::Image;

/// 中心块的边长
pub const PATCH_SIZE: usize = 7;

/// 提取图片中心 7x7 像素块，按行展开为 BGR 顺序的 147 维向量
pub fn center_patch(image: &Image) -> Result<Vec<f32>> {
    if image.rows() < PATCH_SIZE || image.cols() < PATCH_SIZE {
        return Err(CbirError::ImageTooSmall { rows: image.rows(), cols: image.cols() });
    }

    let top = image.rows() / 2 - PATCH_SIZE / 2;
    let left = image.cols() / 2 - PATCH_SIZE / 2;

    let mut feature = Vec::with_capacity(PATCH_SIZE * PATCH_SIZE * 3);
    for row in top..top + PATCH_SIZE {
        for col in left..left + PATCH_SIZE {
            feature.extend(image.pixel(row, col).map(f32::from));
        }
    }
    Ok(feature)
}
