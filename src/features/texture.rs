use ndarray::Array2;
use opencv::core::{self, CV_32F, Mat};
use opencv::imgproc;
use opencv::prelude::*;

use crate::distance::l2_normalize;
use crate::error::{CbirError, Result};
use crate::image::Image;
use crate::utils::{gray_mat, to_gray};

/// 灰度图的 3x3 Sobel 梯度幅值 `sqrt(dx² + dy²)`，类型为 CV_32F
pub fn gradient_magnitude(image: &Image) -> Result<Mat> {
    let gray = gray_mat(image)?;
    let mut dx = Mat::default();
    let mut dy = Mat::default();
    imgproc::sobel(&gray, &mut dx, CV_32F, 1, 0, 3, 1., 0., core::BORDER_DEFAULT)?;
    imgproc::sobel(&gray, &mut dy, CV_32F, 0, 1, 3, 1., 0., core::BORDER_DEFAULT)?;

    let mut magnitude = Mat::default();
    core::magnitude(&dx, &dy, &mut magnitude)?;
    Ok(magnitude)
}

/// 在 [0, 最大幅值] 上等宽划分 `bins` 个桶统计梯度幅值，并除以像素总数
///
/// 最大幅值为 0 时所有像素计入第一个桶。
pub fn magnitude_histogram(magnitude: &[f32], bins: usize) -> Result<Vec<f32>> {
    if bins == 0 {
        return Err(CbirError::InvalidParameter("纹理直方图的桶数必须大于 0".to_string()));
    }
    let mut histogram = vec![0f32; bins];
    if magnitude.is_empty() {
        return Ok(histogram);
    }

    let max = magnitude.iter().copied().fold(0f32, f32::max);
    let bin_width = max / bins as f32;
    for &m in magnitude {
        let index = if max > 0. {
            ((m / bin_width) as usize).min(bins - 1)
        } else {
            0
        };
        histogram[index] += 1.;
    }

    let total = magnitude.len() as f32;
    histogram.iter_mut().for_each(|v| *v /= total);
    Ok(histogram)
}

/// 纹理直方图：灰度 -> Sobel -> 梯度幅值直方图
pub fn texture_histogram(image: &Image, bins: usize) -> Result<Vec<f32>> {
    let magnitude = gradient_magnitude(image)?;
    magnitude_histogram(magnitude.data_typed::<f32>()?, bins)
}

/// 计算 LBP 编码图
///
/// 内部像素 (y, x) 的编码写入 (y - 1, x - 1)，因此最后两行、两列保持为 0。
/// 邻居从左上角开始顺时针排列，依次占据第 7 位到第 0 位。
pub fn lbp_image(gray: &Array2<u8>) -> Array2<u8> {
    const NEIGHBORS: [(isize, isize); 8] =
        [(-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1), (0, -1)];

    let (rows, cols) = gray.dim();
    let mut lbp = Array2::zeros((rows, cols));
    for y in 1..rows.saturating_sub(1) {
        for x in 1..cols.saturating_sub(1) {
            let center = gray[[y, x]];
            let mut code = 0u8;
            for (bit, (dy, dx)) in NEIGHBORS.iter().enumerate() {
                let neighbor = gray[[(y as isize + dy) as usize, (x as isize + dx) as usize]];
                if neighbor > center {
                    code |= 1 << (7 - bit);
                }
            }
            lbp[[y - 1, x - 1]] = code;
        }
    }
    lbp
}

pub const LBP_BINS: usize = 256;

/// LBP 编码的 256 桶计数直方图，未归一化
pub fn lbp_histogram(image: &Image) -> Result<Vec<f32>> {
    let lbp = lbp_image(&to_gray(image)?);
    let mut histogram = vec![0f32; LBP_BINS];
    for &code in &lbp {
        histogram[code as usize] += 1.;
    }
    Ok(histogram)
}

pub const CANNY_LOW: f64 = 50.;
pub const CANNY_HIGH: f64 = 150.;

/// Canny 边缘检测后的边缘像素数量
pub fn edge_count(image: &Image) -> Result<usize> {
    let gray = gray_mat(image)?;
    let mut edges = Mat::default();
    imgproc::canny(&gray, &mut edges, CANNY_LOW, CANNY_HIGH, 3, false)?;
    Ok(core::count_non_zero(&edges)? as usize)
}

/// 边缘特征：边缘像素数量，L2 归一化后的 1 维向量
pub fn edge_feature(image: &Image) -> Result<Vec<f32>> {
    Ok(l2_normalize(&[edge_count(image)? as f32]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_edge() -> Image {
        Image::from_fn(12, 12, |_, c| if c < 6 { [0, 0, 0] } else { [255, 255, 255] })
    }

    #[test]
    fn test_flat_image_has_no_gradient() {
        let image = Image::filled(5, 7, [80, 80, 80]);
        let magnitude = gradient_magnitude(&image).unwrap();
        assert_eq!((magnitude.rows(), magnitude.cols()), (5, 7));
        assert!(magnitude.data_typed::<f32>().unwrap().iter().all(|&v| v == 0.));
        assert_eq!(texture_histogram(&image, 4).unwrap(), vec![1., 0., 0., 0.]);
    }

    #[test]
    fn test_magnitude_histogram() {
        let histogram = magnitude_histogram(&[0., 1., 2., 4.], 4).unwrap();
        assert_eq!(histogram, vec![0.25; 4]);
        assert_eq!(magnitude_histogram(&[], 3).unwrap(), vec![0.; 3]);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(matches!(magnitude_histogram(&[1., 2.], 0), Err(CbirError::InvalidParameter(_))));
        assert!(matches!(
            texture_histogram(&vertical_edge(), 0),
            Err(CbirError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_texture_histogram_normalized() {
        let histogram = texture_histogram(&vertical_edge(), 8).unwrap();
        assert_eq!(histogram.len(), 8);
        let sum: f32 = histogram.iter().sum();
        assert!((sum - 1.).abs() < 1e-5);
        // 最大幅值落在最后一个桶
        assert!(histogram[7] > 0.);
    }

    #[test]
    fn test_lbp_codes() {
        let mut gray = Array2::from_elem((3, 3), 10u8);
        gray[[0, 0]] = 20;
        gray[[1, 2]] = 20;
        let lbp = lbp_image(&gray);
        assert_eq!(lbp[[0, 0]], 0b1001_0000);
        assert_eq!(lbp[[2, 2]], 0);
    }

    #[test]
    fn test_lbp_histogram_counts_all_pixels() {
        let histogram = lbp_histogram(&vertical_edge()).unwrap();
        assert_eq!(histogram.len(), LBP_BINS);
        assert_eq!(histogram.iter().sum::<f32>(), 144.);
    }

    #[test]
    fn test_edge_count() {
        let count = edge_count(&vertical_edge()).unwrap();
        assert!(count > 0 && count <= 2 * 12, "count = {}", count);
        assert_eq!(edge_count(&Image::filled(8, 8, [3, 3, 3])).unwrap(), 0);
    }

    #[test]
    fn test_edge_feature() {
        assert_eq!(edge_feature(&vertical_edge()).unwrap(), vec![1.]);
        assert_eq!(edge_feature(&Image::filled(8, 8, [3, 3, 3])).unwrap(), vec![0.]);
    }
}
