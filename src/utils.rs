use std::path::Path;

use indicatif::ProgressStyle;
use ndarray::Array2;
use opencv::core::{self, Mat, Scalar, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

use crate::error::{CbirError, Result};
use crate::image::{Image, Rect};

/// 以 BGR 三通道读取图片
pub fn imread(path: impl AsRef<Path>) -> Result<Image> {
    let path = path.as_ref();
    let load_error =
        |reason: String| CbirError::ImageLoad { path: path.display().to_string(), reason };

    let filename = path.to_str().ok_or_else(|| load_error("无效的路径".to_string()))?;
    let mat = imgcodecs::imread(filename, imgcodecs::IMREAD_COLOR)
        .map_err(|e| load_error(e.to_string()))?;
    if mat.empty() {
        return Err(load_error("文件不存在或无法解码".to_string()));
    }
    mat_to_image(&mat).map_err(|e| load_error(e.to_string()))
}

/// 保存图片，格式由扩展名决定
pub fn imwrite(path: impl AsRef<Path>, image: &Image) -> Result<()> {
    let path = path.as_ref();
    let mat = image_to_mat(image)?;
    let filename = path
        .to_str()
        .ok_or_else(|| CbirError::Unsupported(format!("无效的路径: {}", path.display())))?;
    if !imgcodecs::imwrite(filename, &mat, &Vector::new())? {
        return Err(CbirError::Unsupported(format!("无法写入图片: {}", path.display())));
    }
    Ok(())
}

pub fn mat_to_image(mat: &Mat) -> Result<Image> {
    if mat.channels() != 3 {
        return Err(CbirError::Unsupported(format!("不支持 {} 通道的图片", mat.channels())));
    }
    // try_clone 保证数据连续
    let mat = mat.try_clone()?;
    let bytes = mat.data_bytes()?.to_vec();
    Image::from_raw(mat.rows() as usize, mat.cols() as usize, bytes)
        .map_err(|e| CbirError::Unsupported(e.to_string()))
}

pub fn image_to_mat(image: &Image) -> Result<Mat> {
    let bytes = image.to_bytes();
    let flat = Mat::from_slice(&bytes)?;
    let mat = flat.reshape(3, image.rows() as i32)?.try_clone()?;
    Ok(mat)
}

/// 转换为单通道灰度 Mat
pub fn gray_mat(image: &Image) -> Result<Mat> {
    let mat = image_to_mat(image)?;
    let mut gray = Mat::default();
    imgproc::cvt_color_def(&mat, &mut gray, imgproc::COLOR_BGR2GRAY)?;
    Ok(gray)
}

pub fn to_gray(image: &Image) -> Result<Array2<u8>> {
    let gray = gray_mat(image)?;
    let bytes = gray.data_bytes()?.to_vec();
    Array2::from_shape_vec((image.rows(), image.cols()), bytes)
        .map_err(|e| CbirError::Unsupported(e.to_string()))
}

/// BGR 转 HSV，H 的范围是 [0, 180)，S 与 V 的范围是 [0, 255]
pub fn to_hsv(image: &Image) -> Result<Image> {
    let mat = image_to_mat(image)?;
    let mut hsv = Mat::default();
    imgproc::cvt_color_def(&mat, &mut hsv, imgproc::COLOR_BGR2HSV)?;
    mat_to_image(&hsv)
}

/// 绘制矩形边框，线宽向边框两侧扩展
pub fn draw_rect(image: &mut Image, rect: Rect, bgr: [u8; 3], thickness: i32) -> Result<()> {
    if rect.is_empty() {
        return Ok(());
    }
    let mut mat = image_to_mat(image)?;
    let color = Scalar::new(bgr[0] as f64, bgr[1] as f64, bgr[2] as f64, 0.);
    let roi = core::Rect::new(
        rect.x as i32,
        rect.y as i32,
        rect.width as i32,
        rect.height as i32,
    );
    imgproc::rectangle(&mut mat, roi, color, thickness, imgproc::LINE_4, 0)?;
    *image = mat_to_image(&mat)?;
    Ok(())
}

/// 返回路径中的文件名部分，同时识别 `/` 与 `\` 分隔符
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent}% {msg}",
    )
    .expect("failed to build progress style")
}
