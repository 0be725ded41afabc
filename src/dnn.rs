use std::path::{Path, PathBuf};

use log::{debug, info};
use opencv::core::{CV_32F, Scalar, Size};
use opencv::dnn;
use opencv::prelude::*;

use crate::error::{CbirError, Result};
use crate::image::{Image, Rect};
use crate::utils;

/// 将整张图片映射为特征向量的网络
pub trait FeatureNetwork {
    fn forward(&mut self, image: &Image) -> Result<Vec<f32>>;
}

/// 人脸检测结果，坐标为相对图片宽高的比例
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl FaceDetection {
    /// 换算为像素坐标，并裁剪到图片范围内
    pub fn rect(&self, rows: usize, cols: usize) -> Rect {
        let x = |v: f32| (v * cols as f32) as i64;
        let y = |v: f32| (v * rows as f32) as i64;
        Rect::clipped(x(self.x1), y(self.y1), x(self.x2), y(self.y2), rows, cols)
    }
}

pub trait FaceDetector {
    /// 按检测器输出顺序返回所有检测结果，不做置信度过滤
    fn detect(&mut self, image: &Image) -> Result<Vec<FaceDetection>>;
}

pub trait FaceEncoder {
    fn encode(&mut self, face: &Image) -> Result<Vec<f32>>;
}

/// 模型文件所在目录
#[derive(Debug, Clone)]
pub struct ModelPaths {
    dir: PathBuf,
}

impl ModelPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 可执行文件所在目录下的 `models` 目录
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(dir.join("models")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// DenseNet-121 网络结构
    pub fn densenet_architecture(&self) -> PathBuf {
        self.dir.join("DenseNet_121.prototxt")
    }

    /// DenseNet-121 权重
    pub fn densenet_weights(&self) -> PathBuf {
        self.dir.join("DenseNet_121.caffemodel")
    }

    pub fn face_detector_architecture(&self) -> PathBuf {
        self.dir.join("deploy.prototxt")
    }

    pub fn face_detector_weights(&self) -> PathBuf {
        self.dir.join("res10_300x300_ssd_iter_140000_fp16.caffemodel")
    }

    /// OpenFace 人脸识别模型
    pub fn face_recognizer(&self) -> PathBuf {
        self.dir.join("openface.nn4.small2.v1.t7")
    }
}

fn path_str(path: &Path) -> Result<&str> {
    if !path.is_file() {
        return Err(CbirError::Inference(format!("模型文件不存在: {}", path.display())));
    }
    path.to_str().ok_or_else(|| CbirError::Inference(format!("无效的路径: {}", path.display())))
}

/// DenseNet-121 特征网络
pub struct DenseNet {
    net: dnn::Net,
}

impl DenseNet {
    pub const INPUT_SIZE: i32 = 224;

    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let net = dnn::read_net_from_caffe(
            path_str(&paths.densenet_architecture())?,
            path_str(&paths.densenet_weights())?,
        )?;
        Ok(Self { net })
    }
}

impl FeatureNetwork for DenseNet {
    fn forward(&mut self, image: &Image) -> Result<Vec<f32>> {
        let mat = utils::image_to_mat(image)?;
        let blob = dnn::blob_from_image(
            &mat,
            1.0,
            Size::new(Self::INPUT_SIZE, Self::INPUT_SIZE),
            Scalar::new(104., 117., 123., 0.),
            true,
            false,
            CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;
        Ok(output.data_typed::<f32>()?.to_vec())
    }
}

/// 基于 ResNet-10 SSD 的人脸检测器
pub struct SsdFaceDetector {
    net: dnn::Net,
}

impl SsdFaceDetector {
    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let net = dnn::read_net_from_caffe(
            path_str(&paths.face_detector_architecture())?,
            path_str(&paths.face_detector_weights())?,
        )?;
        Ok(Self { net })
    }
}

impl FaceDetector for SsdFaceDetector {
    fn detect(&mut self, image: &Image) -> Result<Vec<FaceDetection>> {
        let mat = utils::image_to_mat(image)?;
        let blob = dnn::blob_from_image(
            &mat,
            1.0,
            Size::new(300, 300),
            Scalar::new(104., 177., 123., 0.),
            false,
            false,
            CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;

        // 输出形状为 [1, 1, N, 7]，每行为 [image_id, label, confidence, x1, y1, x2, y2]
        let detections = output
            .data_typed::<f32>()?
            .chunks_exact(7)
            .map(|row| FaceDetection {
                confidence: row[2],
                x1: row[3],
                y1: row[4],
                x2: row[5],
                y2: row[6],
            })
            .collect::<Vec<_>>();
        debug!("检测到 {} 个候选人脸", detections.len());
        Ok(detections)
    }
}

/// OpenFace nn4.small2 人脸识别网络
pub struct OpenFace {
    net: dnn::Net,
}

impl OpenFace {
    pub const INPUT_SIZE: i32 = 96;

    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let net = dnn::read_net_from_torch(path_str(&paths.face_recognizer())?, true, true)?;
        Ok(Self { net })
    }
}

impl FaceEncoder for OpenFace {
    fn encode(&mut self, face: &Image) -> Result<Vec<f32>> {
        let mat = utils::image_to_mat(face)?;
        let blob = dnn::blob_from_image(
            &mat,
            1.0 / 255.0,
            Size::new(Self::INPUT_SIZE, Self::INPUT_SIZE),
            Scalar::default(),
            true,
            false,
            CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;
        Ok(output.data_typed::<f32>()?.to_vec())
    }
}

/// 需要加载的网络
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Networks {
    pub features: bool,
    pub faces: bool,
}

/// 推理会话，在一次建库或检索中只加载一次网络
#[derive(Default)]
pub struct InferenceSession {
    network: Option<Box<dyn FeatureNetwork>>,
    detector: Option<Box<dyn FaceDetector>>,
    encoder: Option<Box<dyn FaceEncoder>>,
}

impl InferenceSession {
    /// 从模型目录加载需要的网络
    pub fn open(paths: &ModelPaths, networks: Networks) -> Result<Self> {
        let mut session = Self::default();
        if networks.features {
            info!("加载 DenseNet-121: {}", paths.dir().display());
            session.network = Some(Box::new(DenseNet::load(paths)?));
        }
        if networks.faces {
            info!("加载人脸检测与识别模型: {}", paths.dir().display());
            session.detector = Some(Box::new(SsdFaceDetector::load(paths)?));
            session.encoder = Some(Box::new(OpenFace::load(paths)?));
        }
        Ok(session)
    }

    pub fn with_network(mut self, network: impl FeatureNetwork + 'static) -> Self {
        self.network = Some(Box::new(network));
        self
    }

    pub fn with_faces(
        mut self,
        detector: impl FaceDetector + 'static,
        encoder: impl FaceEncoder + 'static,
    ) -> Self {
        self.detector = Some(Box::new(detector));
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn network(&mut self) -> Result<&mut dyn FeatureNetwork> {
        match self.network.as_deref_mut() {
            Some(network) => Ok(network),
            None => Err(CbirError::Unsupported("推理会话未加载特征网络".to_string())),
        }
    }

    pub fn face_detector(&mut self) -> Result<&mut dyn FaceDetector> {
        match self.detector.as_deref_mut() {
            Some(detector) => Ok(detector),
            None => Err(CbirError::Unsupported("推理会话未加载人脸检测模型".to_string())),
        }
    }

    /// 同时借用特征网络、人脸检测与识别网络
    pub fn all(
        &mut self,
    ) -> Result<(&mut dyn FeatureNetwork, &mut dyn FaceDetector, &mut dyn FaceEncoder)> {
        match (
            self.network.as_deref_mut(),
            self.detector.as_deref_mut(),
            self.encoder.as_deref_mut(),
        ) {
            (Some(network), Some(detector), Some(encoder)) => Ok((network, detector, encoder)),
            _ => Err(CbirError::Unsupported("推理会话未加载全部网络".to_string())),
        }
    }
}
