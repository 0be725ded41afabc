use ndarray::{Array3, ArrayView3, ShapeError, s};

/// 8 位三通道图片，BGR 顺序，按行存储
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image(Array3<u8>);

/// 图片上的矩形区域，坐标已裁剪到图片范围内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    /// 用两个角点构造矩形，并与 `rows x cols` 的图片求交集
    pub fn clipped(x1: i64, y1: i64, x2: i64, y2: i64, rows: usize, cols: usize) -> Self {
        let clamp = |v: i64, max: usize| v.clamp(0, max as i64) as usize;
        let (left, right) = (clamp(x1.min(x2), cols), clamp(x1.max(x2), cols));
        let (top, bottom) = (clamp(y1.min(y2), rows), clamp(y1.max(y2), rows));
        Self { x: left, y: top, width: right - left, height: bottom - top }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Image {
    /// 从连续的 BGR 字节构造图片
    pub fn from_raw(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self, ShapeError> {
        Ok(Self(Array3::from_shape_vec((rows, cols, 3), data)?))
    }

    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> [u8; 3]) -> Self {
        Self(Array3::from_shape_fn((rows, cols, 3), |(r, c, ch)| f(r, c)[ch]))
    }

    /// 纯色图片
    pub fn filled(rows: usize, cols: usize, bgr: [u8; 3]) -> Self {
        Self::from_fn(rows, cols, |_, _| bgr)
    }

    pub fn rows(&self) -> usize {
        self.0.dim().0
    }

    pub fn cols(&self) -> usize {
        self.0.dim().1
    }

    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        [self.0[[row, col, 0]], self.0[[row, col, 1]], self.0[[row, col, 2]]]
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.0.view()
    }

    /// 第 `start..end` 行组成的视图
    pub fn row_band(&self, start: usize, end: usize) -> ArrayView3<'_, u8> {
        self.0.slice(s![start..end, .., ..])
    }

    pub fn crop(&self, rect: Rect) -> Image {
        let (rows, cols) = (rect.y..rect.y + rect.height, rect.x..rect.x + rect.width);
        Image(self.0.slice(s![rows, cols, ..]).to_owned())
    }

    /// 返回连续的 BGR 字节
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().copied().collect()
    }
}
