use crate::error::{CbirError, Result};

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// 距离，越小越相似
    Ascending,
    /// 相似度，越大越相似
    Descending,
}

fn check_dimension(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(CbirError::DimensionMismatch { left: a.len(), right: b.len() });
    }
    Ok(())
}

/// 差的平方和
pub fn sum_squared_difference(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimension(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// 直方图交，返回相似度
pub fn histogram_intersection(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimension(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x.min(*y)).sum())
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    Ok(sum_squared_difference(a, b)?.sqrt())
}

pub fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// 余弦相似度，任一向量为零向量时返回 -1
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimension(a, b)?;
    let (na, nb) = (norm(a), norm(b));
    if na == 0. || nb == 0. {
        return Ok(-1.);
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(dot / (na * nb))
}

/// 余弦距离 `1 - cos`，范围 [0, 2]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    Ok(1. - cosine_similarity(a, b)?)
}

/// L2 归一化，零向量原样返回全零
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n > 0. {
        v.iter().map(|x| x / n).collect()
    } else {
        vec![0.; v.len()]
    }
}

/// 将向量等分为 `parts` 段，分别计算直方图交后取平均
pub fn mean_part_intersection(a: &[f32], b: &[f32], parts: usize) -> Result<f32> {
    check_dimension(a, b)?;
    if parts == 0 || a.len() % parts != 0 {
        return Err(CbirError::DimensionMismatch { left: a.len(), right: parts });
    }
    let size = a.len() / parts;
    let mut total = 0.;
    for (pa, pb) in a.chunks_exact(size.max(1)).zip(b.chunks_exact(size.max(1))) {
        total += histogram_intersection(pa, pb)?;
    }
    Ok(total / parts as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_squared_difference() {
        assert_eq!(sum_squared_difference(&[1., 2., 3.], &[1., 0., 6.]).unwrap(), 13.);
        assert!(matches!(
            sum_squared_difference(&[1.], &[1., 2.]),
            Err(CbirError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0., 0.], &[3., 4.]).unwrap(), 5.);
        assert!(euclidean_distance(&[0.], &[]).is_err());
    }

    #[test]
    fn test_histogram_intersection_self() {
        let h = [0.1, 0.25, 0., 0.65];
        let sum: f32 = h.iter().sum();
        assert!((histogram_intersection(&h, &h).unwrap() - sum).abs() < 1e-6);
        assert_eq!(histogram_intersection(&[1., 0.], &[0., 1.]).unwrap(), 0.);
    }

    #[test]
    fn test_cosine_distance() {
        let v = [0.3, -1.2, 4.];
        assert!(cosine_distance(&v, &v).unwrap().abs() < 1e-6);
        assert!((cosine_distance(&[1., 0.], &[0., 1.]).unwrap() - 1.).abs() < 1e-6);
        assert!((cosine_distance(&[1., 0.], &[-1., 0.]).unwrap() - 2.).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_distance(&[0., 0.], &[1., 2.]).unwrap(), 2.);
        assert_eq!(cosine_distance(&[1., 2.], &[0., 0.]).unwrap(), 2.);
    }

    #[test]
    fn test_l2_normalize() {
        assert_eq!(l2_normalize(&[3., 4.]), vec![0.6, 0.8]);
        assert_eq!(l2_normalize(&[0., 0.]), vec![0., 0.]);
    }

    #[test]
    fn test_mean_part_intersection() {
        let a = [1., 0., 0.5, 0.5];
        let b = [1., 0., 0., 1.];
        assert_eq!(mean_part_intersection(&a, &b, 2).unwrap(), 0.75);
        assert!(mean_part_intersection(&a, &b[..3], 2).is_err());
    }
}
