//! min-max 规范化.

use itertools::{Itertools, MinMaxResult};
use ndarray::{Array2, ArrayView2};
use num::Float;
use ordered_float::OrderedFloat;

/// 求 `field` 中有限值的 `(最小值, 最大值)`.
///
/// 若不存在有限值, 或最小值等于最大值 (平坦标量场), 则返回 `None`.
pub fn value_range<F: Float>(field: ArrayView2<F>) -> Option<(f64, f64)> {
    match field
        .iter()
        .filter_map(|v| v.to_f64())
        .filter(|v| v.is_finite())
        .map(OrderedFloat)
        .minmax()
    {
        MinMaxResult::MinMax(lo, hi) if lo < hi => Some((lo.0, hi.0)),
        _ => None,
    }
}

/// 将 `field` 的 `[min, max]` 线性映射到 `[0, 255]`, 并截断为整数.
///
/// 非有限值 (NaN, inf) 映射为 0. 若标量场是平坦的 (见 [`value_range`]),
/// 则返回全 0 图像, 避免除以 0.
pub fn normalize<F: Float>(field: ArrayView2<F>) -> Array2<u8> {
    let Some((lo, hi)) = value_range(field) else {
        log::debug!(
            "degenerate value range in {:?} field, using all-zero image",
            field.dim()
        );
        return Array2::zeros(field.raw_dim());
    };
    let range = hi - lo;

    field.mapv(|v| match v.to_f64() {
        // 先除后乘, 保证最大值恰好映射为 255; `as u8` 向 0 截断并饱和.
        Some(v) if v.is_finite() => ((v - lo) / range * 255.0) as u8,
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_maps_range_to_u8() {
        let field = array![[-10.0f64, 0.0], [5.0, 30.0]];
        let out = normalize(field.view());
        // (v + 10) / 40 * 255, 截断.
        assert_eq!(out, array![[0u8, 63], [95, 255]]);
    }

    #[test]
    fn test_flat_and_empty_ranges() {
        assert_eq!(value_range(array![[2.0f32, 2.0]].view()), None);
        assert_eq!(value_range(array![[f64::NAN, f64::INFINITY]].view()), None);
        assert_eq!(
            value_range(array![[f64::NAN, 1.0], [-1.0, f64::NEG_INFINITY]].view()),
            Some((-1.0, 1.0))
        );
        assert_eq!(
            normalize(Array2::from_elem((2, 3), 7.0f64).view()),
            Array2::<u8>::zeros((2, 3))
        );
    }

    #[test]
    fn test_single_and_double_precision_agree() {
        let single = array![[0.0f32, 1.5], [f32::NAN, 3.0]];
        let double = single.mapv(f64::from);
        assert_eq!(value_range(single.view()), Some((0.0, 3.0)));
        assert_eq!(normalize(single.view()), normalize(double.view()));
        assert_eq!(normalize(single.view()), array![[0u8, 127], [0, 255]]);
    }

    #[test]
    fn test_output_covers_full_range() {
        let field = Array2::from_shape_fn((10, 10), |(h, w)| (h * 10 + w) as f64 * 0.37 - 4.0);
        let out = normalize(field.view());
        assert_eq!(out.iter().min(), Some(&0));
        assert_eq!(out.iter().max(), Some(&255));
    }
}
