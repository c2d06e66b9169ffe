//! CLAHE (Contrast Limited Adaptive Histogram Equalization).
//!
//! 1. 将图像划分为 `rows × cols` 个网格 (图像尺寸不能被整除时, 以 reflect-101
//!   方式在下方和右方补边后再划分);
//! 2. 每个网格统计直方图, 按裁剪上限截断并把超出部分均匀地重新分配, 再由累积分布得到查找表;
//! 3. 每个像素在离它最近的四个网格中心的查找表之间做双线性插值.
//!
//! Reference: Zuiderveld (1994), "Contrast Limited Adaptive Histogram
//! Equalization", Graphics Gems IV.

use crate::Idx2d;
use ndarray::{Array2, ArrayView2};

const BINS: usize = 256;

type Lut = [u8; BINS];

/// CLAHE 处理器.
#[derive(Copy, Clone, Debug)]
pub struct Clahe {
    clip_limit: f64,
    grid: Idx2d,
}

impl Clahe {
    /// `clip_limit` 是相对于 "均匀分布时每个灰度级的像素数" 的倍数;
    /// `grid` 是网格的 `(行数, 列数)`.
    ///
    /// 参数合法性由 [`super::EnhanceParams`] 保证; 当 `grid` 含 0 时 panic.
    pub fn new(clip_limit: f64, grid: Idx2d) -> Self {
        assert!(grid.0 > 0 && grid.1 > 0, "CLAHE 网格必须非空");
        Self { clip_limit, grid }
    }

    /// 对 `img` 做局部直方图均衡, 返回同样形状的新图像.
    pub fn apply(&self, img: ArrayView2<u8>) -> Array2<u8> {
        let (h, w) = img.dim();
        if h == 0 || w == 0 {
            return img.to_owned();
        }
        let (rows, cols) = self.grid;

        // 补边规则与常见实现保持一致: 只要有一个方向不能整除, 两个方向都补.
        let (ph, pw) = if h % rows != 0 || w % cols != 0 {
            (h + rows - h % rows, w + cols - w % cols)
        } else {
            (h, w)
        };
        let tile = (ph / rows, pw / cols);
        let area = tile.0 * tile.1;

        let luts: Vec<Lut> = (0..rows * cols)
            .map(|i| {
                let origin = ((i / cols) * tile.0, (i % cols) * tile.1);
                let mut hist = tile_histogram(img, origin, tile);
                clip_histogram(&mut hist, self.clip_threshold(area));
                build_lut(&hist, area)
            })
            .collect();

        self.interpolate(img, &luts, tile)
    }

    /// 每个灰度级允许的最大像素数, 至少为 1.
    #[inline]
    fn clip_threshold(&self, area: usize) -> usize {
        ((self.clip_limit * area as f64 / BINS as f64) as usize).max(1)
    }

    fn interpolate(&self, img: ArrayView2<u8>, luts: &[Lut], (th, tw): Idx2d) -> Array2<u8> {
        let (rows, cols) = self.grid;
        let axis_weights = |pos: usize, tile_len: usize, n: usize| -> (usize, usize, f32) {
            let f = pos as f32 / tile_len as f32 - 0.5;
            let lo = f.floor();
            let a = f - lo;
            let lo = lo as isize;
            let first = lo.max(0) as usize;
            let second = ((lo + 1) as usize).min(n - 1);
            (first, second, a)
        };

        Array2::from_shape_fn(img.dim(), |(y, x)| {
            let (ty1, ty2, ya) = axis_weights(y, th, rows);
            let (tx1, tx2, xa) = axis_weights(x, tw, cols);
            let v = img[(y, x)] as usize;
            let at = |ty: usize, tx: usize| luts[ty * cols + tx][v] as f32;

            let top = at(ty1, tx1) * (1.0 - xa) + at(ty1, tx2) * xa;
            let bottom = at(ty2, tx1) * (1.0 - xa) + at(ty2, tx2) * xa;
            (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8
        })
    }
}

/// reflect-101 补边: `... 2 1 | 0 1 2 ... n-1 | n-2 n-3 ...`.
#[inline]
fn reflect101(i: usize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i % period;
    if m < n {
        m
    } else {
        period - m
    }
}

/// 统计以 `(oy, ox)` 为左上角、大小为 `(th, tw)` 的网格直方图. 越界部分按 reflect-101 取值.
fn tile_histogram(img: ArrayView2<u8>, (oy, ox): Idx2d, (th, tw): Idx2d) -> [usize; BINS] {
    let (h, w) = img.dim();
    let mut hist = [0usize; BINS];
    for y in oy..oy + th {
        let sy = reflect101(y, h);
        for x in ox..ox + tw {
            hist[img[(sy, reflect101(x, w))] as usize] += 1;
        }
    }
    hist
}

/// 将超过 `limit` 的部分截去, 平均分给所有灰度级; 除不尽的余数按固定步长分配.
fn clip_histogram(hist: &mut [usize; BINS], limit: usize) {
    let mut clipped = 0usize;
    for bin in hist.iter_mut().filter(|b| **b > limit) {
        clipped += *bin - limit;
        *bin = limit;
    }

    let batch = clipped / BINS;
    let mut residual = clipped % BINS;
    hist.iter_mut().for_each(|b| *b += batch);

    if residual != 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

/// 由直方图的累积分布构建查找表, 缩放到 `[0, 255]`.
fn build_lut(hist: &[usize; BINS], area: usize) -> Lut {
    let scale = (BINS - 1) as f32 / area as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0usize;
    for (l, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *l = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect101() {
        let got: Vec<usize> = (0..9).map(|i| reflect101(i, 4)).collect();
        assert_eq!(got, [0, 1, 2, 3, 2, 1, 0, 1, 2]);
        assert_eq!(reflect101(5, 1), 0);
    }

    #[test]
    fn test_clip_keeps_total() {
        let mut hist = [0usize; BINS];
        hist[10] = 1000;
        hist[20] = 37;
        clip_histogram(&mut hist, 16);
        assert_eq!(hist.iter().sum::<usize>(), 1037);
        // 截断后重新分配, 没有灰度级能超过上限 + 分配量.
        assert!(hist.iter().all(|&b| b <= 16 + 1037 / BINS + 1));
    }

    #[test]
    fn test_lut_monotone_and_full() {
        let mut hist = [0usize; BINS];
        hist[0] = 5;
        hist[255] = 5;
        let lut = build_lut(&hist, 10);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn test_gradient_range_and_shape() {
        let img = Array2::from_shape_fn((64, 64), |(_, x)| (x * 4) as u8);
        let out = Clahe::new(2.0, (8, 8)).apply(img.view());
        assert_eq!(out.dim(), (64, 64));
        let lo = *out.iter().min().unwrap();
        let hi = *out.iter().max().unwrap();
        assert!(hi > lo);
    }

    #[test]
    fn test_non_divisible_and_tiny_images() {
        let clahe = Clahe::new(2.0, (8, 8));
        for shape in [(100, 75), (256, 150), (3, 5), (1, 1)] {
            let img = Array2::from_shape_fn(shape, |(h, w)| ((h * 31 + w * 17) % 256) as u8);
            assert_eq!(clahe.apply(img.view()).dim(), shape);
        }
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let img = Array2::from_elem((48, 40), 128u8);
        let out = Clahe::new(2.0, (8, 8)).apply(img.view());
        assert!(out.iter().all(|&p| p == out[(0, 0)]));
    }

    #[test]
    fn test_preserves_local_order() {
        // 同一网格内, 较亮的输入像素不会变得比较暗的像素更暗.
        let img = Array2::from_shape_fn((32, 32), |(h, w)| ((h + w) * 4) as u8);
        let out = Clahe::new(3.0, (1, 1)).apply(img.view());
        let pairs: Vec<_> = img.iter().zip(out.iter()).collect();
        for w in pairs.windows(2) {
            let ((a, b), (c, d)) = (w[0], w[1]);
            if a < c {
                assert!(b <= d);
            }
        }
    }
}
