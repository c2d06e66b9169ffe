use crate::Idx2d;

/// 网格对齐的图像块左上角坐标迭代器, 行优先.
///
/// 只枚举完整落在图像内的块: `row ∈ [0, H - size]`, `col ∈ [0, W - size]`,
/// 步长均为 `stride`. 图像任一方向小于 `size` 时不产生任何坐标.
#[derive(Clone, Debug)]
pub struct TileOrigins {
    cur_row: usize,
    cur_col: usize,
    rows: usize,
    cols: usize,
    stride: usize,
}

impl TileOrigins {
    /// 为 `(h, w)` 大小的图像创建迭代器. `size` 和 `stride` 必须为正, 否则 panic.
    #[inline]
    pub fn new((h, w): Idx2d, size: usize, stride: usize) -> Self {
        assert!(size > 0 && stride > 0, "图像块边长和步长必须为正");
        Self {
            cur_row: 0,
            cur_col: 0,
            rows: grid_len(h, size, stride),
            cols: grid_len(w, size, stride),
            stride,
        }
    }

    /// 网格的 `(行数, 列数)`.
    #[inline]
    pub fn grid(&self) -> Idx2d {
        (self.rows, self.cols)
    }
}

/// `floor((len - size) / stride) + 1`, `len < size` 时为 0.
#[inline]
fn grid_len(len: usize, size: usize, stride: usize) -> usize {
    if len < size {
        0
    } else {
        (len - size) / stride + 1
    }
}

impl Iterator for TileOrigins {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rows == 0 || self.cols == 0 || self.cur_row == self.rows {
            return None;
        }
        let ret = (self.cur_row * self.stride, self.cur_col * self.stride);
        if self.cur_col + 1 == self.cols {
            self.cur_col = 0;
            self.cur_row += 1;
        } else {
            self.cur_col += 1;
        }
        Some(ret)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.rows == 0 || self.cols == 0 {
            0
        } else {
            (self.rows - self.cur_row) * self.cols - self.cur_col
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileOrigins {}

#[cfg(test)]
mod completeness_tests {
    use super::TileOrigins;
    use crate::Idx2d;

    fn origins_builtin((h, w): Idx2d, size: usize, stride: usize) -> Vec<Idx2d> {
        if h < size || w < size {
            return vec![];
        }
        (0..=h - size)
            .step_by(stride)
            .flat_map(|r| (0..=w - size).step_by(stride).map(move |c| (r, c)))
            .collect()
    }

    #[test]
    fn test_matches_builtin_and_formula() {
        for h in 0..=20 {
            for w in 0..=20 {
                for (size, stride) in [(1, 1), (4, 4), (4, 3), (5, 7), (8, 2)] {
                    let it = TileOrigins::new((h, w), size, stride);
                    let expect = if h >= size && w >= size {
                        ((h - size) / stride + 1) * ((w - size) / stride + 1)
                    } else {
                        0
                    };
                    assert_eq!(it.len(), expect);
                    assert_eq!(it.collect::<Vec<_>>(), origins_builtin((h, w), size, stride));
                }
            }
        }
    }

    #[test]
    fn test_canonical_grid() {
        let it = TileOrigins::new((256, 256), 64, 64);
        assert_eq!(it.grid(), (4, 4));
        let v: Vec<_> = it.collect();
        assert_eq!(v.len(), 16);
        assert_eq!(v[0], (0, 0));
        assert_eq!(v[1], (0, 64));
        assert_eq!(v[15], (192, 192));
    }

    #[test]
    fn test_partial_tail_is_dropped() {
        // 300 = 4 * 64 + 44, 剩余的 44 像素不成块.
        let v: Vec<_> = TileOrigins::new((300, 100), 64, 64).collect();
        assert_eq!(v, [(0, 0), (64, 0), (128, 0), (192, 0)]);
    }
}
