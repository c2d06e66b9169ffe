//! gamma 查找表.

use crate::consts::GAMMA;
use ndarray::Array2;
use once_cell::sync::Lazy;

static DEFAULT_LUT: Lazy<GammaLut> = Lazy::new(|| GammaLut::build(GAMMA));

/// 256 项 gamma 查找表: `table[i] = trunc(255 * (i / 255) ^ (1 / gamma))`.
///
/// 对任意正 `gamma`, 表项单调不减, 且 `table[0] = 0`, `table[255] = 255`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GammaLut {
    table: [u8; 256],
}

impl GammaLut {
    /// 构建查找表. 默认 gamma 的表只会计算一次.
    pub fn new(gamma: f64) -> Self {
        if gamma == GAMMA {
            DEFAULT_LUT.clone()
        } else {
            Self::build(gamma)
        }
    }

    fn build(gamma: f64) -> Self {
        let inv = 1.0 / gamma;
        let mut table = [0u8; 256];
        for (i, t) in table.iter_mut().enumerate() {
            *t = ((i as f64 / 255.0).powf(inv) * 255.0) as u8;
        }
        Self { table }
    }

    /// 查找表本身.
    #[inline]
    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    /// 映射单个像素.
    #[inline]
    pub fn eval(&self, pix: u8) -> u8 {
        self.table[pix as usize]
    }

    /// 就地映射整张图像.
    pub fn apply_inplace(&self, img: &mut Array2<u8>) {
        img.mapv_inplace(|p| self.eval(p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        for gamma in [0.5, 1.0, 1.2, 2.2] {
            let lut = GammaLut::new(gamma);
            let t = lut.table();
            assert_eq!(t.len(), 256);
            assert_eq!(t[0], 0);
            assert_eq!(t[255], 255);
            assert!(t.windows(2).all(|w| w[0] <= w[1]), "gamma {gamma}");
        }
    }

    #[test]
    fn test_gamma_brightens_midtones() {
        let lut = GammaLut::new(1.2);
        // 255 * 0.5 ^ (1 / 1.2) = 143.1...
        assert_eq!(lut.eval(128), 143);
        assert!((1..255).all(|i| lut.eval(i) >= i));
    }

    #[test]
    fn test_identity_gamma() {
        let lut = GammaLut::new(1.0);
        assert!((0..=255u8).all(|i| lut.eval(i) == i || lut.eval(i) + 1 == i));
    }
}
