//! 2D 标量场的对比度增强.
//!
//! 顺序固定为: min-max 规范化到 `[0, 255]` -> CLAHE 局部直方图均衡 -> gamma 查找表映射.
//! 三步都是确定性的, 相同输入与参数总是得到相同输出.

mod clahe;
mod gamma;
mod normalize;

pub use clahe::Clahe;
pub use gamma::GammaLut;
pub use normalize::{normalize, value_range};

use crate::consts::{CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID, GAMMA};
use crate::error::ConfigError;
use crate::Idx2d;
use ndarray::{Array2, ArrayView2};
use num::Float;

/// 对比度增强参数.
///
/// 反序列化同样经过 [`EnhanceParams::new`] 校验.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawEnhanceParams")
)]
pub struct EnhanceParams {
    clip_limit: f64,
    tile_grid: Idx2d,
    gamma: f64,
}

impl EnhanceParams {
    /// 构建增强参数.
    ///
    /// `clip_limit` 和 `gamma` 必须是有限正数, `tile_grid` 的行数、列数必须为正,
    /// 否则返回 `Err`.
    pub fn new(clip_limit: f64, tile_grid: Idx2d, gamma: f64) -> Result<Self, ConfigError> {
        if !(clip_limit.is_finite() && clip_limit > 0.0) {
            return Err(ConfigError::ClipLimit(clip_limit));
        }
        if tile_grid.0 == 0 || tile_grid.1 == 0 {
            return Err(ConfigError::TileGrid(tile_grid.0, tile_grid.1));
        }
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(ConfigError::Gamma(gamma));
        }
        Ok(Self {
            clip_limit,
            tile_grid,
            gamma,
        })
    }

    /// CLAHE 裁剪上限.
    #[inline]
    pub fn clip_limit(&self) -> f64 {
        self.clip_limit
    }

    /// CLAHE 网格 `(行数, 列数)`.
    #[inline]
    pub fn tile_grid(&self) -> Idx2d {
        self.tile_grid
    }

    /// gamma 值.
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

/// 未经校验的反序列化形式.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawEnhanceParams {
    clip_limit: f64,
    tile_grid: Idx2d,
    gamma: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawEnhanceParams> for EnhanceParams {
    type Error = ConfigError;

    fn try_from(raw: RawEnhanceParams) -> Result<Self, Self::Error> {
        Self::new(raw.clip_limit, raw.tile_grid, raw.gamma)
    }
}

/// 裁剪上限 2.0, 网格 8×8, gamma 1.2.
impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            clip_limit: CLAHE_CLIP_LIMIT,
            tile_grid: CLAHE_TILE_GRID,
            gamma: GAMMA,
        }
    }
}

/// 对比度增强器. 构建时预先计算好 gamma 查找表, 之后可无状态地反复使用.
#[derive(Clone, Debug)]
pub struct Enhancer {
    clahe: Clahe,
    lut: GammaLut,
}

impl Enhancer {
    /// 从参数构建增强器.
    pub fn new(params: &EnhanceParams) -> Self {
        Self {
            clahe: Clahe::new(params.clip_limit, params.tile_grid),
            lut: GammaLut::new(params.gamma),
        }
    }

    /// 增强一张标量场, 得到 8-bit 图像. 输出形状与输入相同.
    ///
    /// 平坦或不含有限值的标量场先被规范化为全 0, 最终得到一张常数图像, 而不会产生 NaN.
    pub fn enhance<F: Float>(&self, field: ArrayView2<F>) -> Array2<u8> {
        let mut img = self.clahe.apply(normalize(field).view());
        self.lut.apply_inplace(&mut img);
        img
    }

    /// 使用的 gamma 查找表.
    #[inline]
    pub fn gamma_lut(&self) -> &GammaLut {
        &self.lut
    }
}

impl Default for Enhancer {
    fn default() -> Self {
        Self::new(&EnhanceParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(EnhanceParams::new(2.0, (8, 8), 1.2).is_ok());
        assert_eq!(
            EnhanceParams::new(0.0, (8, 8), 1.2),
            Err(ConfigError::ClipLimit(0.0))
        );
        assert_eq!(
            EnhanceParams::new(2.0, (0, 8), 1.2),
            Err(ConfigError::TileGrid(0, 8))
        );
        assert!(EnhanceParams::new(2.0, (8, 8), f64::NAN).is_err());
        assert!(EnhanceParams::new(2.0, (8, 8), -1.0).is_err());
        assert_eq!(
            EnhanceParams::default(),
            EnhanceParams::new(2.0, (8, 8), 1.2).unwrap()
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialized_params_are_validated() {
        let raw = |clip_limit, tile_grid, gamma| RawEnhanceParams {
            clip_limit,
            tile_grid,
            gamma,
        };
        assert_eq!(
            EnhanceParams::try_from(raw(-1.0, (8, 8), 1.2)),
            Err(ConfigError::ClipLimit(-1.0))
        );
        assert_eq!(
            EnhanceParams::try_from(raw(2.0, (0, 0), 1.2)),
            Err(ConfigError::TileGrid(0, 0))
        );
        assert_eq!(
            EnhanceParams::try_from(raw(2.0, (8, 8), 0.0)),
            Err(ConfigError::Gamma(0.0))
        );
        assert_eq!(
            EnhanceParams::try_from(raw(2.0, (8, 8), 1.2)),
            Ok(EnhanceParams::default())
        );
    }

    fn is_constant(img: &Array2<u8>) -> bool {
        img.iter().all(|&p| p == img[(0, 0)])
    }

    #[test]
    fn test_flat_field_is_defined() {
        let e = Enhancer::default();
        let out = e.enhance(Array2::<f64>::from_elem((40, 30), 3.5).view());
        assert_eq!(out.dim(), (40, 30));
        // 规范化后为全 0; 每个网格的直方图相同, 因此输出仍是常数图像.
        assert!(is_constant(&out));
    }

    #[test]
    fn test_arbitrary_range_input() {
        let e = Enhancer::default();
        let field = Array2::from_shape_fn((57, 91), |(h, w)| {
            (h as f64 - 20.0) * 1e4 - (w as f64).sin() * 3e5
        });
        let out = e.enhance(field.view());
        assert_eq!(out.dim(), (57, 91));
        assert!(!is_constant(&out));
        assert!(out.iter().any(|&p| p > 200));
    }

    #[test]
    fn test_nan_field_is_defined() {
        let e = Enhancer::default();
        let mut field = Array2::from_shape_fn((16, 16), |(h, w)| (h + w) as f32);
        field[(3, 4)] = f32::NAN;
        field[(5, 5)] = f32::INFINITY;
        assert_eq!(e.enhance(field.view()).dim(), (16, 16));

        let all_nan = Array2::from_elem((8, 8), f64::NAN);
        let out = e.enhance(all_nan.view());
        assert!(is_constant(&out));
        // 与全 0 输入的结果一致.
        assert_eq!(out, e.enhance(Array2::<f64>::zeros((8, 8)).view()));
    }

    #[test]
    fn test_deterministic() {
        let e = Enhancer::default();
        let field = Array2::from_shape_fn((64, 48), |(h, w)| ((h * w) % 17) as f64);
        assert_eq!(e.enhance(field.view()), e.enhance(field.view()));
    }
}
