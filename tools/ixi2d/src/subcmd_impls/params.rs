//! 子命令共享的参数组与取值范围校验.

use clap::Args;
use ixi_berry::consts::{
    CLAHE_CLIP_LIMIT, GAMMA, MIN_OCCUPANCY, PATCH_SIZE, PATCH_STRIDE, SPLIT_SEED, TEST_FRACTION,
};
use ixi_berry::dataset::{LabelSchema, SplitParams};
use ixi_berry::enhance::EnhanceParams;
use ixi_berry::error::ConfigError;
use ixi_berry::patch::PatchParams;
use ixi_berry::Idx2d;

/// 增强与缩放参数.
#[derive(Args, Debug, Clone)]
pub struct EnhanceArgs {
    /// CLAHE 裁剪上限.
    #[arg(long = "clip-limit", default_value_t = CLAHE_CLIP_LIMIT, value_parser = positive_f64)]
    clip_limit: f64,
    /// CLAHE 网格 `行x列`.
    #[arg(long = "tile-grid", default_value = "8x8", value_parser = shape_2d)]
    tile_grid: Idx2d,
    /// gamma 值.
    #[arg(long, default_value_t = GAMMA, value_parser = positive_f64)]
    gamma: f64,
    /// 全局图像的规范分辨率 `高x宽`.
    #[arg(long = "canonical-size", default_value = "256x256", value_parser = shape_2d)]
    canonical_size: Idx2d,
}

impl EnhanceArgs {
    pub fn params(&self) -> Result<EnhanceParams, ConfigError> {
        EnhanceParams::new(self.clip_limit, self.tile_grid, self.gamma)
    }

    #[inline]
    pub fn canonical_size(&self) -> Idx2d {
        self.canonical_size
    }
}

/// 切割参数.
#[derive(Args, Debug, Clone)]
pub struct PatchArgs {
    /// 局部图像块边长.
    #[arg(long = "patch-size", default_value_t = PATCH_SIZE, value_parser = positive_usize)]
    patch_size: usize,
    /// 切割步长.
    #[arg(long, default_value_t = PATCH_STRIDE, value_parser = positive_usize)]
    stride: usize,
    /// 非零像素占比下限, 低于该值的图像块被丢弃.
    #[arg(long = "min-occupancy", default_value_t = MIN_OCCUPANCY, value_parser = unit_interval)]
    min_occupancy: f64,
}

impl PatchArgs {
    pub fn params(&self) -> Result<PatchParams, ConfigError> {
        PatchParams::new(self.patch_size, self.stride, self.min_occupancy)
    }
}

/// 数据集划分参数.
#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// 测试集占比.
    #[arg(
        long = "test-fraction",
        default_value_t = TEST_FRACTION,
        value_parser = open_unit_interval
    )]
    test_fraction: f64,
    /// 随机种子.
    #[arg(long, default_value_t = SPLIT_SEED)]
    seed: u64,
}

impl SplitArgs {
    pub fn params(&self) -> Result<SplitParams, ConfigError> {
        SplitParams::new(self.test_fraction, self.seed)
    }
}

/// 原始元数据表的列名.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// 受试者编号列.
    #[arg(long = "id-column", default_value = "IXI_ID")]
    id_column: String,
    /// 年龄列.
    #[arg(long = "age-column", default_value = "AGE")]
    age_column: String,
    /// 性别编码列.
    #[arg(long = "sex-column", default_value = "SEX_ID (1=m, 2=f)")]
    sex_column: String,
}

impl SchemaArgs {
    pub fn schema(&self) -> LabelSchema {
        LabelSchema {
            id_column: self.id_column.clone(),
            age_column: self.age_column.clone(),
            sex_column: self.sex_column.clone(),
        }
    }
}

pub fn positive_usize(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(format!("`{s}` is not a positive integer")),
    }
}

pub fn positive_f64(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(format!("`{s}` is not a positive number")),
    }
}

pub fn unit_interval(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(format!("`{s}` is not in [0, 1]")),
    }
}

pub fn open_unit_interval(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v > 0.0 && v < 1.0 => Ok(v),
        _ => Err(format!("`{s}` is not in (0, 1)")),
    }
}

/// 解析 `8x8`, `256X128` 或单个数字 (正方形).
pub fn shape_2d(s: &str) -> Result<Idx2d, String> {
    let err = || format!("`{s}` is not a shape like `8x8`");
    let (h, w) = match s.split_once(['x', 'X']) {
        Some((h, w)) => (h, w),
        None => (s, s),
    };
    let h = positive_usize(h.trim()).map_err(|_| err())?;
    let w = positive_usize(w.trim()).map_err(|_| err())?;
    Ok((h, w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_2d() {
        assert_eq!(shape_2d("8x8"), Ok((8, 8)));
        assert_eq!(shape_2d("256X128"), Ok((256, 128)));
        assert_eq!(shape_2d("16"), Ok((16, 16)));
        assert!(shape_2d("0x8").is_err());
        assert!(shape_2d("8x").is_err());
        assert!(shape_2d("axb").is_err());
    }

    #[test]
    fn test_ranges() {
        assert_eq!(unit_interval("0"), Ok(0.0));
        assert_eq!(unit_interval("1"), Ok(1.0));
        assert!(unit_interval("1.01").is_err());
        assert!(open_unit_interval("0").is_err());
        assert_eq!(open_unit_interval("0.15"), Ok(0.15));
        assert!(positive_f64("inf").is_err());
        assert!(positive_f64("nan").is_err());
        assert!(positive_usize("-1").is_err());
    }
}
