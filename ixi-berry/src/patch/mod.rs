//! 局部图像块切割.
//!
//! 在规范分辨率的全局图像上以固定边长、固定步长做网格扫描, 计算每个候选块的非零像素占比,
//! 只保存占比不低于阈值的块. 投影图像在解剖结构之外通常有大片黑色背景,
//! 该阈值用来剔除不携带信号的块.

mod origin;

pub use origin::TileOrigins;

use crate::consts::{gray, MIN_OCCUPANCY, PATCH_SIZE, PATCH_STRIDE};
use crate::data::gray_to_array;
use crate::dataset::{is_png, list_files};
use crate::error::{ConfigError, Result};
use crate::{Idx2d, ImgWriteRaw, PatchKey, ProjectionKey};
use ndarray::{s, ArrayView2};
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

/// 切割参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawPatchParams")
)]
pub struct PatchParams {
    size: usize,
    stride: usize,
    min_occupancy: f64,
}

impl PatchParams {
    /// 构建切割参数.
    ///
    /// `size` 和 `stride` 必须为正, `min_occupancy` 必须在 `[0, 1]` 内, 否则返回 `Err`.
    pub fn new(size: usize, stride: usize, min_occupancy: f64) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::PatchSize(size));
        }
        if stride == 0 {
            return Err(ConfigError::Stride(stride));
        }
        if !(0.0..=1.0).contains(&min_occupancy) {
            return Err(ConfigError::Occupancy(min_occupancy));
        }
        Ok(Self {
            size,
            stride,
            min_occupancy,
        })
    }

    /// 图像块边长.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// 步长.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// 非零像素占比下限.
    #[inline]
    pub fn min_occupancy(&self) -> f64 {
        self.min_occupancy
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPatchParams {
    size: usize,
    stride: usize,
    min_occupancy: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPatchParams> for PatchParams {
    type Error = ConfigError;

    fn try_from(raw: RawPatchParams) -> Result<Self, Self::Error> {
        Self::new(raw.size, raw.stride, raw.min_occupancy)
    }
}

/// 边长 64, 步长 64, 占比下限 0.01.
impl Default for PatchParams {
    fn default() -> Self {
        Self {
            size: PATCH_SIZE,
            stride: PATCH_STRIDE,
            min_occupancy: MIN_OCCUPANCY,
        }
    }
}

/// 图像块内非零像素的占比.
///
/// 当 `tile` 为空时返回 0.
pub fn occupancy(tile: ArrayView2<u8>) -> f64 {
    if tile.is_empty() {
        return 0.0;
    }
    let non_zero = tile.iter().filter(|&&p| gray::is_foreground(p)).count();
    non_zero as f64 / tile.len() as f64
}

/// 切割统计.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TileStats {
    /// 被保留的块数.
    pub accepted: usize,

    /// 因占比不足被丢弃的块数.
    pub rejected: usize,
}

impl AddAssign for TileStats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.accepted += rhs.accepted;
        self.rejected += rhs.rejected;
    }
}

/// 图像块的输出目录布局.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatchLayout {
    /// 所有图像块直接放在同一目录下.
    Flat,

    /// 每个受试者一个子目录: `{目录}/{受试者}/{块文件名}`.
    BySubject,
}

impl PatchLayout {
    /// 图像块 `key` 的保存路径.
    pub fn path_of(self, local_dir: &Path, key: &PatchKey) -> PathBuf {
        let mut path = local_dir.to_owned();
        if self == Self::BySubject {
            path.push(key.subject().as_str());
        }
        path.push(key.file_name());
        path
    }
}

/// 图像块切割器.
#[derive(Copy, Clone, Debug, Default)]
pub struct PatchTiler {
    params: PatchParams,
}

impl PatchTiler {
    /// 从参数构建切割器.
    #[inline]
    pub fn new(params: PatchParams) -> Self {
        Self { params }
    }

    /// 切割参数.
    #[inline]
    pub fn params(&self) -> &PatchParams {
        &self.params
    }

    /// `shape` 大小的图像上所有候选块的左上角坐标.
    #[inline]
    pub fn origins(&self, shape: Idx2d) -> TileOrigins {
        TileOrigins::new(shape, self.params.size, self.params.stride)
    }

    /// 扫描 `img`, 返回通过占比阈值的块 (左上角坐标与视图) 和统计.
    ///
    /// 图像任一方向小于块边长时不产生任何块, 这不是错误.
    pub fn scan<'a>(
        &self,
        img: ArrayView2<'a, u8>,
    ) -> (Vec<(Idx2d, ArrayView2<'a, u8>)>, TileStats) {
        let size = self.params.size;
        let mut stats = TileStats::default();
        let mut accepted = Vec::new();
        for (r, c) in self.origins(img.dim()) {
            let tile = img.slice_move(s![r..r + size, c..c + size]);
            if occupancy(tile) >= self.params.min_occupancy {
                stats.accepted += 1;
                accepted.push(((r, c), tile));
            } else {
                stats.rejected += 1;
            }
        }
        (accepted, stats)
    }

    /// 切割来源为 `source` 的图像 `img`, 将通过阈值的块按 `layout` 保存到 `local_dir`.
    pub fn tile_to_dir(
        &self,
        source: &ProjectionKey,
        img: ArrayView2<u8>,
        local_dir: &Path,
        layout: PatchLayout,
    ) -> Result<TileStats> {
        let (accepted, stats) = self.scan(img);
        if accepted.is_empty() {
            return Ok(stats);
        }
        let mut made_dir = false;
        for ((row, col), tile) in accepted {
            let key = PatchKey {
                source: source.clone(),
                row,
                col,
            };
            let path = layout.path_of(local_dir, &key);
            if !made_dir {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                made_dir = true;
            }
            tile.save_raw(&path)?;
        }
        log::debug!(
            "{source}: {} patches kept, {} rejected",
            stats.accepted,
            stats.rejected
        );
        Ok(stats)
    }

    /// 切割 `global_dir` 下所有形如 `{受试者}_{轴}_{统计量}.png` 的全局图像.
    ///
    /// 文件名不符合格式或无法解码的图像会被跳过并记录警告. 只有目录本身无法读取,
    /// 或图像块无法写入时才返回 `Err`.
    pub fn tile_directory(
        &self,
        global_dir: &Path,
        local_dir: &Path,
        layout: PatchLayout,
    ) -> Result<TileStats> {
        fs::create_dir_all(local_dir)?;
        let mut total = TileStats::default();
        for path in list_files(global_dir, is_png)? {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let Some(source) = ProjectionKey::parse_base_name(stem) else {
                log::warn!("skip `{}`: not a projection image name", path.display());
                continue;
            };
            let img = match image::open(&path) {
                Ok(img) => gray_to_array(img.into_luma8()),
                Err(e) => {
                    log::warn!("cannot read image `{}`: {e}", path.display());
                    continue;
                }
            };
            total += self.tile_to_dir(&source, img.view(), local_dir, layout)?;
        }
        Ok(total)
    }
}
