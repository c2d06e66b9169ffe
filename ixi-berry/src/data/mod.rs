use std::path::Path;

use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::error::PipelineError;
use crate::Idx3d;

mod key;
mod save;
mod subject;

pub use key::{PatchKey, ProjAxis, ProjectionKey, Statistic};
pub use save::ImgWriteRaw;
pub use subject::{LabelRecord, Sex, SubjectId};

pub(crate) use save::{gray_to_array, resize_cubic};

/// 单通道 3D 体数据, 体素值以 `f32` 保存.
///
/// 轴顺序与文件中的存储顺序一致, 即 nifti 的 `(x, y, z)`. 构造时保证三个轴的长度均为正.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    /// 从已有数组创建体数据. 若任一轴长度为 0, 则返回 `None`.
    pub fn new(data: Array3<f32>) -> Option<Self> {
        data.shape()
            .iter()
            .all(|&len| len > 0)
            .then_some(Self { data })
    }

    /// 打开体数据文件. 支持 `.nii`, `.nii.gz` 和 `.npy` (`f32`, 3D) 格式.
    ///
    /// 所有解码失败都会被转换为 [`PipelineError::UnreadableInput`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let unreadable = |why: String| PipelineError::UnreadableInput(path.to_owned(), why);

        let data = if is_npy(path) {
            ndarray_npy::read_npy::<_, Array3<f32>>(path).map_err(|e| unreadable(e.to_string()))?
        } else {
            read_nifti(path).map_err(unreadable)?
        };

        let shape = data.dim();
        Self::new(data).ok_or_else(|| unreadable(format!("empty axis in shape {shape:?}")))
    }

    /// 获取数据形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 沿最后一个轴翻转, 修正固定的方向约定.
    ///
    /// 翻转只修改步长, 不复制数据. 消费 `self` 以保证每份体数据只会被翻转一次.
    #[inline]
    pub(crate) fn into_oriented(mut self) -> Array3<f32> {
        self.data.invert_axis(Axis(2));
        self.data
    }
}

#[inline]
fn is_npy(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("npy"))
}

/// 读取 nifti 文件 (`.nii.gz` 会自动解压), 保持 `(x, y, z)` 轴序.
///
/// 形如 `(x, y, z, 1)` 的 4D 数据会被压缩为 3D.
fn read_nifti(path: &Path) -> Result<Array3<f32>, String> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| e.to_string())?;
    let mut data = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| e.to_string())?;

    while data.ndim() > 3 && data.shape()[data.ndim() - 1] == 1 {
        let last = data.ndim() - 1;
        data = data.index_axis_move(Axis(last), 0);
    }

    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| format!("expected a 3D volume, got shape {shape:?}"))
}
