//! 运行时错误与配置错误.

use crate::SubjectId;
use std::fmt;
use std::path::PathBuf;

/// 参数配置错误. 这类错误应在程序启动时 (处理任何受试者之前) 报告并终止.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 局部图像块边长必须为正.
    PatchSize(usize),

    /// 切割步长必须为正.
    Stride(usize),

    /// 非零像素占比下限必须在 `[0, 1]` 内.
    Occupancy(f64),

    /// CLAHE 裁剪上限必须为有限正数.
    ClipLimit(f64),

    /// CLAHE 网格的行数与列数必须为正.
    TileGrid(usize, usize),

    /// gamma 必须为有限正数.
    Gamma(f64),

    /// 规范分辨率的高和宽必须为正.
    CanonicalShape(usize, usize),

    /// 测试集占比必须在 `(0, 1)` 内.
    TestFraction(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PatchSize(v) => write!(f, "patch size must be positive, got `{v}`"),
            Self::Stride(v) => write!(f, "stride must be positive, got `{v}`"),
            Self::Occupancy(v) => write!(f, "occupancy ratio must be in [0, 1], got `{v}`"),
            Self::ClipLimit(v) => write!(f, "CLAHE clip limit must be positive, got `{v}`"),
            Self::TileGrid(h, w) => write!(f, "CLAHE tile grid must be positive, got `{h}x{w}`"),
            Self::Gamma(v) => write!(f, "gamma must be positive, got `{v}`"),
            Self::CanonicalShape(h, w) => {
                write!(f, "canonical resolution must be positive, got `{h}x{w}`")
            }
            Self::TestFraction(v) => write!(f, "test fraction must be in (0, 1), got `{v}`"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// 单个受试者处理过程中的错误.
///
/// 这类错误只影响出错的受试者: 批处理会记录诊断信息并继续处理其余受试者.
#[derive(Debug)]
pub enum PipelineError {
    /// 无法从文件名或表格字段中解析出受试者编号.
    InvalidSubjectId(String),

    /// 体数据文件无法解码. 第二个参数为底层原因.
    UnreadableInput(PathBuf, String),

    /// 标签表中没有该受试者.
    MissingLabel(SubjectId),

    /// 性别编码不是 1 (男) 或 2 (女).
    UnmappedCategory {
        /// 受试者编号.
        id: SubjectId,

        /// 原始编码.
        code: String,
    },

    /// 标签表缺少指定的列.
    MissingColumn(String),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 图像编解码错误.
    Image(image::ImageError),

    /// 表格读写错误.
    Csv(csv::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSubjectId(s) => write!(f, "invalid subject id `{s}`"),
            Self::UnreadableInput(p, why) => {
                write!(f, "cannot read volume `{}`: {why}", p.display())
            }
            Self::MissingLabel(id) => write!(f, "no label record for subject `{id}`"),
            Self::UnmappedCategory { id, code } => {
                write!(f, "subject `{id}` has unmapped sex code `{code}`")
            }
            Self::MissingColumn(c) => write!(f, "label table has no column `{c}`"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Csv(e) => write!(f, "CSV error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<image::ImageError> for PipelineError {
    #[inline]
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<csv::Error> for PipelineError {
    #[inline]
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// 本 crate 的通用结果类型.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
