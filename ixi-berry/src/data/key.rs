//! 投影图像与局部图像块的结构化键.
//!
//! 键在流水线中以数据形式传递, 只在持久化边界才被序列化为文件名.

use super::SubjectId;
use std::fmt;

/// 投影所沿的轴.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProjAxis {
    /// 沿轴 0 投影.
    Sagittal,

    /// 沿轴 1 投影.
    Coronal,

    /// 沿轴 2 投影.
    Axial,
}

impl ProjAxis {
    /// 所有轴, 按文件输出顺序排列.
    pub const ALL: [ProjAxis; 3] = [Self::Axial, Self::Coronal, Self::Sagittal];

    /// 被规约的数组轴索引.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Sagittal => 0,
            Self::Coronal => 1,
            Self::Axial => 2,
        }
    }

    /// 文件名中的名称.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sagittal => "Sagittal",
            Self::Coronal => "Coronal",
            Self::Axial => "Axial",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == s)
    }
}

/// 投影所用的统计量.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Statistic {
    /// 算术平均值.
    Mean,

    /// 样本标准差 (除以 N - 1).
    Std,
}

impl Statistic {
    /// 所有统计量, 按文件输出顺序排列.
    pub const ALL: [Statistic; 2] = [Self::Mean, Self::Std];

    /// 文件名中的名称.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mean => "Mean",
            Self::Std => "Std",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == s)
    }
}

/// 一张全局投影图像的键: (受试者, 轴, 统计量).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectionKey {
    /// 受试者编号.
    pub subject: SubjectId,

    /// 投影轴.
    pub axis: ProjAxis,

    /// 统计量.
    pub stat: Statistic,
}

impl ProjectionKey {
    /// 某个受试者的全部六个投影键, 顺序为
    /// `Axial_Mean, Axial_Std, Coronal_Mean, Coronal_Std, Sagittal_Mean, Sagittal_Std`.
    pub fn all_of(subject: &SubjectId) -> impl Iterator<Item = ProjectionKey> + '_ {
        ProjAxis::ALL.into_iter().flat_map(move |axis| {
            Statistic::ALL.into_iter().map(move |stat| ProjectionKey {
                subject: subject.clone(),
                axis,
                stat,
            })
        })
    }

    /// 不带扩展名的文件名, 如 `IXI012_Axial_Mean`.
    #[inline]
    pub fn base_name(&self) -> String {
        self.to_string()
    }

    /// 文件名, 如 `IXI012_Axial_Mean.png`.
    #[inline]
    pub fn file_name(&self) -> String {
        format!("{self}.png")
    }

    /// 从不带扩展名的文件名解析. 格式不符时返回 `None`.
    pub fn parse_base_name(stem: &str) -> Option<Self> {
        let mut parts = stem.split('_');
        let head = parts.next()?;
        let subject = SubjectId::normalize(head).ok()?;
        // 编号必须原样出现, 不接受 `IXI12_...` 这类未规范化的写法.
        if head != subject.as_str() {
            return None;
        }
        let axis = ProjAxis::from_name(parts.next()?)?;
        let stat = Statistic::from_name(parts.next()?)?;
        parts.next().is_none().then_some(Self {
            subject,
            axis,
            stat,
        })
    }
}

impl fmt::Display for ProjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.subject, self.axis.name(), self.stat.name())
    }
}

/// 一个局部图像块的键: (来源投影, 行偏移, 列偏移).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatchKey {
    /// 来源投影图像.
    pub source: ProjectionKey,

    /// 左上角行坐标.
    pub row: usize,

    /// 左上角列坐标.
    pub col: usize,
}

impl PatchKey {
    /// 受试者编号.
    #[inline]
    pub fn subject(&self) -> &SubjectId {
        &self.source.subject
    }

    /// 文件名, 如 `IXI012_Axial_Mean_64_128.png`.
    #[inline]
    pub fn file_name(&self) -> String {
        format!("{self}.png")
    }

    /// 从不带扩展名的文件名解析. 格式不符时返回 `None`.
    pub fn parse_base_name(stem: &str) -> Option<Self> {
        let (rest, col) = stem.rsplit_once('_')?;
        let (source, row) = rest.rsplit_once('_')?;
        Some(Self {
            source: ProjectionKey::parse_base_name(source)?,
            row: row.parse().ok()?,
            col: col.parse().ok()?,
        })
    }
}

impl fmt::Display for PatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.source, self.row, self.col)
    }
}
