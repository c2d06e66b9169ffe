//! 受试者编号与标签记录.

use crate::consts::{SUBJECT_ID_WIDTH, SUBJECT_TAG};
use crate::error::PipelineError;
use std::fmt;

/// 规范化的受试者编号, 形如 `IXI012`.
///
/// 数字部分至少 3 位 (不足左侧补 0, 超出则保留原样). 编号内不会出现 `_` 或 `-`,
/// 因此可以安全地作为文件名前缀.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubjectId(String);

impl SubjectId {
    /// 从表格字段或编号字符串解析受试者编号.
    ///
    /// 接受 `12`, `012`, `12.0`, `IXI012` 等形式, 均得到 `IXI012`.
    pub fn normalize(raw: &str) -> Result<Self, PipelineError> {
        let invalid = || PipelineError::InvalidSubjectId(raw.to_string());
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix(SUBJECT_TAG).unwrap_or(trimmed);

        // 表格导出时整数列可能被写成 `12.0`.
        let digits = match digits.split_once('.') {
            Some((int, frac)) if frac.bytes().all(|b| b == b'0') => int,
            Some(_) => return Err(invalid()),
            None => digits,
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(Self(format!(
            "{SUBJECT_TAG}{digits:0>width$}",
            width = SUBJECT_ID_WIDTH
        )))
    }

    /// 从体数据文件名解析受试者编号. 编号为第一个 `-` 之前的部分.
    ///
    /// 例如 `IXI012-Guys-1234-T1.nii.gz` -> `IXI012`.
    pub fn from_volume_file_name(name: &str) -> Result<Self, PipelineError> {
        let head = name.split('-').next().unwrap_or(name);
        // 没有 `-` 的文件名, 去掉扩展名后整体作为编号.
        let head = head.split('.').next().unwrap_or(head);
        if !head.starts_with(SUBJECT_TAG) {
            return Err(PipelineError::InvalidSubjectId(name.to_string()));
        }
        Self::normalize(head).map_err(|_| PipelineError::InvalidSubjectId(name.to_string()))
    }

    /// 字符串形式.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 受试者性别.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sex {
    /// 男, 原始编码 1.
    Male,

    /// 女, 原始编码 2.
    Female,
}

impl Sex {
    /// 将原始编码映射为性别. 只接受 1 和 2 (允许 `1.0` 这类整数浮点写法),
    /// 其它编码返回 `None`, 由调用方拒绝该行.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().parse::<f64>().ok()? {
            c if c == 1.0 => Some(Self::Male),
            c if c == 2.0 => Some(Self::Female),
            _ => None,
        }
    }

    /// 从标签表中的字母解析. 只接受 `M` 和 `F`.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim() {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }

    /// 标签表中的字母.
    #[inline]
    pub const fn letter(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }
}

/// 单个受试者的标签记录.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelRecord {
    /// 受试者编号.
    pub id: SubjectId,

    /// 年龄. 原始表格中可能缺失.
    pub age: Option<f64>,

    /// 性别.
    pub sex: Sex,
}
