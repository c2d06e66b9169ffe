//! 批处理结果统计.

use crate::error::PipelineError;
use crate::patch::TileStats;
use crate::LabelRecord;
use std::fmt;

/// 受试者被跳过的原因.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// 文件名中没有合法的受试者编号.
    InvalidSubjectId,

    /// 元数据表中没有该受试者.
    MissingLabel,

    /// 性别编码无法映射.
    UnmappedCategory,

    /// 体数据无法解码.
    UnreadableInput,

    /// 输出文件写入失败.
    WriteFailure,

    /// 同一受试者的体数据已被处理过 (如同一受试者的 T1 与 T2).
    DuplicateSubject,
}

impl SkipReason {
    /// 所有原因, 按报告顺序排列.
    pub const ALL: [SkipReason; 6] = [
        Self::InvalidSubjectId,
        Self::MissingLabel,
        Self::UnmappedCategory,
        Self::UnreadableInput,
        Self::WriteFailure,
        Self::DuplicateSubject,
    ];

    /// 错误对应的跳过原因. [`SkipReason::DuplicateSubject`] 不由错误产生.
    pub fn of(err: &PipelineError) -> Self {
        match err {
            PipelineError::InvalidSubjectId(_) => Self::InvalidSubjectId,
            PipelineError::MissingLabel(_) => Self::MissingLabel,
            PipelineError::UnmappedCategory { .. } => Self::UnmappedCategory,
            PipelineError::UnreadableInput(..) | PipelineError::MissingColumn(_) => {
                Self::UnreadableInput
            }
            PipelineError::Io(_) | PipelineError::Image(_) | PipelineError::Csv(_) => {
                Self::WriteFailure
            }
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }

    /// 报告中的名称.
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidSubjectId => "invalid subject id",
            Self::MissingLabel => "missing label",
            Self::UnmappedCategory => "unmapped sex code",
            Self::UnreadableInput => "unreadable volume",
            Self::WriteFailure => "write failure",
            Self::DuplicateSubject => "duplicate subject",
        }
    }
}

/// 单个受试者的处理结果.
#[derive(Debug)]
pub enum SubjectOutcome {
    /// 处理完成.
    Done {
        /// 该受试者的标签记录.
        record: LabelRecord,

        /// 写出的全局图像数.
        images: usize,

        /// 切割统计.
        patches: TileStats,
    },

    /// 被跳过.
    Skipped {
        /// 体数据文件名.
        file: String,

        /// 原因.
        reason: SkipReason,
    },
}

/// 一次批处理的统计.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    processed: usize,
    skipped: [usize; SkipReason::ALL.len()],
    images: usize,
    patches: TileStats,
}

impl RunSummary {
    /// 累加一个受试者的结果.
    pub fn record(&mut self, outcome: &SubjectOutcome) {
        match outcome {
            SubjectOutcome::Done {
                images, patches, ..
            } => {
                self.processed += 1;
                self.images += images;
                self.patches += *patches;
            }
            SubjectOutcome::Skipped { reason, .. } => self.skipped[reason.index()] += 1,
        }
    }

    /// 处理完成的受试者数.
    #[inline]
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// 因 `reason` 被跳过的受试者数.
    #[inline]
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped[reason.index()]
    }

    /// 被跳过的受试者总数.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped.iter().sum()
    }

    /// 写出的全局图像数.
    #[inline]
    pub fn images_written(&self) -> usize {
        self.images
    }

    /// 切割统计.
    #[inline]
    pub fn patches(&self) -> TileStats {
        self.patches
    }
}

impl<'a> FromIterator<&'a SubjectOutcome> for RunSummary {
    fn from_iter<T: IntoIterator<Item = &'a SubjectOutcome>>(iter: T) -> Self {
        let mut ans = Self::default();
        iter.into_iter().for_each(|o| ans.record(o));
        ans
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const S4: &str = "    ";

        writeln!(f, "Run summary:")?;
        writeln!(f, "{S4}Subjects processed: {}", self.processed)?;
        writeln!(f, "{S4}Subjects skipped: {}", self.skipped())?;
        for reason in SkipReason::ALL {
            let n = self.skipped_for(reason);
            if n > 0 {
                writeln!(f, "{S4}{S4}{}: {n}", reason.name())?;
            }
        }
        writeln!(f, "{S4}Global images written: {}", self.images)?;
        writeln!(f, "{S4}Patches emitted: {}", self.patches.accepted)?;
        write!(f, "{S4}Patches rejected: {}", self.patches.rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sex, SubjectId};

    fn done(n: usize) -> SubjectOutcome {
        SubjectOutcome::Done {
            record: LabelRecord {
                id: SubjectId::normalize("1").unwrap(),
                age: None,
                sex: Sex::Male,
            },
            images: 6,
            patches: TileStats {
                accepted: n,
                rejected: 96 - n,
            },
        }
    }

    fn skipped(reason: SkipReason) -> SubjectOutcome {
        SubjectOutcome::Skipped {
            file: "x.nii.gz".to_owned(),
            reason,
        }
    }

    #[test]
    fn test_accumulate() {
        let outcomes = [
            done(40),
            skipped(SkipReason::MissingLabel),
            done(50),
            skipped(SkipReason::MissingLabel),
            skipped(SkipReason::UnreadableInput),
        ];
        let s: RunSummary = outcomes.iter().collect();
        assert_eq!(s.processed(), 2);
        assert_eq!(s.skipped(), 3);
        assert_eq!(s.skipped_for(SkipReason::MissingLabel), 2);
        assert_eq!(s.skipped_for(SkipReason::WriteFailure), 0);
        assert_eq!(s.images_written(), 12);
        assert_eq!(
            s.patches(),
            TileStats {
                accepted: 90,
                rejected: 102,
            }
        );

        let text = s.to_string();
        assert!(text.contains("Subjects processed: 2"));
        assert!(text.contains("missing label: 2"));
        assert!(!text.contains("write failure"));
    }

    #[test]
    fn test_reason_of_error() {
        let id = SubjectId::normalize("5").unwrap();
        assert_eq!(
            SkipReason::of(&PipelineError::MissingLabel(id.clone())),
            SkipReason::MissingLabel
        );
        assert_eq!(
            SkipReason::of(&PipelineError::UnmappedCategory {
                id,
                code: "0".into(),
            }),
            SkipReason::UnmappedCategory
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(SkipReason::of(&io.into()), SkipReason::WriteFailure);
    }
}
