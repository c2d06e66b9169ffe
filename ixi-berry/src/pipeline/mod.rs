//! 批处理流水线: 体数据 → 六幅全局投影 → 局部图像块, 并汇总标签表.
//!
//! 受试者之间相互独立. 启用 `rayon` 特性时受试者被并行处理,
//! 各自的结果收集到 `Vec` 中, 最后按受试者编号排序后一次性写出标签表.

mod summary;

pub use summary::{RunSummary, SkipReason, SubjectOutcome};

use crate::consts::CANONICAL_SHAPE;
use crate::dataset::{list_volumes, LabelSchema, SourceTable, VolumeEntry};
use crate::enhance::{EnhanceParams, Enhancer};
use crate::error::{ConfigError, PipelineError, Result};
use crate::patch::{PatchLayout, PatchParams, PatchTiler, TileStats};
use crate::project::ProjectionSet;
use crate::writer::{LabelTable, ProjectionWriter};
use crate::{Idx2d, SubjectId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 流水线配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// 体数据目录.
    pub input_dir: PathBuf,

    /// 受试者元数据表.
    pub labels_csv: PathBuf,

    /// 元数据表的列名.
    pub schema: LabelSchema,

    /// 全局投影图像与 `labels.csv` 的输出目录.
    pub global_dir: PathBuf,

    /// 局部图像块的输出目录. 为 `None` 时只生成全局图像.
    pub local_dir: Option<PathBuf>,

    /// 规范分辨率 `(高, 宽)`.
    pub canonical_shape: Idx2d,

    /// 增强参数.
    pub enhance: EnhanceParams,

    /// 切割参数.
    pub patch: PatchParams,

    /// 局部图像块布局.
    pub layout: PatchLayout,
}

impl PipelineConfig {
    /// 以默认参数创建配置, 输出到 `out_dir/global` 与 `out_dir/local`.
    /// 局部图像块按受试者分目录保存, 以便直接进行数据集划分.
    pub fn new<P, Q, R>(input_dir: P, labels_csv: Q, out_dir: R) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        R: AsRef<Path>,
    {
        let out_dir = out_dir.as_ref();
        Self {
            input_dir: input_dir.into(),
            labels_csv: labels_csv.into(),
            schema: LabelSchema::default(),
            global_dir: out_dir.join("global"),
            local_dir: Some(out_dir.join("local")),
            canonical_shape: CANONICAL_SHAPE,
            enhance: EnhanceParams::default(),
            patch: PatchParams::default(),
            layout: PatchLayout::BySubject,
        }
    }
}

/// 已就绪的流水线. 元数据表在构建时一次性读入.
#[derive(Debug)]
pub struct Pipeline {
    input_dir: PathBuf,
    local_dir: Option<PathBuf>,
    layout: PatchLayout,
    labels: SourceTable,
    writer: ProjectionWriter,
    tiler: PatchTiler,
}

impl Pipeline {
    /// 校验配置并读入元数据表.
    ///
    /// 配置错误先于任何 I/O 报告.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineSetupError> {
        let enhancer = Enhancer::new(&config.enhance);
        let writer = ProjectionWriter::new(config.global_dir, config.canonical_shape, enhancer)?;
        let labels = SourceTable::load(&config.labels_csv, &config.schema)?;
        log::info!(
            "{} subjects in `{}`",
            labels.len(),
            config.labels_csv.display()
        );
        Ok(Self {
            input_dir: config.input_dir,
            local_dir: config.local_dir,
            layout: config.layout,
            labels,
            writer,
            tiler: PatchTiler::new(config.patch),
        })
    }

    /// 处理单个受试者. 错误只记录在结果中, 不会向上传播.
    pub fn process_subject(&self, entry: &VolumeEntry) -> SubjectOutcome {
        match self.try_process(entry) {
            Ok((record, images, patches)) => SubjectOutcome::Done {
                record,
                images,
                patches,
            },
            Err(e) => {
                let reason = SkipReason::of(&e);
                let file = entry.file_name();
                match reason {
                    SkipReason::UnmappedCategory | SkipReason::WriteFailure => {
                        log::error!("skip `{file}`: {e}")
                    }
                    _ => log::warn!("skip `{file}`: {e}"),
                }
                SubjectOutcome::Skipped { file, reason }
            }
        }
    }

    fn try_process(
        &self,
        entry: &VolumeEntry,
    ) -> Result<(crate::LabelRecord, usize, TileStats)> {
        let subject = entry.subject()?;
        // 先确认标签存在, 再读取体数据和写图像.
        let record = self.labels.lookup(&subject)?;
        let volume = entry.open()?;
        log::debug!("{subject}: volume shape {:?}", volume.shape());

        let projections = ProjectionSet::from_volume(volume);
        let images = self.writer.write(&subject, &projections)?;
        let mut patches = TileStats::default();
        if let Some(local_dir) = self.local_dir.as_deref() {
            for (key, img) in images.iter() {
                patches += self.tiler.tile_to_dir(key, img.view(), local_dir, self.layout)?;
            }
        }
        log::info!(
            "{subject}: {} images, {} patches",
            images.len(),
            patches.accepted
        );
        Ok((record, images.len(), patches))
    }

    /// 处理给定的体数据文件, 返回按受试者编号排序的标签表和统计.
    ///
    /// 每个受试者只处理 `entries` 中的第一个体数据, 其余记为
    /// [`SkipReason::DuplicateSubject`].
    pub fn run_batch(&self, entries: &[VolumeEntry]) -> (LabelTable, RunSummary) {
        let (unique, duplicates) = first_per_subject(entries);
        #[cfg(feature = "rayon")]
        let mut outcomes: Vec<SubjectOutcome> = {
            use rayon::prelude::*;
            unique.par_iter().map(|e| self.process_subject(e)).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let mut outcomes: Vec<SubjectOutcome> =
            unique.iter().map(|e| self.process_subject(e)).collect();
        outcomes.extend(duplicates);

        let summary: RunSummary = outcomes.iter().collect();
        let mut labels: LabelTable = outcomes
            .into_iter()
            .filter_map(|o| match o {
                SubjectOutcome::Done { record, .. } => Some(record),
                SubjectOutcome::Skipped { .. } => None,
            })
            .collect();
        labels.sort();
        (labels, summary)
    }

    /// 处理输入目录下的全部体数据, 并在全局图像目录写出 `labels.csv`.
    pub fn run(&self) -> Result<RunSummary> {
        let entries = list_volumes(&self.input_dir)?;
        log::info!(
            "{} volumes found in `{}`",
            entries.len(),
            self.input_dir.display()
        );
        let (labels, summary) = self.run_batch(&entries);
        let path = self.writer.write_labels(&labels)?;
        log::info!("{} label rows written to `{}`", labels.len(), path.display());
        Ok(summary)
    }
}

/// 按顺序保留每个受试者的第一个体数据. 编号无法解析的文件原样保留,
/// 由 [`Pipeline::process_subject`] 报告.
fn first_per_subject(entries: &[VolumeEntry]) -> (Vec<&VolumeEntry>, Vec<SubjectOutcome>) {
    let mut seen: HashSet<SubjectId> = HashSet::new();
    let mut duplicates = Vec::new();
    let unique: Vec<&VolumeEntry> = entries
        .iter()
        .filter(|entry| {
            let Ok(subject) = entry.subject() else {
                return true;
            };
            if seen.contains(&subject) {
                let file = entry.file_name();
                log::warn!("skip `{file}`: {subject} already has a volume in this batch");
                duplicates.push(SubjectOutcome::Skipped {
                    file,
                    reason: SkipReason::DuplicateSubject,
                });
                return false;
            }
            seen.insert(subject);
            true
        })
        .collect();
    (unique, duplicates)
}

/// 流水线构建错误.
#[derive(Debug)]
pub enum PipelineSetupError {
    /// 参数非法.
    Config(ConfigError),

    /// 元数据表无法读取.
    Labels(PipelineError),
}

impl std::fmt::Display for PipelineSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Labels(e) => write!(f, "cannot load label table: {e}"),
        }
    }
}

impl std::error::Error for PipelineSetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Labels(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PipelineSetupError {
    #[inline]
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<PipelineError> for PipelineSetupError {
    #[inline]
    fn from(value: PipelineError) -> Self {
        Self::Labels(value)
    }
}
