//! 以受试者为单位的训练/测试集划分.
//!
//! 同一受试者的全局图像和局部图像块只会出现在其中一个集合中.

use super::{is_png, list_files};
use crate::consts::{SPLIT_SEED, TEST_FRACTION, TEST_LABELS_CSV, TRAIN_LABELS_CSV};
use crate::error::{ConfigError, PipelineError};
use crate::writer::LabelTable;
use crate::{LabelRecord, ProjectionKey};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// 划分参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawSplitParams")
)]
pub struct SplitParams {
    test_fraction: f64,
    seed: u64,
}

impl SplitParams {
    /// 构建划分参数. `test_fraction` 必须在 `(0, 1)` 内.
    pub fn new(test_fraction: f64, seed: u64) -> Result<Self, ConfigError> {
        if test_fraction > 0.0 && test_fraction < 1.0 {
            Ok(Self {
                test_fraction,
                seed,
            })
        } else {
            Err(ConfigError::TestFraction(test_fraction))
        }
    }

    /// 测试集占比.
    #[inline]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// 随机种子.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// `n` 个受试者中划入测试集的个数, 即 `ceil(test_fraction * n)`.
    #[inline]
    pub fn test_len(&self, n: usize) -> usize {
        (self.test_fraction * n as f64).ceil() as usize
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSplitParams {
    test_fraction: f64,
    seed: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSplitParams> for SplitParams {
    type Error = ConfigError;

    fn try_from(raw: RawSplitParams) -> Result<Self, Self::Error> {
        Self::new(raw.test_fraction, raw.seed)
    }
}

/// 测试集占比 0.15, 种子 42.
impl Default for SplitParams {
    fn default() -> Self {
        Self {
            test_fraction: TEST_FRACTION,
            seed: SPLIT_SEED,
        }
    }
}

/// 数据集划分错误.
#[derive(Debug)]
pub enum PartitionError {
    /// 过滤缺失年龄后没有剩余的受试者.
    NoSubjects,

    /// 划分后训练集为空. 字段为受试者总数.
    EmptyTrainSet(usize),

    /// 读写标签表或复制文件失败.
    Pipeline(PipelineError),
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubjects => f.write_str("no labeled subject with a known age"),
            Self::EmptyTrainSet(n) => {
                write!(f, "all {n} subjects fall into the test set, train set would be empty")
            }
            Self::Pipeline(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PartitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PipelineError> for PartitionError {
    #[inline]
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<io::Error> for PartitionError {
    #[inline]
    fn from(value: io::Error) -> Self {
        Self::Pipeline(PipelineError::Io(value))
    }
}

/// 用种子 `params.seed()` 打乱 `items`, 前 `ceil(test_fraction * n)` 个作为测试集,
/// 其余作为训练集. 返回 `(训练集, 测试集)`.
///
/// 相同的输入与种子总是得到相同的划分.
pub fn split_subjects<T>(
    mut items: Vec<T>,
    params: &SplitParams,
) -> Result<(Vec<T>, Vec<T>), PartitionError> {
    let n = items.len();
    if n == 0 {
        return Err(PartitionError::NoSubjects);
    }
    let n_test = params.test_len(n);
    if n_test >= n {
        return Err(PartitionError::EmptyTrainSet(n));
    }
    let mut rng = StdRng::seed_from_u64(params.seed);
    items.shuffle(&mut rng);
    let train = items.split_off(n_test);
    Ok((train, items))
}

/// 划分结果统计.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionSummary {
    /// 同一受试者的重复标签行数 (只保留第一行).
    pub duplicates: usize,

    /// 因年龄缺失被丢弃的受试者数.
    pub dropped: usize,

    /// 训练集受试者数.
    pub train_subjects: usize,

    /// 测试集受试者数.
    pub test_subjects: usize,

    /// 复制的全局图像数.
    pub global_copied: usize,

    /// 找不到的全局图像数.
    pub global_missing: usize,

    /// 复制的局部图像块数.
    pub patches_copied: usize,

    /// 找不到局部图像块目录的受试者数.
    pub local_missing: usize,
}

impl fmt::Display for PartitionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "subjects: {} train, {} test, {} dropped (no age), {} duplicate rows",
            self.train_subjects, self.test_subjects, self.dropped, self.duplicates
        )?;
        writeln!(
            f,
            "global images: {} copied, {} missing",
            self.global_copied, self.global_missing
        )?;
        write!(
            f,
            "local patches: {} copied, {} subjects without patch folder",
            self.patches_copied, self.local_missing
        )
    }
}

/// 读取 `labels_csv`, 合并同一受试者的重复行 (保留第一行),
/// 丢弃年龄缺失的行后划分受试者, 并在 `out_dir` 下生成 `trainset/` 和 `testset/` 两棵目录树.
///
/// 每棵树包含对应的标签表, `global/` 下每个受试者的六幅全局图像,
/// 以及 `local/{受试者}/` 下的局部图像块. 找不到的文件只记录警告.
pub fn partition(
    global_dir: &Path,
    local_dir: &Path,
    labels_csv: &Path,
    out_dir: &Path,
    params: &SplitParams,
) -> Result<PartitionSummary, PartitionError> {
    let mut table = LabelTable::read_csv(labels_csv)?;
    let duplicates = table.dedup_subjects();
    let total = table.len();
    let records: Vec<LabelRecord> = table.with_age().into_iter().collect();

    let mut summary = PartitionSummary {
        duplicates,
        dropped: total - records.len(),
        ..Default::default()
    };
    let (train, test) = split_subjects(records, params)?;
    summary.train_subjects = train.len();
    summary.test_subjects = test.len();
    log::info!(
        "{} subjects with age: {} train, {} test",
        train.len() + test.len(),
        train.len(),
        test.len()
    );

    for (split, labels_name, records) in [
        ("trainset", TRAIN_LABELS_CSV, train),
        ("testset", TEST_LABELS_CSV, test),
    ] {
        let root = out_dir.join(split);
        let (dst_global, dst_local) = (root.join("global"), root.join("local"));
        fs::create_dir_all(&dst_global)?;
        fs::create_dir_all(&dst_local)?;

        for record in records.iter() {
            copy_global(global_dir, &dst_global, record, &mut summary)?;
            copy_local(local_dir, &dst_local, record, &mut summary)?;
        }
        let table: LabelTable = records.into_iter().collect();
        table.write_csv(root.join(labels_name))?;
    }
    Ok(summary)
}

fn copy_global(
    src_dir: &Path,
    dst_dir: &Path,
    record: &LabelRecord,
    summary: &mut PartitionSummary,
) -> io::Result<()> {
    for key in ProjectionKey::all_of(&record.id) {
        let name = key.file_name();
        let src = src_dir.join(&name);
        if src.is_file() {
            fs::copy(&src, dst_dir.join(&name))?;
            summary.global_copied += 1;
        } else {
            log::warn!("missing global image `{}`", src.display());
            summary.global_missing += 1;
        }
    }
    Ok(())
}

fn copy_local(
    src_root: &Path,
    dst_root: &Path,
    record: &LabelRecord,
    summary: &mut PartitionSummary,
) -> Result<(), PartitionError> {
    let src_dir = src_root.join(record.id.as_str());
    if !src_dir.is_dir() {
        log::warn!("missing patch folder `{}`", src_dir.display());
        summary.local_missing += 1;
        return Ok(());
    }
    let dst_dir = dst_root.join(record.id.as_str());
    fs::create_dir_all(&dst_dir)?;
    for src in list_files(&src_dir, is_png)? {
        if let Some(name) = src.file_name() {
            fs::copy(&src, dst_dir.join(name))?;
            summary.patches_copied += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sex, SubjectId};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn id(n: usize) -> SubjectId {
        SubjectId::normalize(&n.to_string()).unwrap()
    }

    #[test]
    fn test_params_validation() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(SplitParams::new(bad, 42).is_err());
        }
        assert_eq!(SplitParams::default(), SplitParams::new(0.15, 42).unwrap());
        assert_eq!(SplitParams::default().test_len(100), 15);
        assert_eq!(SplitParams::default().test_len(10), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialized_params_are_validated() {
        let raw = |test_fraction| RawSplitParams {
            test_fraction,
            seed: 42,
        };
        assert_eq!(
            SplitParams::try_from(raw(1.0)),
            Err(ConfigError::TestFraction(1.0))
        );
        assert_eq!(SplitParams::try_from(raw(0.15)), Ok(SplitParams::default()));
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let ids: Vec<SubjectId> = (1..=57).map(id).collect();
        let (train, test) = split_subjects(ids.clone(), &SplitParams::default()).unwrap();
        assert_eq!(test.len(), 9);
        assert_eq!(train.len(), 48);

        let train: HashSet<_> = train.into_iter().collect();
        let test: HashSet<_> = test.into_iter().collect();
        assert!(train.is_disjoint(&test));
        let all: HashSet<SubjectId> = train.union(&test).cloned().collect();
        let expected: HashSet<SubjectId> = ids.into_iter().collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_split_is_reproducible() {
        let ids: Vec<usize> = (0..40).collect();
        let p = SplitParams::default();
        let a = split_subjects(ids.clone(), &p).unwrap();
        let b = split_subjects(ids.clone(), &p).unwrap();
        assert_eq!(a, b);

        let c = split_subjects(ids, &SplitParams::new(0.15, 7).unwrap()).unwrap();
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn test_split_degenerate() {
        let p = SplitParams::new(0.5, 1).unwrap();
        assert!(matches!(
            split_subjects(Vec::<u8>::new(), &p),
            Err(PartitionError::NoSubjects)
        ));
        assert!(matches!(
            split_subjects(vec![1], &p),
            Err(PartitionError::EmptyTrainSet(1))
        ));
        let (train, test) = split_subjects(vec![1, 2], &p).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"png").unwrap();
    }

    #[test]
    fn test_partition_trees() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global");
        let local = dir.path().join("local");
        fs::create_dir_all(&global).unwrap();

        let mut table = LabelTable::new();
        for n in 1..=8 {
            let age = (n != 8).then_some(20.0 + n as f64);
            table.push(LabelRecord {
                id: id(n),
                age,
                sex: Sex::Female,
            });
            for key in ProjectionKey::all_of(&id(n)) {
                if n != 3 || key.stat == crate::Statistic::Mean {
                    touch(global.join(key.file_name()));
                }
            }
            if n != 5 {
                let sub = id(n);
                touch(local.join(sub.as_str()).join(format!("{sub}_Axial_Mean_0_0.png")));
                touch(local.join(sub.as_str()).join(format!("{sub}_Axial_Mean_0_64.png")));
            }
        }
        let labels = global.join("labels.csv");
        table.write_csv(&labels).unwrap();

        let out = dir.path().join("split");
        let summary = partition(&global, &local, &labels, &out, &SplitParams::default()).unwrap();
        assert_eq!(summary.dropped, 1);
        assert_eq!((summary.train_subjects, summary.test_subjects), (5, 2));
        assert_eq!(summary.global_copied, 7 * 6 - 3);
        assert_eq!(summary.global_missing, 3);
        assert_eq!(summary.local_missing, 1);
        assert_eq!(summary.patches_copied, 6 * 2);

        let train = LabelTable::read_csv(out.join("trainset").join(TRAIN_LABELS_CSV)).unwrap();
        let test = LabelTable::read_csv(out.join("testset").join(TEST_LABELS_CSV)).unwrap();
        assert_eq!(train.len() + test.len(), 7);
        for r in train.records() {
            assert!(test.get(&r.id).is_none());
            let name = format!("{}_Axial_Mean.png", r.id);
            assert!(out.join("trainset/global").join(&name).is_file());
            assert!(!out.join("testset/global").join(&name).exists());
            assert!(!out.join("testset/local").join(r.id.as_str()).exists());
        }
        assert!(!out.join("trainset/global").join("IXI008_Axial_Mean.png").exists());
        assert!(!out.join("testset/global").join("IXI008_Axial_Mean.png").exists());
    }

    #[test]
    fn test_repeated_subject_lands_in_one_tree() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global");
        let local = dir.path().join("local");
        fs::create_dir_all(&global).unwrap();
        let labels = global.join("labels.csv");
        fs::write(
            &labels,
            "NIfTI_ID,AGE,SEX\nIXI002,30,M\nIXI002,30,M\nIXI003,41,F\nIXI004,52,F\n",
        )
        .unwrap();

        for seed in 0..20 {
            let out = dir.path().join(format!("split{seed}"));
            let params = SplitParams::new(0.5, seed).unwrap();
            let summary = partition(&global, &local, &labels, &out, &params).unwrap();
            assert_eq!(summary.duplicates, 1);
            assert_eq!((summary.train_subjects, summary.test_subjects), (1, 2));

            let train = LabelTable::read_csv(out.join("trainset").join(TRAIN_LABELS_CSV)).unwrap();
            let test = LabelTable::read_csv(out.join("testset").join(TEST_LABELS_CSV)).unwrap();
            let mut ids: Vec<_> = train.records().iter().chain(test.records()).collect();
            assert_eq!(ids.len(), 3, "seed {seed}");
            ids.sort_by(|a, b| a.id.cmp(&b.id));
            ids.dedup_by(|a, b| a.id == b.id);
            assert_eq!(ids.len(), 3, "seed {seed}");
        }
    }
}
