//! 全局投影图像与标签表的持久化.

use crate::consts::{CANONICAL_SHAPE, LABELS_CSV};
use crate::data::resize_cubic;
use crate::enhance::Enhancer;
use crate::error::{ConfigError, PipelineError, Result};
use crate::project::ProjectionSet;
use crate::{Idx2d, ImgWriteRaw, LabelRecord, ProjectionKey, Sex, SubjectId};
use ndarray::Array2;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 将受试者的六幅投影增强, 缩放到规范分辨率后保存为 PNG.
///
/// 输出文件名只由 [`ProjectionKey`] 决定, 因此重复运行会覆盖为完全相同的文件.
#[derive(Debug, Clone)]
pub struct ProjectionWriter {
    global_dir: PathBuf,
    canonical_shape: Idx2d,
    enhancer: Enhancer,
}

impl ProjectionWriter {
    /// 创建写出器.
    ///
    /// `canonical_shape` 的任一分量为 0 时返回 `Err`.
    pub fn new<P: Into<PathBuf>>(
        global_dir: P,
        canonical_shape: Idx2d,
        enhancer: Enhancer,
    ) -> Result<Self, ConfigError> {
        if canonical_shape.0 == 0 || canonical_shape.1 == 0 {
            return Err(ConfigError::CanonicalShape(
                canonical_shape.0,
                canonical_shape.1,
            ));
        }
        Ok(Self {
            global_dir: global_dir.into(),
            canonical_shape,
            enhancer,
        })
    }

    /// 以 256 × 256 的规范分辨率和默认增强参数创建写出器.
    pub fn with_defaults<P: Into<PathBuf>>(global_dir: P) -> Self {
        Self {
            global_dir: global_dir.into(),
            canonical_shape: CANONICAL_SHAPE,
            enhancer: Enhancer::default(),
        }
    }

    /// 输出目录.
    #[inline]
    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }

    /// 规范分辨率 `(高, 宽)`.
    #[inline]
    pub fn canonical_shape(&self) -> Idx2d {
        self.canonical_shape
    }

    /// 增强并缩放全部六幅投影, 不做任何 I/O.
    pub fn render(
        &self,
        subject: &SubjectId,
        projections: &ProjectionSet,
    ) -> Vec<(ProjectionKey, Array2<u8>)> {
        projections
            .iter()
            .map(|(axis, stat, field)| {
                let enhanced = self.enhancer.enhance(field.view());
                let key = ProjectionKey {
                    subject: subject.clone(),
                    axis,
                    stat,
                };
                (key, resize_cubic(enhanced.view(), self.canonical_shape))
            })
            .collect()
    }

    /// 渲染并保存六幅投影, 返回规范分辨率的图像供后续切割使用.
    pub fn write(
        &self,
        subject: &SubjectId,
        projections: &ProjectionSet,
    ) -> Result<Vec<(ProjectionKey, Array2<u8>)>> {
        fs::create_dir_all(&self.global_dir)?;
        let images = self.render(subject, projections);
        for (key, img) in images.iter() {
            img.save_raw(self.global_dir.join(key.file_name()))?;
        }
        log::debug!("{subject}: {} projections saved", images.len());
        Ok(images)
    }

    /// 在输出目录中写出标签表 `labels.csv`, 返回其路径.
    pub fn write_labels(&self, table: &LabelTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.global_dir)?;
        let path = self.global_dir.join(LABELS_CSV);
        table.write_csv(&path)?;
        Ok(path)
    }
}

const ID_COLUMN: &str = "NIfTI_ID";
const AGE_COLUMN: &str = "AGE";
const SEX_COLUMN: &str = "SEX";

/// 标签记录的显式累加器.
///
/// 每个受试者产生自己的记录, 由调用方在批处理结束时一次性合并.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelTable {
    records: Vec<LabelRecord>,
}

impl LabelTable {
    /// 空表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条记录.
    #[inline]
    pub fn push(&mut self, record: LabelRecord) {
        self.records.push(record);
    }

    /// 记录数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 表是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 全部记录.
    #[inline]
    pub fn records(&self) -> &[LabelRecord] {
        &self.records
    }

    /// 查找受试者的记录.
    pub fn get(&self, id: &SubjectId) -> Option<&LabelRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// 按受试者编号排序. 编号相同时保持原有次序.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// 只保留年龄非空的记录.
    pub fn with_age(self) -> Self {
        self.records.into_iter().filter(|r| r.age.is_some()).collect()
    }

    /// 每个受试者只保留第一条记录, 返回被删除的记录数.
    pub fn dedup_subjects(&mut self) -> usize {
        let before = self.records.len();
        let mut seen = HashSet::new();
        self.records.retain(|r| {
            let first = seen.insert(r.id.clone());
            if !first {
                log::warn!("duplicate label row for {}, keeping the first one", r.id);
            }
            first
        });
        before - self.records.len()
    }

    /// 以 `NIfTI_ID,AGE,SEX` 表头写出 CSV. 缺失的年龄写为空字段.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([ID_COLUMN, AGE_COLUMN, SEX_COLUMN])?;
        for r in self.records.iter() {
            let age = r.age.map(|a| a.to_string()).unwrap_or_default();
            wtr.write_record([r.id.as_str(), age.as_str(), r.sex.letter()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// 读取 [`LabelTable::write_csv`] 格式的标签表.
    ///
    /// 空字段或 `nan` 年龄读为缺失; 性别只接受 `M` / `F`.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_owned()))
        };
        let id_col = column(ID_COLUMN)?;
        let age_col = column(AGE_COLUMN)?;
        let sex_col = column(SEX_COLUMN)?;

        let mut table = Self::new();
        for row in rdr.records() {
            let row = row?;
            let field = |i: usize| row.get(i).unwrap_or_default();
            let id = SubjectId::normalize(field(id_col))?;
            let age = parse_age(field(age_col)).ok_or_else(|| {
                PipelineError::UnreadableInput(
                    path.to_owned(),
                    format!("bad age `{}` for {id}", field(age_col)),
                )
            })?;
            let sex = Sex::from_letter(field(sex_col)).ok_or_else(|| {
                PipelineError::UnmappedCategory {
                    id: id.clone(),
                    code: field(sex_col).to_owned(),
                }
            })?;
            table.push(LabelRecord { id, age, sex });
        }
        Ok(table)
    }
}

/// 解析年龄字段. 空字段和 `nan` 为 `Some(None)`, 无法解析时为 `None`.
pub(crate) fn parse_age(raw: &str) -> Option<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    match raw.parse::<f64>() {
        Ok(age) if age.is_finite() => Some(Some(age)),
        Ok(_) => Some(None),
        Err(_) => None,
    }
}

impl FromIterator<LabelRecord> for LabelTable {
    fn from_iter<T: IntoIterator<Item = LabelRecord>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<LabelRecord> for LabelTable {
    fn extend<T: IntoIterator<Item = LabelRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl IntoIterator for LabelTable {
    type Item = LabelRecord;
    type IntoIter = std::vec::IntoIter<LabelRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::EnhanceParams;
    use crate::{ProjAxis, Statistic, Volume};
    use ndarray::Array3;

    fn id(raw: &str) -> SubjectId {
        SubjectId::normalize(raw).unwrap()
    }

    fn projections() -> ProjectionSet {
        let data = Array3::from_shape_fn((12, 10, 8), |(x, y, z)| {
            ((x * 7 + y * 3) % 11) as f32 + z as f32 * 0.5
        });
        ProjectionSet::from_volume(Volume::new(data).unwrap())
    }

    #[test]
    fn test_canonical_shape_validation() {
        let e = Enhancer::default();
        assert_eq!(
            ProjectionWriter::new("out", (0, 256), e.clone()).unwrap_err(),
            ConfigError::CanonicalShape(0, 256)
        );
        assert!(ProjectionWriter::new("out", (32, 48), e).is_ok());
    }

    #[test]
    fn test_write_six_images() {
        let dir = tempfile::tempdir().unwrap();
        let enhancer = Enhancer::new(&EnhanceParams::new(2.0, (4, 4), 1.2).unwrap());
        let writer = ProjectionWriter::new(dir.path(), (32, 48), enhancer).unwrap();
        let images = writer.write(&id("7"), &projections()).unwrap();

        assert_eq!(images.len(), 6);
        for (key, img) in images.iter() {
            assert_eq!(img.dim(), (32, 48));
            let path = dir.path().join(key.file_name());
            let saved = image::open(&path).unwrap().into_luma8();
            assert_eq!(saved.dimensions(), (48, 32));
        }
        assert_eq!(images[0].0.axis, ProjAxis::Axial);
        assert_eq!(images[0].0.stat, Statistic::Mean);
        assert!(dir.path().join("IXI007_Sagittal_Std.png").is_file());
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ProjectionWriter::with_defaults(dir.path());
        let set = projections();
        writer.write(&id("3"), &set).unwrap();
        let path = dir.path().join("IXI003_Coronal_Std.png");
        let first = fs::read(&path).unwrap();
        writer.write(&id("3"), &set).unwrap();
        assert_eq!(first, fs::read(&path).unwrap());
    }

    #[test]
    fn test_label_table_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut table: LabelTable = [
            LabelRecord {
                id: id("12"),
                age: Some(35.5),
                sex: Sex::Female,
            },
            LabelRecord {
                id: id("2"),
                age: None,
                sex: Sex::Male,
            },
        ]
        .into_iter()
        .collect();
        table.sort();
        assert_eq!(table.records()[0].id.as_str(), "IXI002");

        let path = dir.path().join("labels.csv");
        table.write_csv(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "NIfTI_ID,AGE,SEX\nIXI002,,M\nIXI012,35.5,F\n");

        let back = LabelTable::read_csv(&path).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.with_age().len(), 1);
    }

    #[test]
    fn test_dedup_subjects_keeps_first() {
        let record = |n: &str, age| LabelRecord {
            id: id(n),
            age,
            sex: Sex::Male,
        };
        let mut table: LabelTable = [
            record("2", Some(30.0)),
            record("3", None),
            record("2", Some(31.0)),
            record("2", None),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.dedup_subjects(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&id("2")).unwrap().age, Some(30.0));
        assert_eq!(table.dedup_subjects(), 0);
    }

    #[test]
    fn test_read_csv_rejects_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");

        fs::write(&path, "NIfTI_ID,AGE\nIXI002,30\n").unwrap();
        assert!(matches!(
            LabelTable::read_csv(&path),
            Err(PipelineError::MissingColumn(c)) if c == "SEX"
        ));

        fs::write(&path, "NIfTI_ID,AGE,SEX\nIXI002,nan,X\n").unwrap();
        assert!(matches!(
            LabelTable::read_csv(&path),
            Err(PipelineError::UnmappedCategory { .. })
        ));

        fs::write(&path, "NIfTI_ID,AGE,SEX\nIXI002,NaN,F\n").unwrap();
        assert_eq!(LabelTable::read_csv(&path).unwrap().records()[0].age, None);
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age(""), Some(None));
        assert_eq!(parse_age(" nan "), Some(None));
        assert_eq!(parse_age("41.2"), Some(Some(41.2)));
        assert_eq!(parse_age("old"), None);
    }
}
