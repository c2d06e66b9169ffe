//! 受试者元数据表的适配.
//!
//! 原始表的列名由 [`LabelSchema`] 描述, 读入后以规范化的 [`SubjectId`] 为键.

use crate::error::{PipelineError, Result};
use crate::writer::parse_age;
use crate::{LabelRecord, Sex, SubjectId};
use std::collections::HashMap;
use std::path::Path;

/// 原始元数据表的列名.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelSchema {
    /// 受试者编号列.
    pub id_column: String,

    /// 年龄列.
    pub age_column: String,

    /// 性别编码列, 1 为男, 2 为女.
    pub sex_column: String,
}

/// IXI 官方表格的列名.
impl Default for LabelSchema {
    fn default() -> Self {
        Self {
            id_column: "IXI_ID".to_owned(),
            age_column: "AGE".to_owned(),
            sex_column: "SEX_ID (1=m, 2=f)".to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
struct SourceRow {
    id: SubjectId,
    age: Option<f64>,
    sex_code: String,
}

/// 读入内存的原始元数据表.
///
/// 性别保留原始编码, 直到 [`SourceTable::lookup`] 时才做映射.
#[derive(Clone, Debug, Default)]
pub struct SourceTable {
    rows: Vec<SourceRow>,
    index: HashMap<SubjectId, usize>,
}

impl SourceTable {
    /// 按 `schema` 读取 CSV 表.
    ///
    /// 编号无法解析的行被跳过; 编号重复时保留首行. 两者都会记录警告.
    /// 缺少 `schema` 中任一列时返回 [`PipelineError::MissingColumn`].
    pub fn load<P: AsRef<Path>>(path: P, schema: &LabelSchema) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_owned()))
        };
        let id_col = column(&schema.id_column)?;
        let age_col = column(&schema.age_column)?;
        let sex_col = column(&schema.sex_column)?;

        let mut table = Self::default();
        for (line, row) in rdr.records().enumerate() {
            let row = row?;
            let field = |i: usize| row.get(i).unwrap_or_default().trim();
            let id = match SubjectId::normalize(field(id_col)) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("{}: row {}: {e}", path.display(), line + 1);
                    continue;
                }
            };
            if table.index.contains_key(&id) {
                log::warn!("{}: duplicate row for {id}, keeping the first", path.display());
                continue;
            }
            let age = parse_age(field(age_col)).unwrap_or_else(|| {
                log::warn!("{}: unreadable age `{}` for {id}", path.display(), field(age_col));
                None
            });
            table.index.insert(id.clone(), table.rows.len());
            table.rows.push(SourceRow {
                id,
                age,
                sex_code: field(sex_col).to_owned(),
            });
        }
        Ok(table)
    }

    /// 有效行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 查询受试者的标签记录.
    ///
    /// 无对应行时返回 [`PipelineError::MissingLabel`]; 性别编码不是 1 或 2 时返回
    /// [`PipelineError::UnmappedCategory`].
    pub fn lookup(&self, id: &SubjectId) -> Result<LabelRecord> {
        let row = self
            .index
            .get(id)
            .map(|&i| &self.rows[i])
            .ok_or_else(|| PipelineError::MissingLabel(id.clone()))?;
        let sex = Sex::from_code(&row.sex_code).ok_or_else(|| PipelineError::UnmappedCategory {
            id: id.clone(),
            code: row.sex_code.clone(),
        })?;
        Ok(LabelRecord {
            id: row.id.clone(),
            age: row.age,
            sex,
        })
    }

    /// 写出只保留 `IXI_ID,AGE,SEX` 三列的精简表. 性别保留原始编码.
    pub fn write_tidy<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["IXI_ID", "AGE", "SEX"])?;
        for row in self.rows.iter() {
            let age = row.age.map(|a| a.to_string()).unwrap_or_default();
            wtr.write_record([row.id.as_str(), age.as_str(), row.sex_code.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// 读取 `src` 并在 `dst` 写出精简表, 返回写出的行数.
pub fn tidy<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q, schema: &LabelSchema) -> Result<usize> {
    let table = SourceTable::load(src, schema)?;
    table.write_tidy(dst)?;
    Ok(table.len())
}
