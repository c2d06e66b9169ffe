//! 将平铺在同一目录下的局部图像块按受试者归入子目录.

use super::{is_png, list_files};
use crate::error::Result;
use crate::SubjectId;
use std::fs;
use std::path::Path;

/// 整理结果统计.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    /// 被移动的文件数.
    pub moved: usize,

    /// 文件名不含受试者编号而被跳过的文件数.
    pub skipped: usize,
}

/// 将 `dir` 下 (不递归) 的每个 `.png` 文件移动到 `dir/{受试者}/`.
///
/// 受试者编号取文件名第一个 `_` 之前的部分, 它必须已经是规范形式 (如 `IXI002`),
/// 否则跳过该文件并记录警告.
pub fn organize_local_patches<P: AsRef<Path>>(dir: P) -> Result<OrganizeSummary> {
    let dir = dir.as_ref();
    let mut summary = OrganizeSummary::default();
    for path in list_files(dir, is_png)? {
        let Some(subject) = subject_prefix(&path) else {
            log::warn!("skip `{}`: no subject prefix", path.display());
            summary.skipped += 1;
            continue;
        };
        let sub_dir = dir.join(subject.as_str());
        fs::create_dir_all(&sub_dir)?;
        if let Some(name) = path.file_name() {
            fs::rename(&path, sub_dir.join(name))?;
            summary.moved += 1;
        }
    }
    log::info!(
        "{}: {} patches moved, {} skipped",
        dir.display(),
        summary.moved,
        summary.skipped
    );
    Ok(summary)
}

fn subject_prefix(path: &Path) -> Option<SubjectId> {
    let stem = path.file_stem()?.to_str()?;
    let (prefix, _) = stem.split_once('_')?;
    SubjectId::normalize(prefix)
        .ok()
        .filter(|id| id.as_str() == prefix)
}
