//! 数据集操作: 体数据枚举, 元数据表适配, 图像块整理与训练/测试集划分.

use crate::error::Result;
use crate::{SubjectId, Volume};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

mod labels;
mod organize;
mod partition;

pub use labels::{tidy, LabelSchema, SourceTable};
pub use organize::{organize_local_patches, OrganizeSummary};
pub use partition::{partition, split_subjects, PartitionError, PartitionSummary, SplitParams};

/// 获取 `{用户主目录}/dataset/ixi` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.extend(["dataset", "ixi"]);
    Some(ans)
}

/// 获取 `{用户主目录}/dataset/ixi` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 目录中的一个体数据文件.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeEntry {
    path: PathBuf,
}

impl VolumeEntry {
    /// 文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件名. 非 UTF-8 的部分被有损替换.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// 由文件名推出的受试者编号, 如 `IXI012-Guys-1234-T1.nii.gz` → `IXI012`.
    #[inline]
    pub fn subject(&self) -> Result<SubjectId> {
        SubjectId::from_volume_file_name(&self.file_name())
    }

    /// 读取体数据.
    #[inline]
    pub fn open(&self) -> Result<Volume> {
        Volume::open(&self.path)
    }
}

/// 判断 `path` 是否具有体数据扩展名 (`.nii`, `.nii.gz`, `.npy`).
pub fn is_volume_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    [".nii", ".nii.gz", ".npy"].iter().any(|ext| name.ends_with(ext))
}

/// 按文件名排序, 列出 `dir` 下 (不递归) 的全部体数据文件.
pub fn list_volumes<P: AsRef<Path>>(dir: P) -> Result<Vec<VolumeEntry>> {
    let files = list_files(dir.as_ref(), is_volume_file)?;
    Ok(files.into_iter().map(|path| VolumeEntry { path }).collect())
}

/// 按文件名排序, 列出 `dir` 下 (不递归) 满足 `accept` 的普通文件.
pub(crate) fn list_files(dir: &Path, accept: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() && accept(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn walk_error(e: walkdir::Error) -> io::Error {
    e.into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop while listing directory"))
}

/// 判断 `path` 是否具有 `.png` 扩展名.
pub(crate) fn is_png(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_volume_extensions() {
        assert!(is_volume_file(Path::new("a/IXI002-Guys-0828-T1.nii.gz")));
        assert!(is_volume_file(Path::new("IXI002.nii")));
        assert!(is_volume_file(Path::new("IXI002.NPY")));
        assert!(!is_volume_file(Path::new("IXI002.nii.gz.bak")));
        assert!(!is_volume_file(Path::new("labels.csv")));
    }

    #[test]
    fn test_list_volumes_sorted_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["IXI012-HH-1.nii.gz", "IXI002-Guys-2.nii", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("IXI999.nii")).unwrap();

        let found = list_volumes(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(VolumeEntry::file_name).collect();
        assert_eq!(names, ["IXI002-Guys-2.nii", "IXI012-HH-1.nii.gz"]);
        assert_eq!(found[1].subject().unwrap().as_str(), "IXI012");
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_volumes(dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_home_dataset_dir_with() {
        if let Some(base) = home_dataset_dir() {
            let full = home_dataset_dir_with(["gm", "pve0"]).unwrap();
            assert_eq!(full, base.join("gm").join("pve0"));
        }
    }
}
