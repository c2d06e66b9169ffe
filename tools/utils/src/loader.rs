//! 对 `ixi-berry::dataset` 的更一层封装. 提供数据集目录的默认位置.

use std::env;
use std::path::{Path, PathBuf};

/// 环境变量名. 其值为数据集根目录.
pub const DATASET_DIR_ENV: &str = "IXI_DATASET_DIR";

/// 获取 IXI 数据集根目录.
///
/// 1. 若环境变量 `$IXI_DATASET_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/ixi`;
/// 3. 无法确定主目录时返回 `None`.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var_os(DATASET_DIR_ENV) {
        Some(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => ixi_berry::dataset::home_dataset_dir(),
    }
}

/// 在 `base` 下解析 `path`. 绝对路径原样返回.
pub fn resolve_in<P: AsRef<Path>, Q: AsRef<Path>>(base: P, path: Q) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_owned()
    } else {
        base.as_ref().join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_in("/data", dir.path()), dir.path());
        assert_eq!(resolve_in("/data", "pve0"), Path::new("/data/pve0"));
    }
}
