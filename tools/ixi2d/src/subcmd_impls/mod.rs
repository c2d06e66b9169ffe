pub mod args;
mod organize;
mod params;
mod patch;
mod project;
mod run;
mod split;
mod tidy;

use std::path::{Path, PathBuf};

/// 子命令共享的运行环境.
pub struct Env {
    base_dir: PathBuf,
}

impl Env {
    /// 以 `base_dir` 为数据集根目录. 相对路径都在其下解析.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// 解析用户给出的路径.
    #[inline]
    pub fn path<P: AsRef<Path>>(&self, p: P) -> PathBuf {
        utils::loader::resolve_in(&self.base_dir, p)
    }
}

/// 打印被分隔线包围的报告.
fn report<T: std::fmt::Display>(what: T) {
    utils::sep();
    println!("{what}");
    utils::sep();
}
