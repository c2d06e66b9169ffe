use super::params::SplitArgs;
use super::{report, Env};
use clap::Args;
use ixi_berry::consts::LABELS_CSV;
use ixi_berry::dataset::partition;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Split {
    /// 全局图像目录.
    #[arg(long = "global-dir", default_value = "2d/global")]
    global_dir: PathBuf,
    /// 按受试者分目录的局部图像块目录.
    #[arg(long = "local-dir", default_value = "2d/local")]
    local_dir: PathBuf,
    /// 标签表, 缺省为全局图像目录下的 `labels.csv`.
    #[arg(long)]
    labels: Option<PathBuf>,
    /// `trainset/` 与 `testset/` 的父目录.
    #[arg(long = "out-dir", default_value = "2d")]
    out_dir: PathBuf,
    #[command(flatten)]
    split: SplitArgs,
}

impl Split {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        // [global-dir, local-dir/{id}] -> [out-dir/{trainset, testset}/{global, local/{id}}]
        let params = self.split.params()?;
        let global_dir = env.path(&self.global_dir);
        let labels = match self.labels {
            Some(p) => env.path(p),
            None => global_dir.join(LABELS_CSV),
        };
        let summary = partition(
            &global_dir,
            &env.path(&self.local_dir),
            &labels,
            &env.path(&self.out_dir),
            &params,
        )?;
        report(summary);
        Ok(())
    }
}
