use super::{report, Env};
use clap::Args;
use ixi_berry::dataset::organize_local_patches;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Organize {
    /// 平铺的局部图像块目录.
    #[arg(long = "local-dir", default_value = "2d/local")]
    local_dir: PathBuf,
}

impl Organize {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        // [local-dir/{id}_*.png] -> [local-dir/{id}/{id}_*.png]
        let summary = organize_local_patches(env.path(&self.local_dir))?;
        report(format_args!(
            "Moved: {}\nSkipped: {}",
            summary.moved, summary.skipped
        ));
        Ok(())
    }
}
