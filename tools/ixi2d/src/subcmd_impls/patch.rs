use super::params::PatchArgs;
use super::{report, Env};
use clap::{Args, ValueEnum};
use ixi_berry::patch::{PatchLayout, PatchTiler};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Patch {
    /// 全局图像目录.
    #[arg(long = "global-dir", default_value = "2d/global")]
    global_dir: PathBuf,
    /// 局部图像块输出目录.
    #[arg(long = "local-dir", default_value = "2d/local")]
    local_dir: PathBuf,
    /// 输出布局.
    #[arg(long, value_enum, default_value_t = Layout::Flat)]
    layout: Layout,
    #[command(flatten)]
    patch: PatchArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
/// 局部图像块的目录布局.
enum Layout {
    /// 全部放在同一目录.
    Flat,
    /// 每个受试者一个子目录.
    BySubject,
}

impl From<Layout> for PatchLayout {
    fn from(value: Layout) -> Self {
        match value {
            Layout::Flat => PatchLayout::Flat,
            Layout::BySubject => PatchLayout::BySubject,
        }
    }
}

impl Patch {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        // [global-dir/*.png] -> [local-dir/{source}_{row}_{col}.png]
        let tiler = PatchTiler::new(self.patch.params()?);
        let stats = tiler.tile_directory(
            &env.path(&self.global_dir),
            &env.path(&self.local_dir),
            self.layout.into(),
        )?;
        report(format_args!(
            "Patches emitted: {}\nPatches rejected: {}",
            stats.accepted, stats.rejected
        ));
        Ok(())
    }
}
