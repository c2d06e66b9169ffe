use super::params::{EnhanceArgs, SchemaArgs};
use super::{report, Env};
use anyhow::Context;
use clap::Args;
use ixi_berry::pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Project {
    /// 体数据目录.
    #[arg(long = "input-dir", default_value = "pve0")]
    input_dir: PathBuf,
    /// 原始元数据表 (CSV).
    #[arg(long, default_value = "IXI.csv")]
    labels: PathBuf,
    /// 全局图像与 `labels.csv` 的输出目录.
    #[arg(long = "global-dir", default_value = "2d/global")]
    global_dir: PathBuf,
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    enhance: EnhanceArgs,
}

impl Project {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        // [input-dir/*.nii.gz] -> [global-dir/{id}_{Axis}_{Stat}.png, global-dir/labels.csv]
        let mut config = PipelineConfig::new(
            env.path(&self.input_dir),
            env.path(&self.labels),
            env.path("."),
        );
        config.global_dir = env.path(&self.global_dir);
        config.local_dir = None;
        config.schema = self.schema.schema();
        config.enhance = self.enhance.params()?;
        config.canonical_shape = self.enhance.canonical_size();

        let summary = Pipeline::new(config)?.run().context("projection failed")?;
        report(summary);
        Ok(())
    }
}
