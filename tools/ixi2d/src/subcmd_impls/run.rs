use super::params::{EnhanceArgs, PatchArgs, SchemaArgs, SplitArgs};
use super::{report, Env};
use anyhow::Context;
use clap::Args;
use ixi_berry::consts::LABELS_CSV;
use ixi_berry::dataset::partition;
use ixi_berry::patch::PatchLayout;
use ixi_berry::pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Run {
    /// 体数据目录.
    #[arg(long = "input-dir", default_value = "pve0")]
    input_dir: PathBuf,
    /// 原始元数据表 (CSV).
    #[arg(long, default_value = "IXI.csv")]
    labels: PathBuf,
    /// 输出目录, 其下生成 `global/` 与 `local/{受试者}/`.
    #[arg(long = "out-dir", default_value = "2d")]
    out_dir: PathBuf,
    /// 完成后继续划分训练集与测试集.
    #[arg(long)]
    split: bool,
    #[command(flatten)]
    schema: SchemaArgs,
    #[command(flatten)]
    enhance: EnhanceArgs,
    #[command(flatten)]
    patch: PatchArgs,
    #[command(flatten)]
    split_args: SplitArgs,
}

impl Run {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        // 所有参数在处理任何文件前校验.
        let split_params = self.split_args.params()?;
        let out_dir = env.path(&self.out_dir);
        let mut config =
            PipelineConfig::new(env.path(&self.input_dir), env.path(&self.labels), &out_dir);
        config.schema = self.schema.schema();
        config.enhance = self.enhance.params()?;
        config.canonical_shape = self.enhance.canonical_size();
        config.patch = self.patch.params()?;
        let (global_dir, local_dir) = (out_dir.join("global"), out_dir.join("local"));
        config.global_dir = global_dir.clone();
        config.local_dir = Some(local_dir.clone());
        config.layout = PatchLayout::BySubject;

        let summary = Pipeline::new(config)?.run().context("batch run failed")?;
        report(summary);

        if self.split {
            let summary = partition(
                &global_dir,
                &local_dir,
                &global_dir.join(LABELS_CSV),
                &out_dir,
                &split_params,
            )?;
            report(summary);
        }
        Ok(())
    }
}
