use super::params::SchemaArgs;
use super::Env;
use clap::Args;
use ixi_berry::dataset;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TidyLabels {
    /// 原始元数据表 (CSV).
    #[arg(long, default_value = "IXI.csv")]
    input: PathBuf,
    /// 精简表输出路径.
    #[arg(long, default_value = "labels.csv")]
    output: PathBuf,
    #[command(flatten)]
    schema: SchemaArgs,
}

impl TidyLabels {
    pub fn run(self, env: &Env) -> anyhow::Result<()> {
        let output = env.path(&self.output);
        let n = dataset::tidy(env.path(&self.input), &output, &self.schema.schema())?;
        log::info!("{n} rows written to `{}`", output.display());
        Ok(())
    }
}
