use super::Env;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ixi2d")]
#[command(about = "将 IXI 3D 体数据转换为 2D 投影图像数据集的工具集.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// 数据集根目录. 所有相对路径都在其下解析.
    /// 缺省时依次尝试 `$IXI_DATASET_DIR` 和 `$HOME/dataset/ixi`.
    #[arg(long = "base-dir", short = 'D', global = true)]
    base_dir: Option<PathBuf>,

    /// 输出调试日志.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// 并行处理的线程数, 缺省为可用核心数.
    #[arg(long, short, global = true, value_parser = super::params::positive_usize)]
    jobs: Option<usize>,

    /// 子命令.
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// 是否输出调试日志?
    #[inline]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_program(self) -> anyhow::Result<()> {
        let base_dir = match self.base_dir {
            Some(d) => d,
            None => utils::loader::dataset_dir_from_env_or_home()
                .context("cannot locate the dataset directory, pass `--base-dir`")?,
        };
        log::debug!("dataset directory: `{}`", base_dir.display());

        let jobs = self.jobs.unwrap_or_else(utils::cpus);
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("cannot build the worker pool")?;

        let env = Env::new(base_dir);
        match self.command {
            Commands::Project(v) => v.run(&env),
            Commands::Patch(v) => v.run(&env),
            Commands::Organize(v) => v.run(&env),
            Commands::Split(v) => v.run(&env),
            Commands::TidyLabels(v) => v.run(&env),
            Commands::Run(v) => v.run(&env),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 将体数据投影为六幅全局图像, 并生成 `labels.csv`.
    Project(super::project::Project),
    /// 将全局图像目录切割为局部图像块.
    Patch(super::patch::Patch),
    /// 将平铺的局部图像块按受试者整理成子目录.
    Organize(super::organize::Organize),
    /// 以受试者为单位划分训练集与测试集.
    Split(super::split::Split),
    /// 将原始元数据表精简为 `IXI_ID,AGE,SEX` 三列.
    TidyLabels(super::tidy::TidyLabels),
    /// 一次完成投影与切割, 可选地继续划分数据集.
    Run(super::run::Run),
}
