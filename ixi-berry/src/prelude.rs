//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::{ImgWriteRaw, LabelRecord, PatchKey, ProjAxis, ProjectionKey, Sex, Statistic};
pub use crate::{SubjectId, Volume};

pub use crate::consts::gray::{BLACK, WHITE};
pub use crate::error::{ConfigError, PipelineError};

pub use crate::enhance::{EnhanceParams, Enhancer};
pub use crate::patch::{PatchLayout, PatchParams, PatchTiler, TileStats};
pub use crate::project::ProjectionSet;
pub use crate::writer::{LabelTable, ProjectionWriter};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, LabelSchema, SourceTable, SplitParams};

pub use crate::pipeline::{Pipeline, PipelineConfig, RunSummary};
