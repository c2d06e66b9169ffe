#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将 IXI 数据集的 3D 脑部 MRI 体数据 (nifti) 转换为可用于模型训练的
//! 2D 图像数据集: 全局投影图像 + 局部图像块 + 标签表.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要负责处理 IXI 数据 (`IXI{编号}-{医院}-{序号}-{模态}.nii.gz`),
//!   没有对其它源的数据进行直接适配 (但如果新数据按照 IXI 模式命名, 也可以工作).
//! 2. 单个受试者的处理失败 (无法读取、缺少标签等) 不会中断整个批处理,
//!   只会被记录并计入运行统计.
//!
//! # 开发计划
//!
//! ### 体数据轴向统计投影 ✅
//!
//! 沿三个轴分别求均值与样本标准差 (N - 1), 得到六张 2D 标量场.
//! 投影前沿最后一个轴翻转 **一次**, 以修正方向约定.
//!
//! 实现位于 `ixi-berry/src/project`.
//!
//! ### 对比度增强 ✅
//!
//! min-max 规范化 -> CLAHE -> gamma 查找表. 三个参数均可配置.
//!
//! 实现位于 `ixi-berry/src/enhance`.
//!
//! ### 全局图像持久化与标签累积 ✅
//!
//! 三次插值缩放到规范分辨率, 以 `{受试者}_{轴}_{统计量}.png` 命名保存.
//!
//! 实现位于 `ixi-berry/src/writer.rs`.
//!
//! ### 局部图像块切割 ✅
//!
//! 固定步长网格切割, 按非零像素占比过滤近乎全黑的图像块.
//!
//! 实现位于 `ixi-berry/src/patch`.
//!
//! ### 数据集划分 ✅
//!
//! 以受试者 (而不是图像) 为单位做可复现的训练/测试集划分, 并复制对应图像.
//!
//! 实现位于 `ixi-berry/src/dataset/partition.rs`.
//!
//! ### 小功能 ✅
//!
//! 1. 标签表适配器, 与原始表格列名解耦. ✅
//! 2. 将散落的局部图像块按受试者整理成目录. ✅
//! 3. 批处理运行统计. ✅

/// 二维索引 / 形状, 以 `(高, 宽)` 即 `(行, 列)` 顺序存储.
pub type Idx2d = (usize, usize);

/// 三维索引 / 形状, 按体数据原始的 `(轴 0, 轴 1, 轴 2)` 顺序存储.
pub type Idx3d = (usize, usize, usize);

/// 3D 体数据及其键、受试者等基础数据结构.
mod data;

pub use data::{ImgWriteRaw, LabelRecord, PatchKey, ProjAxis, ProjectionKey, Sex, Statistic};
pub use data::{SubjectId, Volume};

pub mod consts;

pub mod error;

pub mod project;

pub mod enhance;

pub mod writer;

pub mod patch;

pub mod dataset;

pub mod pipeline;

pub mod prelude;
