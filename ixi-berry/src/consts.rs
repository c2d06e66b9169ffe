//! 通用常量与默认参数.

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色. 局部图像块的 "占比" 只统计非该值的像素.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是背景 (黑色)?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BLACK)
    }

    /// 像素是否携带信号 (非黑色)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        !is_background(p)
    }
}

/// IXI 受试者编号前缀.
pub const SUBJECT_TAG: &str = "IXI";

/// 受试者编号数字部分的最小宽度 (不足则左侧补 0).
pub const SUBJECT_ID_WIDTH: usize = 3;

/// 规范分辨率 `(高, 宽)`. 所有全局投影图像都会缩放到该大小.
pub const CANONICAL_SHAPE: crate::Idx2d = (256, 256);

/// CLAHE 默认裁剪上限.
pub const CLAHE_CLIP_LIMIT: f64 = 2.0;

/// CLAHE 默认网格 `(行数, 列数)`.
pub const CLAHE_TILE_GRID: crate::Idx2d = (8, 8);

/// 默认 gamma 值. 查找表按 `255 * (i / 255) ^ (1 / gamma)` 构建, 大于 1 时提亮中间调.
pub const GAMMA: f64 = 1.2;

/// 局部图像块默认边长.
pub const PATCH_SIZE: usize = 64;

/// 局部图像块默认步长 (等于边长, 即不重叠).
pub const PATCH_STRIDE: usize = 64;

/// 局部图像块非零像素占比的默认下限.
pub const MIN_OCCUPANCY: f64 = 0.01;

/// 测试集默认占比.
pub const TEST_FRACTION: f64 = 0.15;

/// 数据集划分的默认随机种子.
pub const SPLIT_SEED: u64 = 42;

/// 标签表文件名.
pub const LABELS_CSV: &str = "labels.csv";

/// 训练集标签表文件名.
pub const TRAIN_LABELS_CSV: &str = "train_labels.csv";

/// 测试集标签表文件名.
pub const TEST_LABELS_CSV: &str = "test_labels.csv";
