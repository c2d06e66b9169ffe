//! 8-bit 灰度图像的持久化存储与缩放.

use crate::Idx2d;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageResult};
use ndarray::{Array2, ArrayView2};
use std::path::Path;

/// 表明一个可以通过 **按原样** 模式持久化存储的单通道图像对象.
///
/// 像素值不做任何映射, 行对应图像的高, 列对应图像的宽. 输出格式由 `path` 的扩展名决定.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

macro_rules! impl_gray_raw {
    ($($arr: ty),+) => {
        $(
            /// 按原样存储.
            impl ImgWriteRaw for $arr {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    array_to_gray(self.view()).save(path)
                }
            }
        )+
    };
}

impl_gray_raw!(ArrayView2<'_, u8>, Array2<u8>);

/// 将二维数组复制为 `GrayImage`.
pub(crate) fn array_to_gray(view: ArrayView2<u8>) -> GrayImage {
    let (height, width) = view.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &pix) in view.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
    }
    buf
}

/// 将 `GrayImage` 转换为 `(高, 宽)` 形状的二维数组.
pub(crate) fn gray_to_array(img: GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    // `GrayImage` 本身就是行优先的连续存储, 长度一定匹配.
    Array2::from_shape_vec((height as usize, width as usize), img.into_raw())
        .expect("GrayImage buffer is row-major and exactly height * width long")
}

/// 使用三次 (Catmull-Rom) 插值核将图像缩放到 `(高, 宽)` = `shape`.
pub(crate) fn resize_cubic(view: ArrayView2<u8>, (height, width): Idx2d) -> Array2<u8> {
    let src = array_to_gray(view);
    let dst = imageops::resize(&src, width as u32, height as u32, FilterType::CatmullRom);
    gray_to_array(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_shape_and_constant() {
        let img = Array2::from_elem((100, 37), 77u8);
        let out = resize_cubic(img.view(), (256, 256));
        assert_eq!(out.dim(), (256, 256));
        // 常数图像经插值后仍是常数.
        assert!(out.iter().all(|&p| p == 77));
    }

    #[test]
    fn test_gray_conversion_keeps_orientation() {
        let img = Array2::from_shape_fn((2, 3), |(h, w)| (h * 10 + w) as u8);
        let gray = array_to_gray(img.view());
        assert_eq!(gray.dimensions(), (3, 2));
        assert_eq!(gray.get_pixel(2, 1).0, [12]);
        assert_eq!(gray_to_array(gray), img);
    }
}
