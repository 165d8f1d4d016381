//! 原始像素缓冲区 (VideoFrame).
//!
//! 编码路径的输入, 也是解码插件的输出.

use heif_core::PixelFormat;

/// 视频帧
///
/// 多平面存储, 例如 YUV420P 有 3 个平面: Y, U, V.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数 (linesize / stride)
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
}

impl VideoFrame {
    /// 创建像素全部为 0 的视频帧, 各平面按像素格式分配
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count() as usize;
        let mut data = Vec::with_capacity(plane_count);
        let mut linesize = Vec::with_capacity(plane_count);
        for plane in 0..plane_count {
            let stride = pixel_format.plane_linesize(plane, width).unwrap_or(0);
            let rows = pixel_format.plane_height(plane, height).unwrap_or(0);
            data.push(vec![0u8; stride * rows]);
            linesize.push(stride);
        }
        Self {
            data,
            linesize,
            width,
            height,
            pixel_format,
        }
    }

    /// 亮度位深
    pub fn luma_bits(&self) -> u32 {
        self.pixel_format.bits_per_component()
    }
}
