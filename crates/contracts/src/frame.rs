//! Frame - 相机回调输入
//!
//! 宿主渲染线程交付的一帧图像。数据归宿主所有，仅在回调期间借用。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// 借用的帧视图
///
/// 生命周期 `'a` 绑定到宿主回调，插件无法在回调之外持有帧数据。
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    depth: u32,
    format: &'a str,
}

impl<'a> Frame<'a> {
    /// 从宿主回调参数构造
    pub fn new(data: &'a [u8], width: u32, height: u32, depth: u32, format: &'a str) -> Self {
        Self {
            data,
            width,
            height,
            depth,
            format,
        }
    }

    /// 原始采样数据
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// 图像宽度
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 图像高度
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 通道深度 (每像素字节数)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// 宿主给出的像素格式标签
    pub fn format(&self) -> &'a str {
        self.format
    }

    /// 解析后的像素格式 (未知标签返回 None)
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.format.parse().ok()
    }

    /// 采样数
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空帧
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    #[serde(rename = "L8", alias = "L_INT8")]
    L8,
    #[serde(rename = "L16", alias = "L_INT16")]
    L16,
    #[serde(rename = "R8G8B8", alias = "RGB_INT8")]
    Rgb8,
    #[serde(rename = "B8G8R8", alias = "BGR_INT8")]
    Bgr8,
    #[serde(rename = "R8G8B8A8", alias = "RGBA_INT8")]
    Rgba8,
    #[serde(rename = "B8G8R8A8", alias = "BGRA_INT8")]
    Bgra8,
    #[serde(rename = "BAYER_RGGB8")]
    BayerRggb8,
}

impl PixelFormat {
    /// 每像素字节数
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::L8 | Self::BayerRggb8 => 1,
            Self::L16 => 2,
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    /// 总线图像消息使用的编码名
    pub fn encoding(self) -> &'static str {
        match self {
            Self::L8 => "mono8",
            Self::L16 => "mono16",
            Self::Rgb8 => "rgb8",
            Self::Bgr8 => "bgr8",
            Self::Rgba8 => "rgba8",
            Self::Bgra8 => "bgra8",
            Self::BayerRggb8 => "bayer_rggb8",
        }
    }

    /// 宿主使用的规范标签
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L8 => "L8",
            Self::L16 => "L16",
            Self::Rgb8 => "R8G8B8",
            Self::Bgr8 => "B8G8R8",
            Self::Rgba8 => "R8G8B8A8",
            Self::Bgra8 => "B8G8R8A8",
            Self::BayerRggb8 => "BAYER_RGGB8",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L8" | "L_INT8" => Ok(Self::L8),
            "L16" | "L_INT16" => Ok(Self::L16),
            "R8G8B8" | "RGB_INT8" => Ok(Self::Rgb8),
            "B8G8R8" | "BGR_INT8" => Ok(Self::Bgr8),
            "R8G8B8A8" | "RGBA_INT8" => Ok(Self::Rgba8),
            "B8G8R8A8" | "BGRA_INT8" => Ok(Self::Bgra8),
            "BAYER_RGGB8" => Ok(Self::BayerRggb8),
            other => Err(ContractError::config_validation(
                "format",
                format!("unsupported pixel format '{other}'"),
            )),
        }
    }
}

/// 相机几何参数
///
/// 加载时从宿主传感器复制一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraGeometry {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: PixelFormat,
}

impl CameraGeometry {
    /// 按格式推导深度
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            depth: format.bytes_per_pixel(),
            format,
        }
    }

    /// 一行的字节数，溢出时为 `None`
    pub fn checked_step(&self) -> Option<u32> {
        self.width.checked_mul(self.depth)
    }

    /// 整帧字节数，溢出时为 `None`
    pub fn checked_frame_len(&self) -> Option<usize> {
        let step = usize::try_from(self.checked_step()?).ok()?;
        step.checked_mul(usize::try_from(self.height).ok()?)
    }

    /// 一行的字节数 (溢出时饱和)
    ///
    /// 经过校验的几何不会饱和，见 [`CameraGeometry::checked_step`]。
    pub fn step(&self) -> u32 {
        self.checked_step().unwrap_or(u32::MAX)
    }

    /// 整帧字节数 (溢出时饱和)
    pub fn frame_len(&self) -> usize {
        self.checked_frame_len().unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_aliases() {
        assert_eq!("L8".parse::<PixelFormat>().unwrap(), PixelFormat::L8);
        assert_eq!("L_INT8".parse::<PixelFormat>().unwrap(), PixelFormat::L8);
        assert_eq!("RGB_INT8".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb8);
        assert!("YUV422".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_pixel_format_serde_alias() {
        let fmt: PixelFormat = serde_json::from_str("\"BGR_INT8\"").unwrap();
        assert_eq!(fmt, PixelFormat::Bgr8);
        assert_eq!(serde_json::to_string(&fmt).unwrap(), "\"B8G8R8\"");
    }

    #[test]
    fn test_oversized_geometry_does_not_overflow() {
        let geometry = CameraGeometry::new(1_100_000_000, 2, PixelFormat::Rgba8);
        assert_eq!(geometry.checked_step(), None);
        assert_eq!(geometry.checked_frame_len(), None);
        assert_eq!(geometry.step(), u32::MAX);
        assert_eq!(geometry.frame_len(), usize::MAX);
    }

    #[test]
    fn test_geometry_frame_len() {
        let geometry = CameraGeometry::new(64, 48, PixelFormat::Rgb8);
        assert_eq!(geometry.depth, 3);
        assert_eq!(geometry.step(), 192);
        assert_eq!(geometry.frame_len(), 64 * 48 * 3);
    }

    #[test]
    fn test_frame_pixel_format() {
        let data = [0u8; 4];
        let frame = Frame::new(&data, 2, 2, 1, "L8");
        assert_eq!(frame.pixel_format(), Some(PixelFormat::L8));
        assert_eq!(frame.len(), 4);

        let unknown = Frame::new(&data, 2, 2, 1, "WEIRD");
        assert_eq!(unknown.pixel_format(), None);
    }
}
