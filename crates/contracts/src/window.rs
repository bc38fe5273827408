//! SamplingWindow - 采样窗口
//!
//! 一个边长为 `fov` 的方形窗口，只能通过带边界检查的 `locate` 构造。

use crate::{ContractError, WindowOrigin};

/// 已定位的采样窗口
///
/// 采样按 `stride` (= 帧宽度) 跨行寻址，不考虑每像素字节数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    start: usize,
    stride: usize,
    side: usize,
}

impl SamplingWindow {
    /// 在 `width × height`、共 `len` 个采样的缓冲区中定位窗口
    ///
    /// # Errors
    /// `fov == 0`，或窗口的任意采样落在缓冲区之外 (`Centered` 还要求落在图像矩形内)。
    pub fn locate(
        fov: u32,
        origin: WindowOrigin,
        width: u32,
        height: u32,
        len: usize,
    ) -> Result<Self, ContractError> {
        if fov == 0 {
            return Err(ContractError::config_validation("fov", "fov must be >= 1"));
        }

        let side = fov as i64;
        let half = side / 2;
        let w = width as i64;
        let h = height as i64;
        let row = h / 2 - half;

        let start = match origin {
            // 参考公式：列偏移只减一次 fov/2，没有加上 W/2
            WindowOrigin::Reference => w * row - half,
            WindowOrigin::Centered => {
                let col = w / 2 - half;
                if row < 0 || col < 0 || row + side > h || col + side > w {
                    return Err(Self::out_of_bounds(fov, width, height));
                }
                row * w + col
            }
        };

        let last = start + (side - 1) * w + (side - 1);
        if start < 0 || last >= len as i64 {
            return Err(Self::out_of_bounds(fov, width, height));
        }

        Ok(Self {
            start: start as usize,
            stride: width as usize,
            side: fov as usize,
        })
    }

    fn out_of_bounds(fov: u32, width: u32, height: u32) -> ContractError {
        ContractError::config_validation(
            "fov",
            format!("sampling window of side {fov} does not fit a {width}x{height} frame"),
        )
    }

    /// 第一个采样的下标
    pub fn start(&self) -> usize {
        self.start
    }

    /// 行跨度 (采样数)
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// 边长
    pub fn side(&self) -> usize {
        self.side
    }

    /// 窗口内所有采样的下标，按行优先
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.side).flat_map(move |i| {
            let row_start = self.start + i * self.stride;
            row_start..row_start + self.side
        })
    }
}
