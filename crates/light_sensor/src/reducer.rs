//! FrameReducer - 把采样窗口内的强度折算为一个标量

use contracts::{ContractError, Frame, SamplingWindow, WindowOrigin};

/// 帧归约器
///
/// 纯函数：相同的帧与参数总是得到相同结果，内部不保留状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReducer {
    fov: u32,
    origin: WindowOrigin,
}

impl FrameReducer {
    /// 创建归约器
    ///
    /// # Errors
    /// `fov == 0` 时返回配置错误。
    pub fn new(fov: u32, origin: WindowOrigin) -> Result<Self, ContractError> {
        if fov == 0 {
            return Err(ContractError::config_validation("fov", "fov must be >= 1"));
        }
        Ok(Self { fov, origin })
    }

    /// 窗口边长
    pub fn fov(&self) -> u32 {
        self.fov
    }

    /// 窗口定位方式
    pub fn origin(&self) -> WindowOrigin {
        self.origin
    }

    /// 在给定帧上定位采样窗口
    pub fn locate(&self, frame: &Frame<'_>) -> Result<SamplingWindow, ContractError> {
        SamplingWindow::locate(
            self.fov,
            self.origin,
            frame.width(),
            frame.height(),
            frame.len(),
        )
    }

    /// 对已定位的窗口求均值
    ///
    /// 窗口必须由同一帧的 [`locate`](Self::locate) 得到，对外只暴露 [`reduce`](Self::reduce)。
    pub(crate) fn reduce_window(&self, frame: &Frame<'_>, window: &SamplingWindow) -> f64 {
        let data = frame.data();
        let sum: u64 = window.indices().map(|idx| u64::from(data[idx])).sum();
        let count = (window.side() * window.side()) as f64;
        sum as f64 / count
    }

    /// 定位并归约
    ///
    /// # Errors
    /// 窗口越界时返回 `ConfigValidation { field: "fov" }`。
    pub fn reduce(&self, frame: &Frame<'_>) -> Result<f64, ContractError> {
        let window = self.locate(frame)?;
        Ok(self.reduce_window(frame, &window))
    }
}
