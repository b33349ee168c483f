//! 控制点上的准直设备位置列表 (BeamLimitingDevicePositionSequence) 适配.

use super::{ControlPoint, JawWindow, LeafBanks};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 准直设备类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceKind {
    /// X 方向铅门 (`X` / `ASYMX`).
    AsymX,

    /// Y 方向铅门 (`Y` / `ASYMY`).
    AsymY,

    /// X 方向多叶准直器 (`MLCX`).
    MlcX,

    /// 其它或未知类型.
    Other,
}

impl DeviceKind {
    /// 从 RTBeamLimitingDeviceType 标签解析设备类型. 大小写不敏感.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "X" | "ASYMX" => Self::AsymX,
            "Y" | "ASYMY" => Self::AsymY,
            "MLCX" => Self::MlcX,
            _ => Self::Other,
        }
    }
}

/// 某个准直设备在一个控制点上的位置 (LeafJawPositions).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimitingDevice {
    /// 设备类型.
    pub kind: DeviceKind,
    /// 位置列表. 铅门为 `[lo, hi]`, 多叶准直器为 `[left..., right...]`.
    pub positions: Vec<f64>,
}

impl LimitingDevice {
    /// 构建设备位置.
    #[inline]
    pub fn new(kind: DeviceKind, positions: Vec<f64>) -> Self {
        Self { kind, positions }
    }
}

impl ControlPoint {
    /// 从设备位置列表构建控制点.
    ///
    /// 优先按类型选取 Y 铅门和多叶准直器; 类型信息不全时退回按位置选取:
    ///
    /// 1. 三个设备时, 第二个是 Y 铅门, 第三个是多叶准直器;
    /// 2. 两个设备时, 第一个是 Y 铅门, 第二个是多叶准直器.
    ///
    /// 其它形状, 或 Y 铅门位置个数不为 2, 或叶片位置个数为奇数时,
    /// 得到的控制点不含准直器状态 (计算时记为缺失).
    pub fn from_devices(cumulative_weight: f64, devices: &[LimitingDevice]) -> Self {
        let jaw_and_mlc =
            Self::pick_by_kind(devices).or_else(|| Self::pick_by_position(devices));
        let collimator = jaw_and_mlc.and_then(|(jaw, mlc)| {
            let [y1, y2] = <[f64; 2]>::try_from(jaw.positions.as_slice()).ok()?;
            let banks = LeafBanks::from_concatenated(&mlc.positions)?;
            Some((JawWindow::new(y1, y2), banks))
        });

        match collimator {
            Some((jaw, banks)) => Self::new(cumulative_weight, jaw, banks),
            None => Self::without_collimator(cumulative_weight),
        }
    }

    fn pick_by_kind(devices: &[LimitingDevice]) -> Option<(&LimitingDevice, &LimitingDevice)> {
        let jaw = devices.iter().find(|d| d.kind == DeviceKind::AsymY)?;
        let mlc = devices.iter().find(|d| d.kind == DeviceKind::MlcX)?;
        Some((jaw, mlc))
    }

    fn pick_by_position(devices: &[LimitingDevice]) -> Option<(&LimitingDevice, &LimitingDevice)> {
        match devices {
            [_, jaw, mlc] | [jaw, mlc] => Some((jaw, mlc)),
            _ => None,
        }
    }
}
