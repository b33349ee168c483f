//! 指标计算参数.

use crate::consts::{DEFAULT_LEAF_PITCH, DEFAULT_THRESHOLDS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 指标计算参数, 包含叶片宽度和四个孔径大小门限.
///
/// 该结构是只读的. 若要修改参数, 你应该创建新的实例.
/// 同一批次的计划应当使用同一组参数, 否则结果之间不可比较.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricConfig {
    leaf_pitch: f64,
    thresholds: [f64; 4],
}

impl MetricConfig {
    /// 构建参数.
    ///
    /// `leaf_pitch` 必须是有限正数, `thresholds` 必须是严格递增的有限正数,
    /// 否则返回 `None`.
    pub fn new(leaf_pitch: f64, thresholds: [f64; 4]) -> Option<Self> {
        let pitch_ok = leaf_pitch.is_finite() && leaf_pitch > 0.0;
        let thresholds_ok = thresholds.iter().all(|t| t.is_finite() && *t > 0.0)
            && thresholds.windows(2).all(|w| w[0] < w[1]);
        (pitch_ok && thresholds_ok).then_some(Self {
            leaf_pitch,
            thresholds,
        })
    }

    /// 只修改叶片宽度, 门限保持默认值.
    #[inline]
    pub fn with_leaf_pitch(leaf_pitch: f64) -> Option<Self> {
        Self::new(leaf_pitch, DEFAULT_THRESHOLDS)
    }

    /// 常规参数: 叶片宽度 5 mm, 门限 2/5/10/20 mm.
    #[inline]
    pub const fn standard() -> Self {
        Self {
            leaf_pitch: DEFAULT_LEAF_PITCH,
            thresholds: DEFAULT_THRESHOLDS,
        }
    }

    /// 叶片宽度.
    #[inline]
    pub fn leaf_pitch(&self) -> f64 {
        self.leaf_pitch
    }

    /// 孔径大小门限.
    #[inline]
    pub fn thresholds(&self) -> [f64; 4] {
        self.thresholds
    }
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self::standard()
    }
}
