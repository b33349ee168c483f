//! 放疗计划数据模型.
//!
//! 该模块的所有结构都是外部计划读取器产生的只读快照. 本 crate 不会修改它们,
//! 也不会重新校验读取器已经负责的内容 (如单位换算).

mod device;

pub use device::{DeviceKind, LimitingDevice};

use crate::consts::PLAN_KEY;
use crate::error::MissingField;
use std::collections::HashSet;
use crate::{CalcError, CalcResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Y 方向铅门窗口 `(y1, y2)`. 窗口覆盖的竖直条带决定了哪些叶片处于激活状态.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JawWindow {
    /// 下边界.
    pub y1: f64,
    /// 上边界.
    pub y2: f64,
}

impl JawWindow {
    /// 构建铅门窗口.
    #[inline]
    pub const fn new(y1: f64, y2: f64) -> Self {
        Self { y1, y2 }
    }

    /// 窗口高度 `|y2 - y1|`.
    #[inline]
    pub fn extent(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    /// 两个边界是否都是有限值.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.y1.is_finite() && self.y2.is_finite()
    }
}

/// 多叶准直器的左右两组叶片, 按物理叶片索引排列.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeafBanks {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl LeafBanks {
    /// 构建叶片组. 长度一致性由 [`crate::metrics::aperture::analyze`] 检查.
    #[inline]
    pub fn new(left: Vec<f64>, right: Vec<f64>) -> Self {
        Self { left, right }
    }

    /// 从 `[left..., right...]` 形式的拼接位置列表构建叶片组.
    ///
    /// 列表为空或长度为奇数时返回 `None`.
    pub fn from_concatenated(positions: &[f64]) -> Option<Self> {
        if positions.is_empty() || positions.len() % 2 != 0 {
            return None;
        }
        let (left, right) = positions.split_at(positions.len() / 2);
        Some(Self::new(left.to_vec(), right.to_vec()))
    }

    /// 左叶片组位置.
    #[inline]
    pub fn left(&self) -> &[f64] {
        self.left.as_slice()
    }

    /// 右叶片组位置.
    #[inline]
    pub fn right(&self) -> &[f64] {
        self.right.as_slice()
    }

    /// 叶片对个数 (以左叶片组为准).
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// 是否不包含任何叶片.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// 一个控制点上的准直器状态: 铅门窗口 + 叶片组.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collimator {
    /// Y 方向铅门窗口.
    pub jaw: JawWindow,
    /// 叶片组.
    pub banks: LeafBanks,
}

/// 控制点: 射束的一个离散照射状态.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPoint {
    cumulative_weight: f64,
    collimator: Option<Collimator>,
}

impl ControlPoint {
    /// 以累积跳数权重 `cumulative_weight`, 铅门窗口 `jaw` 和叶片组 `banks` 构建控制点.
    #[inline]
    pub fn new(cumulative_weight: f64, jaw: JawWindow, banks: LeafBanks) -> Self {
        Self {
            cumulative_weight,
            collimator: Some(Collimator { jaw, banks }),
        }
    }

    /// 构建缺少准直器子结构的控制点. 计算时该控制点会被跳过.
    #[inline]
    pub fn without_collimator(cumulative_weight: f64) -> Self {
        Self {
            cumulative_weight,
            collimator: None,
        }
    }

    /// 累积跳数权重 (CumulativeMetersetWeight).
    #[inline]
    pub fn cumulative_weight(&self) -> f64 {
        self.cumulative_weight
    }

    /// 准直器状态. 缺失时返回 `Err(MissingField)`.
    #[inline]
    pub fn collimator(&self) -> Result<&Collimator, MissingField> {
        self.collimator.as_ref().ok_or(MissingField)
    }
}

/// 射束.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Beam {
    name: String,
    mu: f64,
    final_weight: f64,
    control_points: Vec<ControlPoint>,
}

impl Beam {
    /// 构建射束.
    ///
    /// `mu` 为射束总跳数, `final_weight` 为 FinalCumulativeMetersetWeight,
    /// 二者都必须是有限正数; `control_points` 至少包含 2 个控制点.
    pub fn new<S: Into<String>>(
        name: S,
        mu: f64,
        final_weight: f64,
        control_points: Vec<ControlPoint>,
    ) -> CalcResult<Self> {
        let beam = Self {
            name: name.into(),
            mu,
            final_weight,
            control_points,
        };
        beam.check()?;
        Ok(beam)
    }

    /// 检查射束级不变量.
    ///
    /// 反序列化得到的射束不经过 [`Beam::new`], 因此计算前会再次调用本函数.
    pub fn check(&self) -> CalcResult<()> {
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return Err(CalcError::InvalidBeam {
                beam: self.name.clone(),
                reason: "MU must be a finite positive number",
            });
        }
        if !(self.final_weight.is_finite() && self.final_weight > 0.0) {
            return Err(CalcError::InvalidBeam {
                beam: self.name.clone(),
                reason: "final cumulative meterset weight must be a finite positive number",
            });
        }
        if self.control_points.len() < 2 {
            return Err(CalcError::TooFewControlPoints {
                beam: self.name.clone(),
                count: self.control_points.len(),
            });
        }
        Ok(())
    }

    /// 射束名.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// 总跳数.
    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// FinalCumulativeMetersetWeight.
    #[inline]
    pub fn final_weight(&self) -> f64 {
        self.final_weight
    }

    /// 按照射顺序排列的控制点.
    #[inline]
    pub fn control_points(&self) -> &[ControlPoint] {
        self.control_points.as_slice()
    }
}

/// 放疗计划: 按顺序排列的射束.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plan {
    id: String,
    beams: Vec<Beam>,
}

impl Plan {
    /// 构建计划.
    ///
    /// 射束名在计划内必须唯一, 且不能是 [`PLAN_KEY`].
    pub fn new<S: Into<String>>(id: S, beams: Vec<Beam>) -> CalcResult<Self> {
        let plan = Self {
            id: id.into(),
            beams,
        };
        plan.check()?;
        Ok(plan)
    }

    /// 检查计划级不变量: 至少一个射束, 射束名唯一且不与 [`PLAN_KEY`] 冲突.
    ///
    /// 与 [`Beam::check`] 一样, 计算前会再次调用本函数.
    pub fn check(&self) -> CalcResult<()> {
        if self.beams.is_empty() {
            return Err(CalcError::EmptyPlan);
        }
        let mut seen = HashSet::with_capacity(self.beams.len());
        for b in &self.beams {
            if b.name() == PLAN_KEY {
                return Err(CalcError::ReservedBeamName {
                    beam: b.name.clone(),
                });
            }
            if !seen.insert(b.name()) {
                return Err(CalcError::DuplicateBeam {
                    beam: b.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// 计划标识.
    #[inline]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// 射束.
    #[inline]
    pub fn beams(&self) -> &[Beam] {
        self.beams.as_slice()
    }
}
