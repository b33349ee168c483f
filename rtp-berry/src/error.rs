//! 运行时错误.

use thiserror::Error;

/// 单个控制点的几何错误.
///
/// 该错误不携带射束和控制点信息, 由上层包装为 [`CalcError::Geometry`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// 左右叶片组长度不一致.
    #[error("leaf bank length mismatch: left {left}, right {right}")]
    BankLengthMismatch {
        /// 左叶片组长度.
        left: usize,
        /// 右叶片组长度.
        right: usize,
    },

    /// 同一射束内, 控制点的叶片对个数与之前的控制点不同.
    #[error("control point has {found} leaf pairs, beam expects {expected}")]
    InconsistentLeafCount {
        /// 射束中首个有效控制点的叶片对个数.
        expected: usize,
        /// 当前控制点的叶片对个数.
        found: usize,
    },

    /// 铅门窗口不是有限值.
    #[error("jaw window ({y1}, {y2}) is not finite")]
    NonFiniteJaw {
        /// 下边界.
        y1: f64,
        /// 上边界.
        y2: f64,
    },

    /// 铅门窗口映射出的激活叶片区间 `[lo, hi)` 为空.
    #[error("jaw window maps to an empty active leaf range [{lo}, {hi})")]
    EmptyActiveRange {
        /// 区间下界.
        lo: i64,
        /// 区间上界 (不含).
        hi: i64,
    },

    /// 激活叶片区间 `[lo, hi)` 超出叶片组范围.
    #[error("active leaf range [{lo}, {hi}) exceeds {leaves} leaf pairs")]
    ActiveRangeOutOfBounds {
        /// 区间下界.
        lo: i64,
        /// 区间上界 (不含).
        hi: i64,
        /// 叶片对个数.
        leaves: usize,
    },

    /// 某个激活叶片对的右叶片位于左叶片左侧.
    #[error("leaf pair {leaf} is inverted: left {left} > right {right}")]
    InvertedAperture {
        /// 叶片索引.
        leaf: usize,
        /// 左叶片位置.
        left: f64,
        /// 右叶片位置.
        right: f64,
    },

    /// 归一化跨度为 0 (激活区域完全闭合且所有叶片位置重合).
    #[error("normalisation span is zero")]
    ZeroSpan,
}

/// 控制点缺少铅门/叶片位置子结构.
///
/// 该错误是可容忍的: 对应控制点在输出序列中记为缺失, 射束计算继续进行.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("control point lacks beam limiting device positions")]
pub struct MissingField;

/// 复杂度计算的运行时错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// 控制点几何错误. 对所在射束是致命的.
    #[error("beam `{beam}`, control point {control_point}: {source}")]
    Geometry {
        /// 射束名.
        beam: String,
        /// 控制点索引 (从 0 开始).
        control_point: usize,
        /// 具体几何错误.
        source: GeometryError,
    },

    /// 射束中所有叶片在所有控制点都闭合于同一位置, AAV 无法归一化.
    #[error("beam `{beam}` has a zero AAV normalisation span")]
    ZeroNormalization {
        /// 射束名.
        beam: String,
    },

    /// 计划不包含任何射束.
    #[error("plan has no beams")]
    EmptyPlan,

    /// 计划中有重名射束.
    #[error("beam name `{beam}` appears more than once")]
    DuplicateBeam {
        /// 射束名.
        beam: String,
    },

    /// 射束名与计划级指标的键冲突.
    #[error("beam name `{beam}` is reserved")]
    ReservedBeamName {
        /// 射束名.
        beam: String,
    },

    /// 射束的控制点不足以构成任何照射片段.
    #[error("beam `{beam}` has {count} control points, at least 2 required")]
    TooFewControlPoints {
        /// 射束名.
        beam: String,
        /// 实际控制点个数.
        count: usize,
    },

    /// 射束级字段非法.
    #[error("beam `{beam}` is invalid: {reason}")]
    InvalidBeam {
        /// 射束名.
        beam: String,
        /// 原因.
        reason: &'static str,
    },
}

impl CalcError {
    /// 出错的射束名. 与具体射束无关的错误返回 `None`.
    pub fn beam(&self) -> Option<&str> {
        match self {
            CalcError::Geometry { beam, .. }
            | CalcError::ZeroNormalization { beam }
            | CalcError::DuplicateBeam { beam }
            | CalcError::ReservedBeamName { beam }
            | CalcError::TooFewControlPoints { beam, .. }
            | CalcError::InvalidBeam { beam, .. } => Some(beam.as_str()),
            CalcError::EmptyPlan => None,
        }
    }
}
