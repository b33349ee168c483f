//! 单个控制点的孔径几何.

use crate::config::MetricConfig;
use crate::error::GeometryError;
use crate::plan::{JawWindow, LeafBanks};
use itertools::izip;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个控制点的孔径指标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApertureMetrics {
    /// 激活叶片对的最小孔径.
    pub min_aperture: f64,
    /// 激活叶片对的最大孔径.
    pub max_aperture: f64,
    /// 激活区域内最左的左叶片到最右的右叶片的跨度 (`pos_max`).
    pub max_aperture_no_align: f64,
    /// 激活叶片对的平均孔径.
    pub avg_aperture: f64,
    /// 所有叶片对 (包括未激活的) 的孔径之和.
    pub sum_all_apertures: f64,
    /// 铅门窗口高度 `|y2 - y1|`.
    pub y_diff: f64,
    /// 叶片对总数.
    pub total_mlc: usize,
    /// 激活叶片对个数.
    pub active_mlc: usize,
    /// 索引最小的激活叶片.
    pub lowest_active_mlc: usize,
    /// 索引最大的激活叶片 (闭区间).
    pub highest_active_mlc: usize,
    /// 照射野周长, 包括铅门上下两条边.
    pub perimeter: f64,
    /// 不含铅门上下两条边的周长.
    pub perimeter_no_mlc_size: f64,
    /// 照射野面积.
    pub area: f64,
    /// 叶片序列变化度 (leaf sequence variability).
    pub lsv: f64,
    /// 孔径大于 0 的激活叶片对个数.
    pub n_apertures_open: u32,
    /// 孔径不超过各门限的激活叶片对个数, 与 [`MetricConfig::thresholds`] 一一对应.
    pub n_apertures_leq: [u32; 4],
}

/// 相邻两对激活叶片 (前一对 `prev`, 当前 `cur`) 的孔径关系.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Overlap {
    /// 两个孔径不重叠.
    Disjoint,
    /// 前一个孔径包含当前孔径.
    PrevContains,
    /// 当前孔径严格包含前一个孔径.
    CurContains,
    /// 部分重叠.
    Partial,
}

impl Overlap {
    /// 判断 `prev = (left, right)` 和 `cur = (left, right)` 的关系.
    pub fn classify((prev_left, prev_right): (f64, f64), (left, right): (f64, f64)) -> Self {
        if right <= prev_left || left >= prev_right {
            Self::Disjoint
        } else if right <= prev_right && left >= prev_left {
            Self::PrevContains
        } else if right > prev_right && left < prev_left {
            Self::CurContains
        } else {
            Self::Partial
        }
    }

    /// 当前叶片对对周长的贡献 (竖直方向的边).
    pub fn contribution(prev: (f64, f64), cur: (f64, f64)) -> f64 {
        let prev_width = (prev.1 - prev.0).abs();
        let width = (cur.1 - cur.0).abs();
        match Self::classify(prev, cur) {
            Self::Disjoint => width + prev_width,
            Self::PrevContains => prev_width - width,
            Self::CurContains => width - prev_width,
            Self::Partial => (cur.0 - prev.0).abs() + (cur.1 - prev.1).abs(),
        }
    }
}

/// 计算单个控制点的孔径指标.
///
/// 激活叶片区间由铅门窗口的两条边界按
/// `index = len / 2 + floor(boundary / leaf_pitch)` 映射得到 (左闭右开).
///
/// # 错误
///
/// - 左右叶片组长度不一致;
/// - 铅门窗口不是有限值, 或映射出的激活区间为空或越界;
/// - 某个激活叶片对的右叶片位于左叶片左侧;
/// - 归一化跨度 `pos_max` 为 0.
pub fn analyze(
    jaw: JawWindow,
    banks: &LeafBanks,
    config: &MetricConfig,
) -> Result<ApertureMetrics, GeometryError> {
    let (left, right) = (banks.left(), banks.right());
    if left.len() != right.len() {
        return Err(GeometryError::BankLengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    let active = active_range(jaw, left.len(), config.leaf_pitch())?;
    ApertureImp::new(jaw, left, right, active, config).run()
}

/// 将铅门窗口映射为激活叶片区间.
pub fn active_range(
    jaw: JawWindow,
    leaves: usize,
    leaf_pitch: f64,
) -> Result<Range<usize>, GeometryError> {
    if !jaw.is_finite() {
        return Err(GeometryError::NonFiniteJaw {
            y1: jaw.y1,
            y2: jaw.y2,
        });
    }
    let (f1, f2) = ((jaw.y1 / leaf_pitch).floor(), (jaw.y2 / leaf_pitch).floor());
    // 超出叶片组的偏移都等价, 先截断以免整数溢出.
    let bound = leaves as i64 + 1;
    let half = (leaves / 2) as i64;
    let lo = half + (f1 as i64).clamp(-bound, bound);
    let hi = half + (f2 as i64).clamp(-bound, bound);
    if f1 >= f2 {
        return Err(GeometryError::EmptyActiveRange { lo, hi });
    }
    if lo < 0 || hi > leaves as i64 {
        return Err(GeometryError::ActiveRangeOutOfBounds { lo, hi, leaves });
    }
    Ok(lo as usize..hi as usize)
}

/// `analyze` 函数的实现细节.
struct ApertureImp<'a> {
    jaw: JawWindow,
    left: &'a [f64],
    right: &'a [f64],
    active: Range<usize>,
    config: &'a MetricConfig,
}

impl<'a> ApertureImp<'a> {
    #[inline]
    fn new(
        jaw: JawWindow,
        left: &'a [f64],
        right: &'a [f64],
        active: Range<usize>,
        config: &'a MetricConfig,
    ) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            jaw,
            left,
            right,
            active,
            config,
        }
    }

    fn run(&self) -> Result<ApertureMetrics, GeometryError> {
        let left = &self.left[self.active.clone()];
        let right = &self.right[self.active.clone()];

        if let Some((i, (&l, &r))) = izip!(left, right).enumerate().find(|(_, (l, r))| r < l) {
            return Err(GeometryError::InvertedAperture {
                leaf: self.active.start + i,
                left: l,
                right: r,
            });
        }

        // LSV 需要全局跨度, 必须在主循环之前确定.
        let pos_max = Self::span(left, right);
        if pos_max == 0.0 {
            return Err(GeometryError::ZeroSpan);
        }

        let apertures: Vec<f64> = izip!(left, right).map(|(l, r)| (l - r).abs()).collect();
        let n_active = apertures.len();
        let first = apertures[0];
        let last = apertures[n_active - 1];

        let perimeter_no_mlc_size = first
            + izip!(left.windows(2), right.windows(2))
                .map(|(l, r)| Overlap::contribution((l[0], r[0]), (l[1], r[1])))
                .sum::<f64>()
            + last;

        let lsv_left = Self::lsv_sum(left, pos_max);
        let lsv_right = Self::lsv_sum(right, pos_max);
        let lsv = lsv_left * lsv_right / (n_active as f64 * pos_max).powi(2);

        let sum_active: f64 = apertures.iter().sum();
        let sum_all_apertures: f64 = izip!(self.left, self.right)
            .map(|(l, r)| (r - l).abs())
            .sum();

        Ok(ApertureMetrics {
            min_aperture: apertures.iter().copied().fold(f64::INFINITY, f64::min),
            max_aperture: apertures.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            max_aperture_no_align: pos_max,
            avg_aperture: sum_active / n_active as f64,
            sum_all_apertures,
            y_diff: self.jaw.extent(),
            total_mlc: self.left.len(),
            active_mlc: n_active,
            lowest_active_mlc: self.active.start,
            highest_active_mlc: self.active.end - 1,
            perimeter: perimeter_no_mlc_size + self.jaw.extent() * 2.0,
            perimeter_no_mlc_size,
            area: sum_active * self.config.leaf_pitch(),
            lsv,
            n_apertures_open: count_where(&apertures, |a| a > 0.0),
            n_apertures_leq: self
                .config
                .thresholds()
                .map(|t| count_where(&apertures, |a| a <= t)),
        })
    }

    /// `|max(right) - min(left)|`.
    fn span(left: &[f64], right: &[f64]) -> f64 {
        let min_left = left.iter().copied().fold(f64::INFINITY, f64::min);
        let max_right = right.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (max_right - min_left).abs()
    }

    /// 单侧叶片组的 LSV 累加项. 最后一个激活叶片没有后继, 不参与累加.
    fn lsv_sum(bank: &[f64], pos_max: f64) -> f64 {
        bank.windows(2).map(|w| pos_max - (w[0] - w[1]).abs()).sum()
    }
}

#[inline]
fn count_where<F: Fn(f64) -> bool>(apertures: &[f64], pred: F) -> u32 {
    apertures.iter().filter(|&&a| pred(a)).count() as u32
}
