//! 单元测试共用的构造工具.

use crate::{Beam, ControlPoint, JawWindow, LeafBanks};

pub(crate) fn f64_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-8
}

/// `n` 对叶片, 所有左叶片位于 `left`, 所有右叶片位于 `right`.
pub(crate) fn uniform_banks(n: usize, left: f64, right: f64) -> LeafBanks {
    LeafBanks::new(vec![left; n], vec![right; n])
}

/// 40 对叶片 (5 mm), 铅门 `[-50, 50]`, 激活叶片 20..30 形成 40 x 100 的矩形野.
pub(crate) fn rect_control_point(weight: f64) -> ControlPoint {
    ControlPoint::new(
        weight,
        JawWindow::new(-50.0, 50.0),
        uniform_banks(40, -20.0, 20.0),
    )
}

/// 以 `weights` 为累积权重的矩形野射束.
pub(crate) fn rect_beam(name: &str, mu: f64, final_weight: f64, weights: &[f64]) -> Beam {
    Beam::new(
        name,
        mu,
        final_weight,
        weights.iter().map(|&w| rect_control_point(w)).collect(),
    )
    .unwrap()
}
