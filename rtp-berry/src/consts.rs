//! 通用常量.

/// 默认叶片宽度 (单位: 毫米).
pub const DEFAULT_LEAF_PITCH: f64 = 5.0;

/// 默认孔径大小门限 (单位: 毫米). 用于统计 "孔径不超过 k" 的叶片对个数.
pub const DEFAULT_THRESHOLDS: [f64; 4] = [2.0, 5.0, 10.0, 20.0];

/// 嵌套输出中计划级指标的键. 射束不能以此命名.
pub const PLAN_KEY: &str = "plan";

/// 小野判定界限 (1 cm). 平均孔径或 Y 方向窗口不超过该值的控制点被视为小野.
pub const SMALL_FIELD_LIMIT: f64 = 10.0;
