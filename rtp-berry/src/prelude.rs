//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{CalcError, CalcResult, GeometryError, MissingField};

pub use crate::config::MetricConfig;
pub use crate::consts::{DEFAULT_LEAF_PITCH, DEFAULT_THRESHOLDS, PLAN_KEY, SMALL_FIELD_LIMIT};
pub use crate::engine::{ComplexityEngine, PlanComplexity};

pub use crate::plan::{
    Beam, Collimator, ControlPoint, DeviceKind, JawWindow, LeafBanks, LimitingDevice, Plan,
};

pub use crate::metrics::{
    ApertureMetrics, BeamMetrics, ControlPointMetrics, ControlPointStats, PlanMetrics, Summary,
};

pub use crate::library::{LibraryMetric, LibraryReading, MetricLibrary, DEFAULT_LIBRARY_METRICS};
