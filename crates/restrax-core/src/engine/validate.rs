//! Numeric range validation and normalization for restraint values.
use serde::Serialize;

pub const DIST_RANGE_MIN: f64 = 1.2;
pub const DIST_RANGE_MAX: f64 = 100.0;
pub const DIST_ERROR_MIN: f64 = 0.0;
pub const DIST_ERROR_MAX: f64 = 150.0;
pub const DIST_AMBIG_LOW: f64 = 2.5;
pub const DIST_AMBIG_UP: f64 = 5.5;
pub const DIST_AMBIG_MED: f64 = (DIST_AMBIG_LOW + DIST_AMBIG_UP) / 2.0;
pub const DIST_AMBIG_UNCERT: f64 = 0.01;

pub const ANGLE_RANGE_MIN: f64 = -180.0;
pub const ANGLE_RANGE_MAX: f64 = 360.0;
pub const ANGLE_ERROR_MIN: f64 = -360.0;
pub const ANGLE_ERROR_MAX: f64 = 720.0;
pub const THRESHOLD_FOR_CIRCULAR_SHIFT: f64 = 180.0;
pub const PLANE_LIKE_LIMIT: f64 = 2.5;

pub const RDC_RANGE_MIN: f64 = -100.0;
pub const RDC_RANGE_MAX: f64 = 100.0;
pub const RDC_ERROR_MIN: f64 = -200.0;
pub const RDC_ERROR_MAX: f64 = 200.0;

pub const PCS_RANGE_MIN: f64 = -20.0;
pub const PCS_RANGE_MAX: f64 = 20.0;
pub const PCS_ERROR_MIN: f64 = -40.0;
pub const PCS_ERROR_MAX: f64 = 40.0;

pub const COUP_RANGE_MIN: f64 = -50.0;
pub const COUP_RANGE_MAX: f64 = 50.0;
pub const COUP_ERROR_MIN: f64 = -100.0;
pub const COUP_ERROR_MAX: f64 = 100.0;

/// Normalized restraint value map, the engine's row payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DstFunc {
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub plane_like: bool,
}

/// Validator result: a normalized map on success, plus collected
/// diagnostics either way.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub dst: Option<DstFunc>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Dihedral bounds arrived swapped (lower > upper, both positive).
    pub unusual_order: bool,
}

fn check_weight(weight: f64, out: &mut Validation) -> f64 {
    if weight < 0.0 {
        out.errors
            .push(format!("Range value error: weight {weight} must not be negative"));
        0.0
    } else if weight == 0.0 {
        out.warnings
            .push("Range value warning: weight of zero disables the restraint".to_string());
        weight
    } else {
        weight
    }
}

/// Distance restraint validation.
///
/// Hard bounds `(DIST_ERROR_MIN, DIST_ERROR_MAX)` are errors (the value is
/// dropped when `omit_outlier`, otherwise the whole restraint fails); soft
/// bounds `[DIST_RANGE_MIN, DIST_RANGE_MAX]` only warn. A target whose two
/// bounds sit within `DIST_AMBIG_UNCERT` drops the limit on the
/// uninteresting side.
pub fn validate_distance_range(
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
    target_uncertainty: Option<f64>,
    omit_outlier: bool,
) -> Validation {
    let mut out = Validation::default();
    let weight = check_weight(weight, &mut out);

    let mut target = target_value;
    let mut lower = lower_limit;
    let mut upper = upper_limit;

    // derive bounds from an uncertainty-only row
    if let (Some(t), None, None, Some(u)) = (target, lower, upper, target_uncertainty) {
        if u > 0.0 {
            lower = Some(t - u);
            upper = Some(t + u);
        }
    }

    for (name, slot) in [
        ("target value", &mut target),
        ("lower limit", &mut lower),
        ("upper limit", &mut upper),
    ] {
        let Some(v) = *slot else { continue };
        if v <= DIST_ERROR_MIN || v >= DIST_ERROR_MAX {
            if omit_outlier {
                out.warnings.push(format!(
                    "Range value warning: the {name} {v} is omitted as an outlier"
                ));
                *slot = None;
                continue;
            }
            out.errors.push(format!(
                "Range value error: the {name} {v} must be within ({DIST_ERROR_MIN}, {DIST_ERROR_MAX})"
            ));
            return out;
        }
        if !(DIST_RANGE_MIN..=DIST_RANGE_MAX).contains(&v) {
            out.warnings.push(format!(
                "Range value warning: the {name} {v} should be within [{DIST_RANGE_MIN}, {DIST_RANGE_MAX}]"
            ));
        }
    }

    // near-degenerate bounds: keep the interesting side only
    if let (Some(t), Some(l), Some(u)) = (target, lower, upper) {
        if (t - l).abs() <= DIST_AMBIG_UNCERT && (t - u).abs() <= DIST_AMBIG_UNCERT {
            if t <= DIST_AMBIG_MED {
                upper = None;
            } else {
                lower = None;
            }
        }
    }

    if let (Some(l), Some(u)) = (lower, upper) {
        if l > u {
            out.errors.push(format!(
                "Range value error: the lower limit {l} exceeds the upper limit {u}"
            ));
            return out;
        }
    }
    if let (Some(t), Some(l), Some(u)) = (target, lower, upper) {
        if t < l || t > u {
            out.warnings.push(format!(
                "Range value warning: the target value {t} is outside its limits [{l}, {u}], target dropped"
            ));
            target = None;
        }
    }

    if target.is_none() && lower.is_none() && upper.is_none() {
        out.errors
            .push("Range value error: no distance value survived validation".to_string());
        return out;
    }
    out.dst = Some(DstFunc {
        weight,
        target_value: target,
        lower_limit: lower,
        upper_limit: upper,
        plane_like: false,
    });
    out
}

/// Dihedral-angle restraint validation with circular-shift correction and
/// plane-like detection.
pub fn validate_angle_range(
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
) -> Validation {
    let mut out = Validation::default();
    let weight = check_weight(weight, &mut out);

    let mut target = target_value;
    let mut lower = lower_limit;
    let mut upper = upper_limit;

    // all present values past the threshold shift together by 360
    loop {
        let present: Vec<f64> = [target, lower, upper].iter().flatten().copied().collect();
        if present.is_empty() {
            break;
        }
        if present.iter().all(|v| *v > THRESHOLD_FOR_CIRCULAR_SHIFT) {
            for slot in [&mut target, &mut lower, &mut upper] {
                if let Some(v) = slot.as_mut() {
                    *v -= 360.0;
                }
            }
            out.warnings.push(
                "Range value warning: angle values were shifted by -360 degrees (circular shift)"
                    .to_string(),
            );
        } else if present.iter().all(|v| *v < -THRESHOLD_FOR_CIRCULAR_SHIFT) {
            for slot in [&mut target, &mut lower, &mut upper] {
                if let Some(v) = slot.as_mut() {
                    *v += 360.0;
                }
            }
            out.warnings.push(
                "Range value warning: angle values were shifted by +360 degrees (circular shift)"
                    .to_string(),
            );
        } else {
            break;
        }
    }

    for (name, value) in [
        ("target value", target),
        ("lower limit", lower),
        ("upper limit", upper),
    ] {
        let Some(v) = value else { continue };
        if v <= ANGLE_ERROR_MIN || v >= ANGLE_ERROR_MAX {
            out.errors.push(format!(
                "Range value error: the {name} {v} must be within ({ANGLE_ERROR_MIN}, {ANGLE_ERROR_MAX})"
            ));
            return out;
        }
        if !(ANGLE_RANGE_MIN..=ANGLE_RANGE_MAX).contains(&v) {
            out.warnings.push(format!(
                "Range value warning: the {name} {v} should be within [{ANGLE_RANGE_MIN}, {ANGLE_RANGE_MAX}]"
            ));
        }
    }

    if let (Some(l), Some(u)) = (lower, upper) {
        if l > u && l > 0.0 && u > 0.0 {
            out.unusual_order = true;
        }
    }

    let plane_like = match (lower, upper) {
        (Some(l), Some(u)) if u >= l && u - l <= 2.0 * PLANE_LIKE_LIMIT => {
            // straddles 0 or +-180 within the plane-like window
            (l < 0.0 && u > 0.0)
                || (l < 180.0 && u > 180.0)
                || (l < -180.0 && u > -180.0)
        }
        _ => false,
    };

    out.dst = Some(DstFunc {
        weight,
        target_value: target,
        lower_limit: lower,
        upper_limit: upper,
        plane_like,
    });
    out
}

fn validate_scalar_range(
    kind: &str,
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
    range: (f64, f64),
    error: (f64, f64),
) -> Validation {
    let mut out = Validation::default();
    let weight = check_weight(weight, &mut out);
    for (name, value) in [
        ("target value", target_value),
        ("lower limit", lower_limit),
        ("upper limit", upper_limit),
    ] {
        let Some(v) = value else { continue };
        if v <= error.0 || v >= error.1 {
            out.errors.push(format!(
                "Range value error: the {kind} {name} {v} must be within ({}, {})",
                error.0, error.1
            ));
            return out;
        }
        if !(range.0..=range.1).contains(&v) {
            out.warnings.push(format!(
                "Range value warning: the {kind} {name} {v} should be within [{}, {}]",
                range.0, range.1
            ));
        }
    }
    if target_value.is_none() && lower_limit.is_none() && upper_limit.is_none() {
        out.errors
            .push(format!("Range value error: no {kind} value given"));
        return out;
    }
    out.dst = Some(DstFunc {
        weight,
        target_value,
        lower_limit,
        upper_limit,
        plane_like: false,
    });
    out
}

pub fn validate_rdc_range(
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
) -> Validation {
    validate_scalar_range(
        "RDC",
        weight,
        target_value,
        lower_limit,
        upper_limit,
        (RDC_RANGE_MIN, RDC_RANGE_MAX),
        (RDC_ERROR_MIN, RDC_ERROR_MAX),
    )
}

pub fn validate_pcs_range(
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
) -> Validation {
    validate_scalar_range(
        "PCS",
        weight,
        target_value,
        lower_limit,
        upper_limit,
        (PCS_RANGE_MIN, PCS_RANGE_MAX),
        (PCS_ERROR_MIN, PCS_ERROR_MAX),
    )
}

pub fn validate_coup_range(
    weight: f64,
    target_value: Option<f64>,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
) -> Validation {
    validate_scalar_range(
        "J-coupling",
        weight,
        target_value,
        lower_limit,
        upper_limit,
        (COUP_RANGE_MIN, COUP_RANGE_MAX),
        (COUP_ERROR_MIN, COUP_ERROR_MAX),
    )
}

/// Peak volumes have no physical range; only reject non-finite or zero.
pub fn validate_peak_volume_range(weight: f64, volume: Option<f64>) -> Validation {
    let mut out = Validation::default();
    let weight = check_weight(weight, &mut out);
    let Some(v) = volume else {
        out.errors
            .push("Range value error: no peak volume given".to_string());
        return out;
    };
    if !v.is_finite() {
        out.errors
            .push(format!("Range value error: the peak volume {v} is not finite"));
        return out;
    }
    if v == 0.0 {
        out.warnings
            .push("Range value warning: the peak volume is zero".to_string());
    }
    out.dst = Some(DstFunc {
        weight,
        target_value: Some(v),
        lower_limit: None,
        upper_limit: None,
        plane_like: false,
    });
    out
}
