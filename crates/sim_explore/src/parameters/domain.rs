use rand::Rng;
use serde::{Deserialize, Serialize};

use super::value::{Value, VariableKind};
use crate::error::{ExploreError, Result};

/// Number of intervals used to sweep a float range that declares no step.
const DEFAULT_FLOAT_INTERVALS: f64 = 10.0;

/// Admissible values of an explorable variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Integer {
        min: i64,
        max: i64,
        step: i64,
    },
    Float {
        min: f64,
        max: f64,
        step: Option<f64>,
        log_scale: bool,
    },
    Boolean,
    /// Seconds since the Unix epoch, stepped in seconds.
    Date {
        min: i64,
        max: i64,
        step: i64,
    },
    Point {
        min: [f64; 3],
        max: [f64; 3],
        step: Option<f64>,
    },
    /// Explicit enumeration of admissible values (`among`).
    Among(Vec<Value>),
    /// Unconstrained text; valid for any string but impossible to sample.
    FreeText { default: String },
}

/// Immutable description of one explorable variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    name: String,
    kind: VariableKind,
    domain: Domain,
}

impl VariableDescriptor {
    pub fn int(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, VariableKind::Integer, Domain::Integer { min, max, step: 1 })
    }

    pub fn float(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(
            name,
            VariableKind::Float,
            Domain::Float {
                min,
                max,
                step: None,
                log_scale: false,
            },
        )
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, VariableKind::Boolean, Domain::Boolean)
    }

    pub fn date(name: impl Into<String>, min_secs: i64, max_secs: i64) -> Self {
        Self::new(
            name,
            VariableKind::Date,
            Domain::Date {
                min: min_secs,
                max: max_secs,
                step: 86_400,
            },
        )
    }

    pub fn point(name: impl Into<String>, min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(
            name,
            VariableKind::Point,
            Domain::Point {
                min,
                max,
                step: None,
            },
        )
    }

    /// Enumerated variable; `kind` is the declared type of the members.
    pub fn among(name: impl Into<String>, kind: VariableKind, values: Vec<Value>) -> Self {
        Self::new(name, kind, Domain::Among(values))
    }

    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(
            name,
            VariableKind::String,
            Domain::FreeText {
                default: default.into(),
            },
        )
    }

    pub fn new(name: impl Into<String>, kind: VariableKind, domain: Domain) -> Self {
        Self {
            name: name.into(),
            kind,
            domain,
        }
    }

    /// Set the neighbour/sweep step. Ignored for booleans and enumerations.
    pub fn step(mut self, step: f64) -> Self {
        match &mut self.domain {
            Domain::Integer { step: s, .. } | Domain::Date { step: s, .. } => {
                *s = step.round() as i64;
            }
            Domain::Float { step: s, .. } | Domain::Point { step: s, .. } => *s = Some(step),
            Domain::Boolean | Domain::Among(_) | Domain::FreeText { .. } => {}
        }
        self
    }

    /// Sample float values log-uniformly. Requires a strictly positive range.
    pub fn log_scale(mut self) -> Self {
        if let Domain::Float { log_scale, .. } = &mut self.domain {
            *log_scale = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub(crate) fn validate_domain(&self) -> Result<()> {
        let fail = |reason: String| Err(ExploreError::invalid_domain(&self.name, reason));
        let expected_kind = match &self.domain {
            Domain::Integer { .. } => Some(VariableKind::Integer),
            Domain::Float { .. } => Some(VariableKind::Float),
            Domain::Boolean => Some(VariableKind::Boolean),
            Domain::Date { .. } => Some(VariableKind::Date),
            Domain::Point { .. } => Some(VariableKind::Point),
            Domain::FreeText { .. } => Some(VariableKind::String),
            Domain::Among(_) => None,
        };
        if let Some(expected) = expected_kind {
            if expected != self.kind {
                return fail(format!("{expected} domain declared for kind {}", self.kind));
            }
        }
        match &self.domain {
            Domain::Integer { min, max, step } | Domain::Date { min, max, step } => {
                if min > max {
                    return fail(format!("min {min} is greater than max {max}"));
                }
                if *step <= 0 {
                    return fail(format!("step must be positive, got {step}"));
                }
                if max.checked_sub(*min).is_none() {
                    return fail(format!("range {min}..={max} is wider than i64"));
                }
            }
            Domain::Float {
                min,
                max,
                step,
                log_scale,
            } => {
                if !min.is_finite() || !max.is_finite() {
                    return fail("bounds must be finite".to_string());
                }
                if min > max {
                    return fail(format!("min {min} is greater than max {max}"));
                }
                if let Some(step) = step {
                    if *step <= 0.0 {
                        return fail(format!("step must be positive, got {step}"));
                    }
                }
                if *log_scale && *min <= 0.0 {
                    return fail("log scale requires a strictly positive minimum".to_string());
                }
            }
            Domain::Point { min, max, step } => {
                if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
                    return fail("point min is greater than max on some axis".to_string());
                }
                if matches!(step, Some(s) if *s <= 0.0) {
                    return fail("step must be positive".to_string());
                }
            }
            Domain::Among(values) => {
                if values.is_empty() {
                    return fail("enumeration is empty".to_string());
                }
                if let Some(bad) = values.iter().find(|v| v.kind() != self.kind) {
                    return fail(format!("member {bad} is not of kind {}", self.kind));
                }
            }
            Domain::Boolean | Domain::FreeText { .. } => {}
        }
        Ok(())
    }

    /// Whether `value` is admissible for this variable.
    pub fn contains(&self, value: &Value) -> bool {
        match (&self.domain, value) {
            (Domain::Integer { min, max, .. }, Value::Int(v)) => v >= min && v <= max,
            (Domain::Date { min, max, .. }, Value::Date(v)) => v >= min && v <= max,
            (Domain::Float { min, max, .. }, Value::Float(v)) => {
                v.is_finite() && *v >= *min && *v <= *max
            }
            (Domain::Boolean, Value::Bool(_)) => true,
            (Domain::Point { min, max, .. }, Value::Point(p)) => p
                .iter()
                .zip(min.iter().zip(max.iter()))
                .all(|(c, (lo, hi))| c >= lo && c <= hi),
            (Domain::Among(values), v) => values.contains(v),
            (Domain::FreeText { .. }, Value::Text(_)) => true,
            _ => false,
        }
    }

    /// Default value used when no initial solution is given: the lower bound
    /// or first member.
    pub fn default_value(&self) -> Value {
        match &self.domain {
            Domain::Integer { min, .. } => Value::Int(*min),
            Domain::Date { min, .. } => Value::Date(*min),
            Domain::Float { min, .. } => Value::float(*min),
            Domain::Boolean => Value::Bool(false),
            Domain::Point { min, .. } => Value::point(min[0], min[1], min[2]),
            Domain::Among(values) => values[0].clone(),
            Domain::FreeText { default } => Value::Text(default.clone()),
        }
    }

    fn float_step(&self, min: f64, max: f64, step: Option<f64>) -> f64 {
        step.unwrap_or((max - min) / DEFAULT_FLOAT_INTERVALS)
    }

    /// Values substituted for `current` by single-variable neighbourhoods.
    ///
    /// The set may contain `current` itself (clamped moves, enumeration
    /// members); callers drop substitutions that reproduce the original point.
    pub fn neighbor_values(&self, current: &Value) -> Vec<Value> {
        match (&self.domain, current) {
            (Domain::Integer { min, max, step }, Value::Int(v)) => vec![
                Value::Int(v.saturating_sub(*step).clamp(*min, *max)),
                Value::Int(v.saturating_add(*step).clamp(*min, *max)),
            ],
            (Domain::Date { min, max, step }, Value::Date(v)) => vec![
                Value::Date(v.saturating_sub(*step).clamp(*min, *max)),
                Value::Date(v.saturating_add(*step).clamp(*min, *max)),
            ],
            (Domain::Float { min, max, step, .. }, Value::Float(v)) => {
                let step = self.float_step(*min, *max, *step);
                vec![
                    Value::float((v - step).clamp(*min, *max)),
                    Value::float((v + step).clamp(*min, *max)),
                ]
            }
            (Domain::Point { min, max, step }, Value::Point(p)) => {
                let shifted = |sign: f64| {
                    let mut out = [0.0; 3];
                    for axis in 0..3 {
                        let axis_step =
                            step.unwrap_or((max[axis] - min[axis]) / DEFAULT_FLOAT_INTERVALS);
                        out[axis] = (p[axis] + sign * axis_step).clamp(min[axis], max[axis]);
                    }
                    Value::point(out[0], out[1], out[2])
                };
                vec![shifted(-1.0), shifted(1.0)]
            }
            (Domain::Boolean, Value::Bool(_)) => vec![Value::Bool(false), Value::Bool(true)],
            (Domain::Among(values), _) => values.clone(),
            _ => Vec::new(),
        }
    }

    /// Every value visited by an exhaustive sweep, in ascending order.
    pub fn grid_values(&self) -> Result<Vec<Value>> {
        let values = match &self.domain {
            Domain::Integer { min, max, step } => (*min..=*max)
                .step_by(*step as usize)
                .map(Value::Int)
                .collect(),
            Domain::Date { min, max, step } => (*min..=*max)
                .step_by(*step as usize)
                .map(Value::Date)
                .collect(),
            Domain::Float { min, max, step, .. } => {
                let step = self.float_step(*min, *max, *step);
                if step <= 0.0 {
                    vec![Value::float(*min)]
                } else {
                    let count = ((max - min) / step + 1e-9).floor() as usize;
                    (0..=count)
                        .map(|i| Value::float((min + step * i as f64).min(*max)))
                        .collect()
                }
            }
            Domain::Point { min, max, step } => {
                let intervals = match step {
                    Some(step) => {
                        let span = (0..3).map(|a| max[a] - min[a]).fold(0.0, f64::max);
                        (span / step).floor().max(0.0) as usize
                    }
                    None => DEFAULT_FLOAT_INTERVALS as usize,
                };
                (0..=intervals)
                    .map(|i| {
                        let u = if intervals == 0 {
                            0.0
                        } else {
                            i as f64 / intervals as f64
                        };
                        self.from_unit(u)
                    })
                    .collect()
            }
            Domain::Boolean => vec![Value::Bool(false), Value::Bool(true)],
            Domain::Among(values) => values.clone(),
            Domain::FreeText { .. } => return Err(self.unsupported()),
        };
        Ok(values)
    }

    /// Map a unit coordinate `u` in `[0, 1]` onto the domain.
    ///
    /// Integer and date values are snapped to the step grid; enumerations and
    /// booleans are split into equal-width classes.
    pub fn from_unit(&self, u: f64) -> Value {
        let u = u.clamp(0.0, 1.0);
        match &self.domain {
            Domain::Integer { min, max, step } => {
                Value::Int(snap_to_grid(*min, *max, *step, u))
            }
            Domain::Date { min, max, step } => Value::Date(snap_to_grid(*min, *max, *step, u)),
            Domain::Float {
                min,
                max,
                log_scale,
                ..
            } => {
                if *log_scale {
                    let (lo, hi) = (min.ln(), max.ln());
                    Value::float((lo + u * (hi - lo)).exp().clamp(*min, *max))
                } else {
                    Value::float(min + u * (max - min))
                }
            }
            Domain::Boolean => Value::Bool(u >= 0.5),
            Domain::Point { min, max, .. } => Value::point(
                min[0] + u * (max[0] - min[0]),
                min[1] + u * (max[1] - min[1]),
                min[2] + u * (max[2] - min[2]),
            ),
            Domain::Among(values) => {
                let index = ((u * values.len() as f64).floor() as usize).min(values.len() - 1);
                values[index].clone()
            }
            Domain::FreeText { default } => Value::Text(default.clone()),
        }
    }

    /// Inverse of [`from_unit`](Self::from_unit) for scalar domains.
    pub fn to_unit(&self, value: &Value) -> Option<f64> {
        let ratio = |v: f64, lo: f64, hi: f64| {
            if hi > lo {
                ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };
        match (&self.domain, value) {
            (Domain::Integer { min, max, .. }, Value::Int(v))
            | (Domain::Date { min, max, .. }, Value::Date(v)) => {
                Some(ratio(*v as f64, *min as f64, *max as f64))
            }
            (
                Domain::Float {
                    min,
                    max,
                    log_scale,
                    ..
                },
                Value::Float(v),
            ) => {
                if *log_scale {
                    Some(ratio(v.ln(), min.ln(), max.ln()))
                } else {
                    Some(ratio(*v, *min, *max))
                }
            }
            (Domain::Boolean, Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
            (Domain::Among(values), v) => {
                let index = values.iter().position(|m| m == v)?;
                if values.len() == 1 {
                    Some(0.0)
                } else {
                    Some(index as f64 / (values.len() - 1) as f64)
                }
            }
            _ => None,
        }
    }

    /// Whether the variable carries a continuous scalar that velocity-based
    /// strategies can move.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.domain,
            Domain::Integer { .. } | Domain::Float { .. } | Domain::Date { .. }
        )
    }

    /// Bounds of a numeric domain as floats.
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        match &self.domain {
            Domain::Integer { min, max, .. } | Domain::Date { min, max, .. } => {
                Some((*min as f64, *max as f64))
            }
            Domain::Float { min, max, .. } => Some((*min, *max)),
            _ => None,
        }
    }

    /// Clamp a raw scalar into a numeric domain, snapping integers to the step grid.
    pub fn clamp_numeric(&self, raw: f64) -> Option<Value> {
        match &self.domain {
            Domain::Integer { min, max, step } => {
                Some(Value::Int(snap_value(*min, *max, *step, raw)))
            }
            Domain::Date { min, max, step } => Some(Value::Date(snap_value(*min, *max, *step, raw))),
            Domain::Float { min, max, .. } => Some(Value::float(raw.clamp(*min, *max))),
            _ => None,
        }
    }

    /// Draw a value uniformly (log-uniformly for log-scale floats).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        let value = match &self.domain {
            Domain::Integer { min, max, step } => {
                Value::Int(min + rng.gen_range(0..=(max - min) / step) * step)
            }
            Domain::Date { min, max, step } => {
                Value::Date(min + rng.gen_range(0..=(max - min) / step) * step)
            }
            Domain::Boolean => Value::Bool(rng.gen_bool(0.5)),
            Domain::Among(values) => values[rng.gen_range(0..values.len())].clone(),
            Domain::Float { .. } | Domain::Point { .. } => self.from_unit(rng.gen::<f64>()),
            Domain::FreeText { .. } => return Err(self.unsupported()),
        };
        Ok(value)
    }

    /// Whether structured samplers can place this variable on the unit interval.
    pub fn is_samplable(&self) -> bool {
        !matches!(self.domain, Domain::FreeText { .. })
    }

    pub(crate) fn unsupported(&self) -> ExploreError {
        ExploreError::UnsupportedVariableKind {
            variable: self.name.clone(),
            kind: self.kind.to_string(),
        }
    }
}

fn snap_to_grid(min: i64, max: i64, step: i64, u: f64) -> i64 {
    let slots = (max - min) / step;
    let slot = (u * (slots as f64 + 1.0)).floor() as i64;
    min + slot.clamp(0, slots) * step
}

fn snap_value(min: i64, max: i64, step: i64, raw: f64) -> i64 {
    let slots = (max - min) / step;
    let slot = ((raw - min as f64) / step as f64).round() as i64;
    min + slot.clamp(0, slots) * step
}
