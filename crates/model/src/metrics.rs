//! Error metrics used to score candidates.

/// Mean absolute error; `NaN` for empty input.
#[must_use]
pub fn mae(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len().min(targets.len());
    if n == 0 {
        return f64::NAN;
    }
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).abs())
        .sum();
    sum / n as f64
}

/// Mean absolute percentage error as a fraction, `mean(|p - y| / |y|)`.
#[must_use]
pub fn mape(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len().min(targets.len());
    if n == 0 {
        return f64::NAN;
    }
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y).abs() / y.abs())
        .sum();
    sum / n as f64
}

/// Serde adapter for error scores that can be infinite.
///
/// JSON has no infinity: a non-finite score is written as `null` and read
/// back as `f64::INFINITY`.
pub(crate) mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
