//! Serde adapters for persisted float arrays.
//!
//! JSON has no literal for infinities or NaN, and a near-singular slice
//! legitimately produces them. Finite values are written as numbers, the
//! rest as the strings `"inf"`, `"-inf"` and `"nan"`.

use num_complex::Complex64;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy)]
struct Float(f64);

impl Serialize for Float {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let x = self.0;
        if x.is_finite() {
            serializer.serialize_f64(x)
        } else if x.is_nan() {
            serializer.serialize_str("nan")
        } else if x > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

struct FloatVisitor;

impl Visitor<'_> for FloatVisitor {
    type Value = Float;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, \"inf\", \"-inf\" or \"nan\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Float, E> {
        Ok(Float(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Float, E> {
        Ok(Float(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Float, E> {
        Ok(Float(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Float, E> {
        match v {
            "inf" => Ok(Float(f64::INFINITY)),
            "-inf" => Ok(Float(f64::NEG_INFINITY)),
            "nan" => Ok(Float(f64::NAN)),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for Float {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }
}

/// `#[serde(with = ...)]` for `Vec<f64>`.
pub(crate) mod reals {
    use super::Float;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&x| Float(x)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Float>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|x| x.0).collect())
    }
}

/// `#[serde(with = ...)]` for `Vec<Complex64>`, each value as `[re, im]`.
pub(crate) mod complexes {
    use super::{Complex64, Float};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Complex64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|z| (Float(z.re), Float(z.im))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Complex64>, D::Error> {
        let values = Vec::<(Float, Float)>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|(re, im)| Complex64::new(re.0, im.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Payload {
        #[serde(with = "reals")]
        values: Vec<f64>,
        #[serde(with = "complexes")]
        vectors: Vec<Complex64>,
    }

    #[test]
    fn non_finite_values_survive_json() {
        let payload = Payload {
            values: vec![1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, -0.25],
            vectors: vec![Complex64::new(f64::NAN, 2.0), Complex64::new(0.1, f64::INFINITY)],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("null"), "got: {json}");

        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], 1.5);
        assert_eq!(back.values[1], f64::INFINITY);
        assert_eq!(back.values[2], f64::NEG_INFINITY);
        assert!(back.values[3].is_nan());
        assert_eq!(back.values[4], -0.25);
        assert!(back.vectors[0].re.is_nan());
        assert_eq!(back.vectors[0].im, 2.0);
        assert_eq!(back.vectors[1], Complex64::new(0.1, f64::INFINITY));
    }

    #[test]
    fn finite_values_keep_plain_json_layout() {
        let payload = Payload {
            values: vec![0.5, 2.0],
            vectors: vec![Complex64::new(1.0, -1.0)],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"values":[0.5,2.0],"vectors":[[1.0,-1.0]]}"#);
    }

    #[test]
    fn unknown_strings_are_rejected() {
        let err = serde_json::from_str::<Payload>(r#"{"values":["big"],"vectors":[]}"#);
        assert!(err.is_err());
    }
}
