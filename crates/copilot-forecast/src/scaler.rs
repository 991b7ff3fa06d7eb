//! Min-max scaling onto [0, 1]

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: f64,
    pub data_max: f64,
}

impl MinMaxScaler {
    pub fn new(data_min: f64, data_max: f64) -> Self {
        Self { data_min, data_max }
    }

    /// Fit to observed values; an empty slice gives the identity on [0, 1]
    pub fn fit(values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        if min.is_finite() && max.is_finite() {
            Self::new(min, max)
        } else {
            Self::new(0.0, 1.0)
        }
    }

    fn range(&self) -> f64 {
        let range = self.data_max - self.data_min;
        if range.abs() < f64::EPSILON {
            1.0
        } else {
            range
        }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.data_min) / self.range()
    }

    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        scaled * self.range() + self.data_min
    }

    pub fn is_valid(&self) -> bool {
        self.data_min.is_finite() && self.data_max.is_finite() && self.data_max >= self.data_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_roundtrip_points() {
        let scaler = MinMaxScaler::new(2.0, 12.0);
        assert_eq!(scaler.transform(2.0), 0.0);
        assert_eq!(scaler.transform(12.0), 1.0);
        assert_eq!(scaler.inverse_transform(0.5), 7.0);
    }

    #[test]
    fn test_constant_range() {
        let scaler = MinMaxScaler::fit(&[5.0, 5.0]);
        assert_eq!(scaler.transform(5.0), 0.0);
        assert_eq!(scaler.inverse_transform(0.0), 5.0);
    }

    #[test]
    fn test_fit() {
        assert_eq!(MinMaxScaler::fit(&[3.0, 9.0, 6.0]), MinMaxScaler::new(3.0, 9.0));
        assert_eq!(MinMaxScaler::fit(&[]), MinMaxScaler::new(0.0, 1.0));
    }
}
