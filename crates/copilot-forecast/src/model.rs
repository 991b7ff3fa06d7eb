//! Recurrent forecasting network
//!
//! Weights come from a JSON artifact exported from a trained stacked LSTM.
//! LSTM gates follow the Keras layout: the kernel columns are the input,
//! forget, cell and output gates, each `units` wide.

use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ForecastError;
use crate::scaler::MinMaxScaler;

pub const DEFAULT_SEQUENCE_LENGTH: usize = 24;

fn default_sequence_length() -> usize {
    DEFAULT_SEQUENCE_LENGTH
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerSpec {
    Lstm {
        units: usize,
        kernel: Vec<Vec<f64>>,
        recurrent_kernel: Vec<Vec<f64>>,
        bias: Vec<f64>,
        #[serde(default)]
        return_sequences: bool,
    },
    Dense {
        kernel: Vec<Vec<f64>>,
        bias: Vec<f64>,
        #[serde(default)]
        activation: Activation,
    },
    /// Training-only; identity at inference
    Dropout {
        #[serde(default)]
        rate: f64,
    },
}

/// Serialized model: network weights plus the scaler fitted during training
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,
    pub scaler: MinMaxScaler,
    pub layers: Vec<LayerSpec>,
}

impl ModelArtifact {
    pub fn from_path(path: &Path) -> Result<Self, ForecastError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn matrix(rows: &[Vec<f64>], shape: (usize, usize), name: &str) -> Result<Array2<f64>, ForecastError> {
    if rows.len() != shape.0 || rows.iter().any(|r| r.len() != shape.1) {
        return Err(ForecastError::InvalidModel(format!(
            "{name} must be {}x{}",
            shape.0, shape.1
        )));
    }
    Ok(Array2::from_shape_vec(shape, rows.concat())?)
}

fn vector(values: &[f64], len: usize, name: &str) -> Result<Array1<f64>, ForecastError> {
    if values.len() != len {
        return Err(ForecastError::InvalidModel(format!("{name} must have {len} values, got {}", values.len())));
    }
    Ok(Array1::from(values.to_vec()))
}

struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent: Array2<f64>,
    bias: Array1<f64>,
    return_sequences: bool,
}

impl LstmLayer {
    fn forward(&self, inputs: &Array2<f64>) -> Array2<f64> {
        let u = self.units;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut outputs = Array2::<f64>::zeros((inputs.nrows(), u));

        for (t, x) in inputs.outer_iter().enumerate() {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
            let i = z.slice(s![0..u]).mapv(sigmoid);
            let f = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o = z.slice(s![3 * u..4 * u]).mapv(sigmoid);
            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
            outputs.row_mut(t).assign(&h);
        }

        if self.return_sequences {
            outputs
        } else {
            h.insert_axis(Axis(0))
        }
    }
}

struct DenseLayer {
    kernel: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, inputs: &Array2<f64>) -> Array2<f64> {
        let activation = self.activation;
        (inputs.dot(&self.kernel) + &self.bias).mapv(|x| activation.apply(x))
    }
}

enum Layer {
    Lstm(LstmLayer),
    Dense(DenseLayer),
}

/// Univariate sequence-to-one network
pub struct SequenceModel {
    sequence_length: usize,
    layers: Vec<Layer>,
}

impl SequenceModel {
    /// Check every weight shape against the layer chain and build the network
    pub fn from_specs(sequence_length: usize, specs: &[LayerSpec]) -> Result<Self, ForecastError> {
        if sequence_length == 0 {
            return Err(ForecastError::InvalidModel("sequence_length must be positive".into()));
        }
        let mut width = 1;
        let mut layers = Vec::with_capacity(specs.len());

        for (n, spec) in specs.iter().enumerate() {
            match spec {
                LayerSpec::Lstm { units, kernel, recurrent_kernel, bias, return_sequences } => {
                    let units = *units;
                    if units == 0 {
                        return Err(ForecastError::InvalidModel(format!("layer {n}: lstm units must be positive")));
                    }
                    layers.push(Layer::Lstm(LstmLayer {
                        units,
                        kernel: matrix(kernel, (width, 4 * units), &format!("layer {n} kernel"))?,
                        recurrent: matrix(recurrent_kernel, (units, 4 * units), &format!("layer {n} recurrent_kernel"))?,
                        bias: vector(bias, 4 * units, &format!("layer {n} bias"))?,
                        return_sequences: *return_sequences,
                    }));
                    width = units;
                }
                LayerSpec::Dense { kernel, bias, activation } => {
                    let out = bias.len();
                    if out == 0 {
                        return Err(ForecastError::InvalidModel(format!("layer {n}: dense layer has no outputs")));
                    }
                    layers.push(Layer::Dense(DenseLayer {
                        kernel: matrix(kernel, (width, out), &format!("layer {n} kernel"))?,
                        bias: vector(bias, out, &format!("layer {n} bias"))?,
                        activation: *activation,
                    }));
                    width = out;
                }
                LayerSpec::Dropout { .. } => {}
            }
        }

        if layers.is_empty() {
            return Err(ForecastError::InvalidModel("model has no layers".into()));
        }
        if width != 1 {
            return Err(ForecastError::InvalidModel(format!("model must produce one output, got {width}")));
        }
        Ok(Self { sequence_length, layers })
    }

    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, ForecastError> {
        Self::from_specs(artifact.sequence_length, &artifact.layers)
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Scaled value following `window` (oldest first)
    pub fn predict(&self, window: &[f64]) -> f64 {
        let mut state = Array2::from_shape_fn((window.len(), 1), |(i, _)| window[i]);
        for layer in &self.layers {
            state = match layer {
                Layer::Lstm(lstm) => lstm.forward(&state),
                Layer::Dense(dense) => dense.forward(&state),
            };
        }
        state.outer_iter().last().map(|row| row[0]).unwrap_or(0.0)
    }

    pub fn summary(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Lstm(l) if l.return_sequences => format!("lstm({}, return_sequences)", l.units),
                Layer::Lstm(l) => format!("lstm({})", l.units),
                Layer::Dense(d) => format!("dense({}, {:?})", d.bias.len(), d.activation).to_lowercase(),
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Single-unit LSTM feeding a linear dense layer
    pub(crate) fn tiny_lstm(lstm_bias: [f64; 4], dense_weight: f64, dense_bias: f64) -> Vec<LayerSpec> {
        vec![
            LayerSpec::Lstm {
                units: 1,
                kernel: vec![vec![0.0; 4]],
                recurrent_kernel: vec![vec![0.0; 4]],
                bias: lstm_bias.to_vec(),
                return_sequences: false,
            },
            LayerSpec::Dropout { rate: 0.2 },
            LayerSpec::Dense { kernel: vec![vec![dense_weight]], bias: vec![dense_bias], activation: Activation::Linear },
        ]
    }

    #[test]
    fn test_lstm_matches_hand_computation() {
        let model = SequenceModel::from_specs(2, &tiny_lstm([0.0, 0.0, 1.0, 0.0], 1.0, 0.0)).unwrap();
        // zero kernels: i = f = o = sigmoid(0) = 0.5, candidate = tanh(1)
        let g = 1.0f64.tanh();
        let c1 = 0.5 * g;
        let c2 = 0.5 * c1 + 0.5 * g;
        let expected = 0.5 * c2.tanh();
        assert!((model.predict(&[0.3, 0.7]) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_input_weights_flow_through() {
        let specs = vec![
            LayerSpec::Lstm {
                units: 1,
                kernel: vec![vec![0.0, 0.0, 2.0, 0.0]],
                recurrent_kernel: vec![vec![0.0; 4]],
                bias: vec![0.0; 4],
                return_sequences: true,
            },
            LayerSpec::Dense { kernel: vec![vec![1.0]], bias: vec![0.0], activation: Activation::Relu },
        ];
        let model = SequenceModel::from_specs(1, &specs).unwrap();
        let c = 0.5 * (2.0f64 * 0.5).tanh();
        assert!((model.predict(&[0.5]) - 0.5 * c.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_dense_bias_only() {
        let model = SequenceModel::from_specs(24, &tiny_lstm([0.0; 4], 0.0, 0.4)).unwrap();
        assert!((model.predict(&[1.0; 24]) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_shape_validation() {
        let mut specs = tiny_lstm([0.0; 4], 1.0, 0.0);
        specs[0] = LayerSpec::Lstm {
            units: 2,
            kernel: vec![vec![0.0; 4]],
            recurrent_kernel: vec![vec![0.0; 8]; 2],
            bias: vec![0.0; 8],
            return_sequences: false,
        };
        assert!(matches!(SequenceModel::from_specs(24, &specs), Err(ForecastError::InvalidModel(_))));

        let wide = vec![LayerSpec::Dense { kernel: vec![vec![1.0, 1.0]], bias: vec![0.0, 0.0], activation: Activation::Linear }];
        assert!(SequenceModel::from_specs(24, &wide).is_err());
        assert!(SequenceModel::from_specs(24, &[]).is_err());
        assert!(SequenceModel::from_specs(0, &tiny_lstm([0.0; 4], 1.0, 0.0)).is_err());
    }

    #[test]
    fn test_artifact_json() {
        let raw = r#"{
            "scaler": {"data_min": 0.0, "data_max": 10.0},
            "layers": [
                {"type": "lstm", "units": 1, "kernel": [[0,0,0,0]], "recurrent_kernel": [[0,0,0,0]], "bias": [0,0,0,0]},
                {"type": "dropout", "rate": 0.2},
                {"type": "dense", "kernel": [[1]], "bias": [0.5], "activation": "relu"}
            ]
        }"#;
        let artifact: ModelArtifact = serde_json::from_str(raw).unwrap();
        assert_eq!(artifact.sequence_length, DEFAULT_SEQUENCE_LENGTH);
        let model = SequenceModel::from_artifact(&artifact).unwrap();
        assert_eq!(model.summary(), vec!["lstm(1)".to_string(), "dense(1, relu)".to_string()]);
    }
}
