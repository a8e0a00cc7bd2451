//! Execution backends which can run an ONNX model.
//!
//! The candidate runs models with ONNX Runtime's DirectML execution provider
//! and is only compiled in with the `directml` feature. With that feature the
//! baseline is ONNX Runtime's CPU provider, so that both sides of a comparison
//! share the same runtime and differ only in the execution provider. Without
//! it the baseline is [`RtenBackend`].

use std::path::Path;

use rten::{Dimension, Model};
use rten_tensor::Tensor;
use rten_tensor::prelude::*;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "directml")]
mod onnxruntime;

/// Errors that occur when loading or running a model.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{backend}: failed to load model: {message}")]
    Load {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: model has no inputs")]
    NoInputs { backend: &'static str },

    #[error("{backend}: inference failed: {message}")]
    Run {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: output {index} is not a float tensor")]
    UnsupportedOutput { backend: &'static str, index: usize },
}

/// A named model input.
#[derive(Clone, Debug)]
pub struct InputTensor {
    pub name: String,
    pub data: Tensor<f32>,
}

/// Declared name and shape of a model input.
#[derive(Clone, Debug, PartialEq)]
pub struct InputInfo {
    pub name: String,

    /// Size of each dimension, or `None` if it is symbolic or unknown.
    pub dims: Vec<Option<usize>>,
}

/// An execution backend with a loaded model.
pub trait Backend {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Run the model with a single input and return all model outputs, in
    /// the order the model declares them.
    fn run(&mut self, input: &InputTensor) -> Result<Vec<Tensor<f32>>, BackendError>;
}

/// Backend which runs models using the rten CPU runtime.
pub struct RtenBackend {
    model: Model,
}

impl RtenBackend {
    const NAME: &'static str = "rten";

    pub fn load<P: AsRef<Path>>(path: P) -> Result<RtenBackend, BackendError> {
        let model = Model::load_file(path).map_err(|err| BackendError::Load {
            backend: Self::NAME,
            message: err.to_string(),
        })?;
        debug!(
            inputs = model.input_ids().len(),
            outputs = model.output_ids().len(),
            "loaded model with rten"
        );
        Ok(RtenBackend { model })
    }

    /// Return the name and declared shape of the model's first input.
    pub fn first_input(&self) -> Result<InputInfo, BackendError> {
        let no_inputs = || BackendError::NoInputs {
            backend: Self::NAME,
        };
        let &id = self.model.input_ids().first().ok_or_else(no_inputs)?;
        let info = self.model.node_info(id).ok_or_else(no_inputs)?;

        let dims = info
            .shape()
            .map(|shape| {
                shape
                    .iter()
                    .map(|dim| match dim {
                        Dimension::Fixed(size) => Some(*size),
                        Dimension::Symbolic(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(InputInfo {
            name: info.name().unwrap_or_default().to_string(),
            dims,
        })
    }
}

impl Backend for RtenBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&mut self, input: &InputTensor) -> Result<Vec<Tensor<f32>>, BackendError> {
        let run_error = |message: String| BackendError::Run {
            backend: Self::NAME,
            message,
        };

        let id = self
            .model
            .find_node(&input.name)
            .ok_or_else(|| run_error(format!("input \"{}\" not found", input.name)))?;
        let outputs = self
            .model
            .run(
                vec![(id, input.data.view().into())],
                self.model.output_ids(),
                None,
            )
            .map_err(|err| run_error(err.to_string()))?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for (index, output) in outputs.into_iter().enumerate() {
            let tensor: Tensor<f32> =
                output
                    .try_into()
                    .map_err(|_| BackendError::UnsupportedOutput {
                        backend: Self::NAME,
                        index,
                    })?;
            tensors.push(tensor);
        }
        Ok(tensors)
    }
}

/// Load the model into the baseline backend.
///
/// `rten` is the model already loaded with rten. It is returned as the
/// baseline unless ONNX Runtime is compiled in.
#[cfg(feature = "directml")]
pub fn load_baseline(path: &Path, rten: RtenBackend) -> Result<Box<dyn Backend>, BackendError> {
    drop(rten);
    let backend = onnxruntime::OrtBackend::load_cpu(path)?;
    Ok(Box::new(backend))
}

/// Load the model into the baseline backend.
///
/// `rten` is the model already loaded with rten. It is returned as the
/// baseline unless ONNX Runtime is compiled in.
#[cfg(not(feature = "directml"))]
pub fn load_baseline(_path: &Path, rten: RtenBackend) -> Result<Box<dyn Backend>, BackendError> {
    Ok(Box::new(rten))
}

/// Load the model into the candidate backend.
///
/// Returns `None` if the candidate is not compiled in or not supported on
/// this system.
#[cfg(feature = "directml")]
pub fn load_candidate(path: &Path) -> Result<Option<Box<dyn Backend>>, BackendError> {
    let backend = onnxruntime::OrtBackend::load_directml(path)?;
    Ok(backend.map(|b| Box::new(b) as Box<dyn Backend>))
}

/// Load the model into the candidate backend.
///
/// Returns `None` if the candidate is not compiled in or not supported on
/// this system.
#[cfg(not(feature = "directml"))]
pub fn load_candidate(_path: &Path) -> Result<Option<Box<dyn Backend>>, BackendError> {
    debug!("DirectML backend not enabled. Rebuild with `--features directml`.");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use einsum_lower::Node;
    use einsum_lower::builder::{ModelBuilder, tensor_info};
    use rten_tensor::prelude::*;

    use super::{Backend, InputTensor, RtenBackend};
    use crate::compare::random_normal;
    use crate::input_shape::resolve_input_shape;

    /// Model file in the temp dir which is removed when dropped.
    struct TempModel {
        path: PathBuf,
    }

    impl TempModel {
        fn write(label: &str, data: &[u8]) -> TempModel {
            let path = std::env::temp_dir().join(format!(
                "einsum-lower-cli-{}-{}.onnx",
                std::process::id(),
                label
            ));
            std::fs::write(&path, data).unwrap();
            TempModel { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TempModel {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    /// A `Relu` model whose input has symbolic batch and spatial dims.
    fn dynamic_relu_model() -> Vec<u8> {
        let dims = [None, Some(3), None, None];
        ModelBuilder::new()
            .input(tensor_info("x", &dims))
            .output(tensor_info("y", &dims))
            .node(
                Node::new("Relu")
                    .with_name("relu")
                    .with_input("x")
                    .with_output("y"),
            )
            .build()
    }

    #[test]
    fn test_rten_backend_dynamic_input() {
        let model = TempModel::write("dynamic-relu", &dynamic_relu_model());
        let mut backend = RtenBackend::load(model.path()).unwrap();

        let info = backend.first_input().unwrap();
        assert_eq!(info.name, "x");
        assert_eq!(info.dims, [None, Some(3), None, None]);

        let shape = resolve_input_shape(&info.dims, 64);
        assert_eq!(shape, [1, 3, 64, 64]);

        let mut rng = fastrand::Rng::with_seed(1234);
        let input = InputTensor {
            name: info.name,
            data: random_normal(&mut rng, &shape),
        };
        let outputs = backend.run(&input).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape(), [1, 3, 64, 64]);
        assert!(outputs[0].iter().all(|&x| x >= 0.));
    }

    #[test]
    fn test_rten_backend_missing_file() {
        let err = RtenBackend::load("missing-model.onnx").err().unwrap();
        assert!(err.to_string().starts_with("rten: failed to load model"));
    }

    #[cfg(not(feature = "directml"))]
    #[test]
    fn test_candidate_disabled() {
        let backend = super::load_candidate(Path::new("missing.onnx")).unwrap();
        assert!(backend.is_none());
    }

    #[cfg(not(feature = "directml"))]
    #[test]
    fn test_baseline_is_rten_without_onnxruntime() {
        let model = TempModel::write("baseline-relu", &dynamic_relu_model());
        let rten = RtenBackend::load(model.path()).unwrap();
        let baseline = super::load_baseline(model.path(), rten).unwrap();
        assert_eq!(baseline.name(), "rten");
    }
}
