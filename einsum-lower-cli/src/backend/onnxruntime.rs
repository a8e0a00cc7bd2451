use std::fmt::Display;
use std::path::Path;

use ort::execution_providers::{
    CPUExecutionProvider, DirectMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::Session;
use ort::value::TensorRef;
use rten_tensor::Tensor;
use rten_tensor::prelude::*;
use tracing::{debug, warn};

use super::{Backend, BackendError, InputTensor};

/// Backend which runs models using ONNX Runtime.
///
/// The session is created with an ordered list of execution providers.
/// Operators which the first provider can't run fall back to the next one,
/// ending with ONNX Runtime's CPU provider.
pub struct OrtBackend {
    name: &'static str,
    session: Session,
}

impl OrtBackend {
    /// Create a session which only uses the CPU provider.
    pub fn load_cpu(path: &Path) -> Result<OrtBackend, BackendError> {
        Self::load_with_providers("ort-cpu", path, Vec::new())
    }

    /// Create a session which uses the DirectML provider, with the CPU
    /// provider for operators DirectML can't run.
    ///
    /// Returns `None` if the DirectML provider is not available.
    pub fn load_directml(path: &Path) -> Result<Option<OrtBackend>, BackendError> {
        let provider = DirectMLExecutionProvider::default();
        match provider.is_available() {
            Ok(true) => {}
            Ok(false) => {
                warn!("DirectML execution provider is not available");
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "failed to query DirectML execution provider");
                return Ok(None);
            }
        }

        let providers = vec![provider.build().error_on_failure()];
        Self::load_with_providers("directml", path, providers).map(Some)
    }

    fn load_with_providers(
        name: &'static str,
        path: &Path,
        mut providers: Vec<ExecutionProviderDispatch>,
    ) -> Result<OrtBackend, BackendError> {
        let load_error = |err: &dyn Display| BackendError::Load {
            backend: name,
            message: err.to_string(),
        };
        providers.push(CPUExecutionProvider::default().build());

        let session = Session::builder()
            .map_err(|err| load_error(&err))?
            .with_execution_providers(providers)
            .map_err(|err| load_error(&err))?
            .commit_from_file(path)
            .map_err(|err| load_error(&err))?;
        debug!(
            backend = name,
            inputs = session.inputs.len(),
            outputs = session.outputs.len(),
            "created ONNX Runtime session"
        );

        Ok(OrtBackend { name, session })
    }
}

impl Backend for OrtBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&mut self, input: &InputTensor) -> Result<Vec<Tensor<f32>>, BackendError> {
        let name = self.name;
        let run_error = |err: &dyn Display| BackendError::Run {
            backend: name,
            message: err.to_string(),
        };

        let shape: Vec<i64> = input.data.shape().iter().map(|&size| size as i64).collect();
        let data = input.data.to_vec();
        let value = TensorRef::from_array_view((shape, data.as_slice()))
            .map_err(|err| run_error(&err))?;

        let outputs = self
            .session
            .run(ort::inputs![input.name.as_str() => value])
            .map_err(|err| run_error(&err))?;

        let mut tensors = Vec::with_capacity(outputs.len());
        for index in 0..outputs.len() {
            let (shape, data) = outputs[index]
                .try_extract_tensor::<f32>()
                .map_err(|_| BackendError::UnsupportedOutput {
                    backend: name,
                    index,
                })?;
            let shape: Vec<usize> = shape.iter().map(|&size| size as usize).collect();
            tensors.push(Tensor::from_data(&shape, data.to_vec()));
        }
        Ok(tensors)
    }
}
