use crate::shared::device::Device;

/// ONNX execution providers for the requested device.
///
/// `Device::Cpu` registers nothing, leaving ONNX Runtime on its default CPU
/// provider. `Device::Gpu` asks for the platform accelerator; ONNX Runtime
/// falls back to CPU if it cannot be initialised.
pub fn execution_providers(device: Device) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match device {
        Device::Cpu => vec![],
        Device::Gpu => gpu_providers(),
    }
}

fn gpu_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::warn!("No GPU execution provider is built for this platform, running on CPU");
        vec![]
    }
}
