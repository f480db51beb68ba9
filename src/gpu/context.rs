//! Shared wgpu device for the peak kernels and the wave renderer.

use std::sync::Arc;
use wgpu::{Adapter, Device, DownlevelFlags, Instance, Limits, Queue};

/// Errors raised while acquiring a device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Adapter lacks required capabilities: {0:?}")]
    MissingCapability(DownlevelFlags),
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// The peak kernels need compute, and the vertex stage reads the state
/// buffer as storage.
pub const REQUIRED_DOWNLEVEL: DownlevelFlags =
    DownlevelFlags::COMPUTE_SHADERS.union(DownlevelFlags::VERTEX_STORAGE);

/// Device and queue shared by the peak kernels and the wave renderer.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Acquire a headless device with downlevel limits raised to the
    /// adapter's texture resolution.
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_limits(|adapter| Limits::downlevel_defaults().using_resolution(adapter.limits()))
            .await
    }

    /// Acquire a device with limits chosen from the adapter.
    ///
    /// Adapters without compute or vertex-stage storage are rejected with
    /// [`GpuError::MissingCapability`] before any device is created.
    pub async fn with_limits<F>(limits: F) -> Result<Self, GpuError>
    where
        F: FnOnce(&Adapter) -> Limits,
    {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let info = adapter.get_info();
        let missing = REQUIRED_DOWNLEVEL.difference(adapter.get_downlevel_capabilities().flags);
        if !missing.is_empty() {
            log::warn!("GPU adapter {} is missing {:?}", info.name, missing);
            return Err(GpuError::MissingCapability(missing));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("pcm-wave"),
                required_features: wgpu::Features::empty(),
                required_limits: limits(&adapter),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking variant of [`GpuContext::new`] for non-async hosts.
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_meets_required_capabilities() {
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        let flags = ctx.adapter.get_downlevel_capabilities().flags;
        assert!(flags.contains(REQUIRED_DOWNLEVEL));
        assert!(!ctx.adapter_info().name.is_empty());
    }

    #[test]
    fn test_required_flags() {
        assert!(REQUIRED_DOWNLEVEL.contains(DownlevelFlags::COMPUTE_SHADERS));
        assert!(REQUIRED_DOWNLEVEL.contains(DownlevelFlags::VERTEX_STORAGE));
        assert!(!REQUIRED_DOWNLEVEL.contains(DownlevelFlags::INDIRECT_EXECUTION));
    }
}
