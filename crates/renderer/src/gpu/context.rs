use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

/// Owns the wgpu instance, device, and (for windowed runs) the surface.
///
/// Headless contexts skip the surface entirely; the compute pipeline renders
/// into a storage texture either way, so everything downstream of the device
/// is shared between the two modes.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: Option<wgpu::SurfaceConfiguration>,
    pub size: PhysicalSize<u32>,
    pub limits: wgpu::Limits,
}

impl GpuContext {
    /// Creates a context bound to a window surface.
    pub(crate) fn new<T>(target: &T, initial_size: PhysicalSize<u32>) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = new_instance();

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = request_adapter(&instance, Some(&surface))?;
        let (device, queue, limits) = request_device(&adapter)?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        validate_surface_size(&limits, size)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                let fallback = surface_caps.formats[0];
                tracing::warn!(?fallback, "no linear surface format available");
                fallback
            });

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or_else(|| surface_caps.present_modes[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface: Some(surface),
            device,
            queue,
            config: Some(config),
            size,
            limits,
        })
    }

    /// Creates a surface-less context for still exports and tests.
    pub(crate) fn new_headless(size: (u32, u32)) -> Result<Self> {
        let instance = new_instance();
        let adapter = request_adapter(&instance, None)?;
        let (device, queue, limits) = request_device(&adapter)?;

        let size = PhysicalSize::new(size.0.max(1), size.1.max(1));
        validate_surface_size(&limits, size)?;

        Ok(Self {
            _instance: instance,
            surface: None,
            device,
            queue,
            config: None,
            size,
            limits,
        })
    }

    pub(crate) fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.config.as_ref().map(|config| config.format)
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        if let (Some(surface), Some(config)) = (self.surface.as_ref(), self.config.as_mut()) {
            config.width = new_size.width;
            config.height = new_size.height;
            surface.configure(&self.device, config);
        }
    }
}

fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

fn request_adapter(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface,
        force_fallback_adapter: false,
    }))
    .context("failed to find a suitable GPU adapter")?;

    let adapter_info = adapter.get_info();
    tracing::debug!(
        name = %adapter_info.name,
        backend = ?adapter_info.backend,
        device_type = ?adapter_info.device_type,
        "selected GPU adapter"
    );

    let downlevel = adapter.get_downlevel_capabilities();
    if !downlevel
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
    {
        anyhow::bail!(
            "adapter '{name}' does not support compute shaders",
            name = adapter_info.name
        );
    }

    Ok(adapter)
}

fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue, wgpu::Limits)> {
    let limits = adapter.limits();
    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("spotdrift device"),
        required_features: wgpu::Features::empty(),
        required_limits: limits.clone(),
        memory_hints: wgpu::MemoryHints::MemoryUsage,
        trace: wgpu::Trace::default(),
    }))
    .context("failed to create GPU device")?;
    Ok((device, queue, limits))
}

fn validate_surface_size(limits: &wgpu::Limits, size: PhysicalSize<u32>) -> Result<()> {
    let max_dimension = limits.max_texture_dimension_2d;
    if size.width > max_dimension || size.height > max_dimension {
        anyhow::bail!(
            "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}",
            max_dimension = max_dimension,
            width = size.width,
            height = size.height
        );
    }
    Ok(())
}
