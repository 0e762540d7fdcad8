//! wgpu-backed point surface
//!
//! Points live in a storage buffer sized for the full ring capacity; the
//! scalar parameters sit in a small uniform buffer. Both are exposed through
//! one bind group for the point-splat shader.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::scan::point::GpuPoint;

use super::view::{PointParams, PointSurface, SurfaceHandle};

const POINT_SIZE: u64 = std::mem::size_of::<GpuPoint>() as u64;

/// GPU storage for the point cloud
pub struct GpuPointSurface {
    device: wgpu::Device,
    queue: wgpu::Queue,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    points_buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    capacity: usize,
    allocations: u32,
}

impl GpuPointSurface {
    /// Create on an existing device
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point_params"),
            size: std::mem::size_of::<PointParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("point_cloud_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        Self {
            device,
            queue,
            params_buffer,
            bind_group_layout,
            points_buffer: None,
            bind_group: None,
            capacity: 0,
            allocations: 0,
        }
    }

    /// Create on a fresh headless device
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scancloud_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                    max_buffer_size: adapter_limits.max_buffer_size,
                    ..Default::default()
                },
                memory_hints: wgpu::MemoryHints::Performance,
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| Error::Gpu(e.to_string()))?;

        log::info!(
            "GPU buffer limits: max_buffer_size={}MB, max_storage_binding={}MB",
            adapter_limits.max_buffer_size / 1024 / 1024,
            adapter_limits.max_storage_buffer_binding_size / 1024 / 1024
        );

        Ok(Self::new(device, queue))
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Bind group of the current allocation
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl PointSurface for GpuPointSurface {
    fn allocate(&mut self, capacity: usize) -> Result<SurfaceHandle> {
        let size = capacity.max(1) as u64 * POINT_SIZE;
        let limits = self.device.limits();
        let max = limits.max_buffer_size.min(limits.max_storage_buffer_binding_size as u64);
        if size > max {
            return Err(Error::Render(format!(
                "{} points need {}MB, device allows {}MB",
                capacity,
                size / 1024 / 1024,
                max / 1024 / 1024
            )));
        }

        let points_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("point_cloud"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("point_cloud_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: points_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        self.points_buffer = Some(points_buffer);
        self.bind_group = Some(bind_group);
        self.capacity = capacity;
        self.allocations += 1;
        Ok(SurfaceHandle(self.allocations))
    }

    fn upload(&mut self, points: &[GpuPoint]) -> Result<()> {
        let Some(buffer) = &self.points_buffer else {
            return Err(Error::Render("upload before allocate".into()));
        };
        if points.len() > self.capacity {
            return Err(Error::Render(format!(
                "{} points exceed allocation of {}",
                points.len(),
                self.capacity
            )));
        }
        if !points.is_empty() {
            self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(points));
        }
        Ok(())
    }

    fn set_params(&mut self, params: &PointParams) -> Result<()> {
        self.queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
        Ok(())
    }
}
