mod offline_headless;
mod online_renderer;

pub use offline_headless::OfflineHeadless;
pub use online_renderer::OnlineRenderer;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;

async fn get_device_and_queue(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    log::info!("using adapter {} ({:?})", info.name, info.backend);
    adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                features: wgpu::Features::empty(),
                limits: wgpu::Limits {
                    max_storage_buffer_binding_size: adapter.limits().max_storage_buffer_binding_size,
                    ..wgpu::Limits::default()
                },
            },
            None,
        )
        .await
        .context("Failed to create logical device and queue")
}

/// Raised once the device reports an error it cannot recover from.
fn watch_device(device: &wgpu::Device) -> Arc<AtomicBool> {
    let lost = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&lost);
    device.on_uncaptured_error(move |e| {
        log::error!("uncaptured device error: {}", e);
        flag.store(true, Ordering::Release);
    });
    lost
}
