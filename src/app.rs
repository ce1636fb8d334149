//! Window, bootstrap, event loop, teardown.
use crate::{AppWindow, AshRuntime, BootstrapConfig, BootstrapError, VulkanContext};

/// Opens the window, bootstraps Vulkan for it and idles until the window is
/// closed.
///
/// Teardown runs in reverse: debug messenger, instance, then the window.
pub fn run(config: &BootstrapConfig) -> Result<(), BootstrapError> {
    let mut window = AppWindow::new()?;
    let runtime = unsafe { AshRuntime::load() }?;

    let context =
        unsafe { VulkanContext::new(&runtime, config, window.required_extensions()) }?;
    if let Some(adapter) = context.adapter() {
        log::info!(
            "using {:?} ({:?}), graphics queue family {:?}",
            adapter.name(),
            adapter.descriptor().adapter_type,
            adapter.queue_family_indices().graphics_family
        );
    }

    window.run_until_closed();

    drop(context);
    drop(window);
    Ok(())
}
