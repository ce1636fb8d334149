//! The bootstrapped Vulkan state and its teardown order.
use std::ffi::CStr;

use ash::LoadingError;
use thiserror::Error;

use crate::{
    AdapterSelector, BootstrapConfig, DebugMessenger, DebugMessengerError, DeviceSelectionError,
    ExtensionSet, InstanceBuilder, InstanceCreationError, InstanceMetadata, RuntimeInstance,
    Runtime, SelectedAdapter,
};

/// Errors that abort the bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The Vulkan loader could not be loaded.
    #[error("loader creation error")]
    LoaderCreation(#[from] LoadingError),
    /// The window could not be created.
    #[cfg(feature = "window")]
    #[error("window creation error")]
    Window(#[from] crate::window::WindowError),
    /// Instance creation failed.
    #[error("instance creation error")]
    Instance(#[from] InstanceCreationError),
    /// The debug messenger could not be created.
    #[error("debug messenger error")]
    DebugMessenger(#[from] DebugMessengerError),
    /// No usable physical device.
    #[error("physical device selection error")]
    DeviceSelection(#[from] DeviceSelectionError),
}

/// Instance, debug messenger and selected physical device.
///
/// Dropping the context destroys the debug messenger and then the instance.
pub struct VulkanContext<I: RuntimeInstance> {
    debug_messenger: Option<DebugMessenger>,
    instance: I,
    instance_metadata: InstanceMetadata,
    adapter: Option<SelectedAdapter>,
}

impl<I: RuntimeInstance> VulkanContext<I> {
    /// Creates the instance, the debug messenger (with diagnostics) and
    /// picks a physical device, in that order.
    ///
    /// On failure everything created so far is destroyed in reverse order
    /// before the error is returned.
    pub unsafe fn new<'a, R>(
        runtime: &R,
        config: &BootstrapConfig,
        platform_extensions: impl IntoIterator<Item = &'a CStr>,
    ) -> Result<Self, BootstrapError>
    where
        R: Runtime<Instance = I>,
    {
        let extensions = ExtensionSet::assemble(platform_extensions, config.diagnostics_enabled)?;
        let (instance, instance_metadata) = InstanceBuilder::new(config.identity.clone())
            .extensions(extensions)
            .diagnostics(config.diagnostics_enabled, config.debug_filter)
            .build(runtime)?;

        let mut context = VulkanContext {
            debug_messenger: None,
            instance,
            instance_metadata,
            adapter: None,
        };

        if config.diagnostics_enabled {
            context.debug_messenger =
                Some(DebugMessenger::create(&context.instance, &config.debug_filter)?);
        }

        context.adapter = Some(AdapterSelector::new().select(&context.instance)?);
        Ok(context)
    }

    /// The instance.
    #[inline]
    pub fn instance(&self) -> &I {
        &self.instance
    }

    /// What is enabled on the instance.
    #[inline]
    pub fn instance_metadata(&self) -> &InstanceMetadata {
        &self.instance_metadata
    }

    /// The persistent debug messenger, if diagnostics are enabled.
    #[inline]
    pub fn debug_messenger(&self) -> Option<&DebugMessenger> {
        self.debug_messenger.as_ref()
    }

    /// The selected physical device.
    #[inline]
    pub fn adapter(&self) -> Option<&SelectedAdapter> {
        self.adapter.as_ref()
    }
}

impl<I: RuntimeInstance> Drop for VulkanContext<I> {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug_messenger) = self.debug_messenger.take() {
                debug_messenger.destroy(&self.instance);
            }

            self.instance.destroy_instance();
        }
        log::debug!("destroyed instance {:?}", self.instance.handle());
    }
}
