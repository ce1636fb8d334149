//! The boundary between the bootstrap logic and the Vulkan runtime.
//!
//! Everything the bootstrap sequence needs from the loader goes through
//! [`Runtime`] (entry-level calls) and [`RuntimeInstance`] (calls made
//! through a live instance). [`AshRuntime`] forwards to [`ash`]; tests swap
//! in a scripted runtime.
use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::{vk, Entry, LoadingError};

/// Entry-level Vulkan calls, available before an instance exists.
pub trait Runtime {
    /// The instance type produced by [`Runtime::create_instance`].
    type Instance: RuntimeInstance;

    /// Lists the layers advertised by the loader.
    fn enumerate_instance_layer_properties(&self) -> VkResult<Vec<vk::LayerProperties>>;

    /// Creates an instance from a fully assembled create info.
    unsafe fn create_instance(&self, create_info: &vk::InstanceCreateInfo)
        -> VkResult<Self::Instance>;
}

/// Calls made through a live instance.
pub trait RuntimeInstance {
    /// Raw handle of the instance.
    fn handle(&self) -> vk::Instance;

    /// Resolves an instance-level entry point by name. `None` means the
    /// runtime does not expose the symbol.
    unsafe fn get_instance_proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction;

    /// Lists the physical devices visible through this instance.
    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    /// Properties (name, type, limits) of a physical device.
    unsafe fn get_physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    /// Core features of a physical device.
    unsafe fn get_physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures;

    /// Queue family records of a physical device, in index order.
    unsafe fn get_physical_device_queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties>;

    /// Destroys the instance. Every object created from it must already be
    /// gone.
    unsafe fn destroy_instance(&self);
}

/// [`Runtime`] backed by the system Vulkan loader.
#[derive(Clone)]
pub struct AshRuntime {
    entry: Entry,
}

impl AshRuntime {
    /// Loads the Vulkan loader library.
    pub unsafe fn load() -> Result<Self, LoadingError> {
        Ok(AshRuntime {
            entry: Entry::load()?,
        })
    }

    /// Wraps an already loaded entry.
    #[inline]
    pub fn from_entry(entry: Entry) -> Self {
        AshRuntime { entry }
    }

    /// The underlying entry.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }
}

impl Runtime for AshRuntime {
    type Instance = AshInstance;

    #[allow(unused_unsafe)]
    fn enumerate_instance_layer_properties(&self) -> VkResult<Vec<vk::LayerProperties>> {
        unsafe { self.entry.enumerate_instance_layer_properties() }
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo,
    ) -> VkResult<AshInstance> {
        let instance = self.entry.create_instance(create_info, None)?;
        Ok(AshInstance {
            entry: self.entry.clone(),
            instance,
        })
    }
}

/// [`RuntimeInstance`] backed by an [`ash::Instance`].
pub struct AshInstance {
    entry: Entry,
    instance: ash::Instance,
}

impl AshInstance {
    /// The underlying instance loader.
    #[inline]
    pub fn loader(&self) -> &ash::Instance {
        &self.instance
    }
}

impl RuntimeInstance for AshInstance {
    #[inline]
    fn handle(&self) -> vk::Instance {
        self.instance.handle()
    }

    unsafe fn get_instance_proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        self.entry
            .get_instance_proc_addr(self.instance.handle(), name.as_ptr())
    }

    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        self.instance.enumerate_physical_devices()
    }

    unsafe fn get_physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.instance.get_physical_device_properties(physical_device)
    }

    unsafe fn get_physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        self.instance.get_physical_device_features(physical_device)
    }

    unsafe fn get_physical_device_queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.instance
            .get_physical_device_queue_family_properties(physical_device)
    }

    unsafe fn destroy_instance(&self) {
        self.instance.destroy_instance(None);
    }
}
