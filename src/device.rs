//! Physical device selection utils.
use std::ffi::CStr;

use ash::vk;
use thiserror::Error;

use crate::RuntimeInstance;

/// Score of an adapter. Larger is better, zero or less is unusable.
pub type AdapterScore = i64;

/// Added to the score of discrete GPUs.
pub const DISCRETE_BONUS: AdapterScore = 1000;

/// Kind of a physical device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AdapterType {
    /// GPU embedded in or tightly coupled with the host CPU.
    Integrated,
    /// Separate GPU, typically connected over a bus.
    Discrete,
    /// Virtual node in a virtualization environment.
    Virtual,
    /// Running on the host CPU.
    Cpu,
    /// Anything else.
    Other,
}

impl From<vk::PhysicalDeviceType> for AdapterType {
    fn from(ty: vk::PhysicalDeviceType) -> Self {
        match ty {
            vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterType::Integrated,
            vk::PhysicalDeviceType::DISCRETE_GPU => AdapterType::Discrete,
            vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterType::Virtual,
            vk::PhysicalDeviceType::CPU => AdapterType::Cpu,
            _ => AdapterType::Other,
        }
    }
}

/// What the selection looks at for each physical device.
#[derive(Debug, Clone)]
pub struct AdapterDescriptor {
    /// Name of the physical device.
    pub name: String,
    /// Kind of the physical device.
    pub adapter_type: AdapterType,
    /// `maxImageDimension2D` limit.
    pub max_image_dimension_2d: u32,
    /// Core features of the physical device.
    pub features: vk::PhysicalDeviceFeatures,
}

impl AdapterDescriptor {
    /// Builds a descriptor from the queried properties and features.
    pub fn new(
        properties: &vk::PhysicalDeviceProperties,
        features: vk::PhysicalDeviceFeatures,
    ) -> Self {
        AdapterDescriptor {
            name: unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
                .to_string_lossy()
                .into_owned(),
            adapter_type: properties.device_type.into(),
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            features,
        }
    }

    unsafe fn query(instance: &impl RuntimeInstance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);
        AdapterDescriptor::new(&properties, features)
    }
}

/// Queue family indices needed by the application.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// First queue family with at least one queue supporting graphics.
    pub graphics_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Walks the queue families in order and stops at the first one with
    /// queues that support graphics.
    pub fn find(queue_family_properties: &[vk::QueueFamilyProperties]) -> Self {
        let mut indices = QueueFamilyIndices::default();
        for (i, queue_family) in queue_family_properties.iter().enumerate() {
            log::trace!("queue family {i}: {} queue(s)", queue_family.queue_count);

            if queue_family.queue_count > 0
                && queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.graphics_family = Some(i as u32);
            }

            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    /// Returns true once every required family has been found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some()
    }
}

/// Rates an adapter. Discrete GPUs get [`DISCRETE_BONUS`], then the maximum
/// 2D image dimension is added. Without a graphics queue family the adapter
/// scores 0 no matter what.
pub fn rate_adapter(descriptor: &AdapterDescriptor, indices: &QueueFamilyIndices) -> AdapterScore {
    let mut score = 0;

    if descriptor.adapter_type == AdapterType::Discrete {
        score += DISCRETE_BONUS;
    }

    score += AdapterScore::from(descriptor.max_image_dimension_2d);

    if !indices.is_complete() {
        return 0;
    }

    score
}

/// Errors that can occur during physical device selection.
#[derive(Debug, Error)]
pub enum DeviceSelectionError {
    /// Vulkan Error.
    #[error("vulkan error")]
    VulkanError(#[from] vk::Result),
    /// The instance exposes no physical devices.
    #[error("failed to find GPUs with Vulkan support")]
    NoAdaptersFound,
    /// No physical device has a positive score.
    #[error("failed to find a suitable GPU")]
    NoSuitableAdapter,
}

/// The physical device picked by [`AdapterSelector`].
#[derive(Debug, Clone)]
pub struct SelectedAdapter {
    physical_device: vk::PhysicalDevice,
    descriptor: AdapterDescriptor,
    queue_family_indices: QueueFamilyIndices,
    score: AdapterScore,
}

impl SelectedAdapter {
    /// The physical device handle. Valid as long as the instance lives.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Description of the physical device.
    #[inline]
    pub fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    /// Name of the physical device.
    #[inline]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The queue families found on the physical device.
    #[inline]
    pub fn queue_family_indices(&self) -> QueueFamilyIndices {
        self.queue_family_indices
    }

    /// Score the physical device was selected with.
    #[inline]
    pub fn score(&self) -> AdapterScore {
        self.score
    }
}

/// Function used to reject physical devices on top of the scoring, for
/// example when a feature is missing.
pub type AdditionalSuitabilityFn = dyn FnMut(&AdapterDescriptor) -> bool;

/// Picks the highest scoring physical device.
#[derive(Default)]
pub struct AdapterSelector {
    additional_suitability_fn: Option<Box<AdditionalSuitabilityFn>>,
}

impl AdapterSelector {
    /// Create a new adapter selector.
    #[inline]
    pub fn new() -> Self {
        AdapterSelector::default()
    }

    /// Allows to specify custom criteria for a physical device. Devices
    /// rejected by it score 0.
    #[inline]
    pub fn additional_suitability(
        mut self,
        additional_suitability: Box<AdditionalSuitabilityFn>,
    ) -> Self {
        self.additional_suitability_fn = Some(additional_suitability);
        self
    }

    /// Scores one physical device.
    pub unsafe fn score(
        &mut self,
        instance: &impl RuntimeInstance,
        physical_device: vk::PhysicalDevice,
    ) -> (AdapterDescriptor, QueueFamilyIndices, AdapterScore) {
        let descriptor = AdapterDescriptor::query(instance, physical_device);
        let queue_family_properties =
            instance.get_physical_device_queue_family_properties(physical_device);
        let indices = QueueFamilyIndices::find(&queue_family_properties);

        let mut score = rate_adapter(&descriptor, &indices);
        if let Some(additional_suitability) = self.additional_suitability_fn.as_mut() {
            if !additional_suitability(&descriptor) {
                score = 0;
            }
        }

        log::debug!("physical device {:?} (score: {score})", descriptor.name);
        (descriptor, indices, score)
    }

    /// Returns the physical device with the strictly highest score. On a tie
    /// the one enumerated first wins.
    pub unsafe fn select(
        mut self,
        instance: &impl RuntimeInstance,
    ) -> Result<SelectedAdapter, DeviceSelectionError> {
        let physical_devices = instance.enumerate_physical_devices()?;
        if physical_devices.is_empty() {
            return Err(DeviceSelectionError::NoAdaptersFound);
        }

        let mut best: Option<SelectedAdapter> = None;
        for physical_device in physical_devices {
            let (descriptor, queue_family_indices, score) = self.score(instance, physical_device);
            let best_score = best.as_ref().map_or(0, SelectedAdapter::score);
            if score > best_score {
                best = Some(SelectedAdapter {
                    physical_device,
                    descriptor,
                    queue_family_indices,
                    score,
                });
            }
        }

        let selected = best.ok_or(DeviceSelectionError::NoSuitableAdapter)?;
        log::info!(
            "selected physical device {:?} (score: {})",
            selected.name(),
            selected.score()
        );
        Ok(selected)
    }
}
