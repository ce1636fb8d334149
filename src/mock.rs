//! Scripted runtime for tests.
//!
//! Every call that creates or destroys something is appended to a
//! thread-local trace, so tests can check ordering. Each test runs on its
//! own thread and starts with [`reset`].
use std::{
    cell::RefCell,
    ffi::{CStr, CString},
    os::raw::c_char,
};

use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::{Runtime, RuntimeInstance, CREATE_DEBUG_UTILS_MESSENGER, DESTROY_DEBUG_UTILS_MESSENGER};

/// What [`Runtime::create_instance`] was asked to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInstance {
    pub app_name: String,
    pub engine_name: String,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    pub bootstrap_messenger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    LayersEnumerated,
    InstanceCreated(CreatedInstance),
    MessengerCreated,
    /// A debug callback returned this acknowledgement.
    Callback(vk::Bool32),
    MessengerDestroyed,
    InstanceDestroyed,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    live_instances: i32,
    live_messengers: i32,
    next_handle: u64,
    messenger_failure: Option<vk::Result>,
}

thread_local! {
    static STATE: RefCell<State> = RefCell::new(State::default());
}

pub fn reset() {
    STATE.with(|state| *state.borrow_mut() = State::default());
}

pub fn calls() -> Vec<Call> {
    STATE.with(|state| state.borrow().calls.clone())
}

pub fn live_instances() -> i32 {
    STATE.with(|state| state.borrow().live_instances)
}

pub fn live_messengers() -> i32 {
    STATE.with(|state| state.borrow().live_messengers)
}

/// Makes `vkCreateDebugUtilsMessengerEXT` return `result`.
pub fn fail_messenger_creation(result: vk::Result) {
    STATE.with(|state| state.borrow_mut().messenger_failure = Some(result));
}

fn record(call: Call) {
    STATE.with(|state| state.borrow_mut().calls.push(call));
}

fn next_handle() -> u64 {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.next_handle += 1;
        0x1000 + state.next_handle
    })
}

fn copy_name(dst: &mut [c_char], name: &str) {
    for (dst, src) in dst.iter_mut().zip(name.bytes()) {
        *dst = src as c_char;
    }
}

unsafe fn names(ptr: *const *const c_char, count: u32) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }

    std::slice::from_raw_parts(ptr, count as usize)
        .iter()
        .map(|&name| CStr::from_ptr(name).to_string_lossy().into_owned())
        .collect()
}

/// Sends one message through the callback of `info`, the way a layer would.
unsafe fn emit(info: &vk::DebugUtilsMessengerCreateInfoEXT) {
    if let Some(callback) = info.pfn_user_callback {
        let message = CString::new("mock layer message").unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT::builder()
            .message(&message)
            .build();
        let ack = callback(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            &data,
            info.p_user_data,
        );
        record(Call::Callback(ack));
    }
}

unsafe extern "system" fn create_debug_utils_messenger(
    _instance: vk::Instance,
    p_create_info: *const vk::DebugUtilsMessengerCreateInfoEXT,
    _p_allocator: *const vk::AllocationCallbacks,
    p_messenger: *mut vk::DebugUtilsMessengerEXT,
) -> vk::Result {
    if let Some(failure) = STATE.with(|state| state.borrow().messenger_failure) {
        return failure;
    }

    *p_messenger = vk::DebugUtilsMessengerEXT::from_raw(next_handle());
    STATE.with(|state| state.borrow_mut().live_messengers += 1);
    record(Call::MessengerCreated);
    emit(&*p_create_info);

    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_debug_utils_messenger(
    _instance: vk::Instance,
    _messenger: vk::DebugUtilsMessengerEXT,
    _p_allocator: *const vk::AllocationCallbacks,
) {
    STATE.with(|state| state.borrow_mut().live_messengers -= 1);
    record(Call::MessengerDestroyed);
}

/// A physical device exposed by [`MockInstance`].
#[derive(Debug, Clone)]
pub struct MockAdapter {
    name: String,
    device_type: vk::PhysicalDeviceType,
    max_image_dimension_2d: u32,
    features: vk::PhysicalDeviceFeatures,
    queue_families: Vec<vk::QueueFamilyProperties>,
}

impl MockAdapter {
    pub fn new(name: &str, device_type: vk::PhysicalDeviceType, max_image_dimension_2d: u32) -> Self {
        MockAdapter {
            name: name.to_owned(),
            device_type,
            max_image_dimension_2d,
            features: vk::PhysicalDeviceFeatures::default(),
            queue_families: Vec::new(),
        }
    }

    pub fn queue_family(mut self, queue_flags: vk::QueueFlags, queue_count: u32) -> Self {
        self.queue_families.push(vk::QueueFamilyProperties {
            queue_flags,
            queue_count,
            ..Default::default()
        });
        self
    }

    pub fn features(mut self, features: vk::PhysicalDeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn properties(&self) -> vk::PhysicalDeviceProperties {
        let mut properties = vk::PhysicalDeviceProperties {
            device_type: self.device_type,
            ..Default::default()
        };
        properties.limits.max_image_dimension2_d = self.max_image_dimension_2d;
        copy_name(&mut properties.device_name, &self.name);
        properties
    }
}

pub struct MockInstance {
    handle: vk::Instance,
    adapters: Vec<MockAdapter>,
    debug_utils: bool,
}

impl MockInstance {
    /// An instance that was not created through [`MockRuntime`].
    pub fn new(adapters: Vec<MockAdapter>) -> Self {
        MockInstance {
            handle: vk::Instance::from_raw(next_handle()),
            adapters,
            debug_utils: true,
        }
    }

    /// Makes the debug utils entry points unresolvable.
    pub fn without_debug_utils(mut self) -> Self {
        self.debug_utils = false;
        self
    }

    fn adapter(&self, physical_device: vk::PhysicalDevice) -> &MockAdapter {
        &self.adapters[physical_device.as_raw() as usize - 1]
    }
}

impl RuntimeInstance for MockInstance {
    fn handle(&self) -> vk::Instance {
        self.handle
    }

    unsafe fn get_instance_proc_addr(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        if !self.debug_utils {
            return None;
        }

        if name == CREATE_DEBUG_UTILS_MESSENGER {
            let function: vk::PFN_vkCreateDebugUtilsMessengerEXT = create_debug_utils_messenger;
            Some(std::mem::transmute(function))
        } else if name == DESTROY_DEBUG_UTILS_MESSENGER {
            let function: vk::PFN_vkDestroyDebugUtilsMessengerEXT = destroy_debug_utils_messenger;
            Some(std::mem::transmute(function))
        } else {
            None
        }
    }

    unsafe fn enumerate_physical_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((1..=self.adapters.len() as u64)
            .map(vk::PhysicalDevice::from_raw)
            .collect())
    }

    unsafe fn get_physical_device_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.adapter(physical_device).properties()
    }

    unsafe fn get_physical_device_features(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceFeatures {
        self.adapter(physical_device).features
    }

    unsafe fn get_physical_device_queue_family_properties(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.adapter(physical_device).queue_families.clone()
    }

    unsafe fn destroy_instance(&self) {
        STATE.with(|state| state.borrow_mut().live_instances -= 1);
        record(Call::InstanceDestroyed);
    }
}

#[derive(Default)]
pub struct MockRuntime {
    layers: Vec<String>,
    adapters: Vec<MockAdapter>,
    instance_failure: Option<vk::Result>,
    debug_utils: bool,
}

impl MockRuntime {
    pub fn new() -> Self {
        MockRuntime {
            debug_utils: true,
            ..Default::default()
        }
    }

    /// Layers the loader advertises.
    pub fn layers(mut self, layers: &[&str]) -> Self {
        self.layers = layers.iter().map(|&layer| layer.to_owned()).collect();
        self
    }

    pub fn adapter(mut self, adapter: MockAdapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn fail_instance_creation(mut self, result: vk::Result) -> Self {
        self.instance_failure = Some(result);
        self
    }

    pub fn without_debug_utils(mut self) -> Self {
        self.debug_utils = false;
        self
    }
}

impl Runtime for MockRuntime {
    type Instance = MockInstance;

    fn enumerate_instance_layer_properties(&self) -> VkResult<Vec<vk::LayerProperties>> {
        record(Call::LayersEnumerated);
        Ok(self
            .layers
            .iter()
            .map(|layer| {
                let mut properties = vk::LayerProperties::default();
                copy_name(&mut properties.layer_name, layer);
                properties
            })
            .collect())
    }

    unsafe fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo,
    ) -> VkResult<MockInstance> {
        let app_info = &*create_info.p_application_info;
        let mut bootstrap_messenger = None;
        let mut next = create_info.p_next as *const vk::BaseInStructure;
        while !next.is_null() {
            if (*next).s_type == vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT {
                bootstrap_messenger = Some(&*(next as *const vk::DebugUtilsMessengerCreateInfoEXT));
            }
            next = (*next).p_next;
        }

        if let Some(failure) = self.instance_failure {
            return Err(failure);
        }

        record(Call::InstanceCreated(CreatedInstance {
            app_name: CStr::from_ptr(app_info.p_application_name)
                .to_string_lossy()
                .into_owned(),
            engine_name: CStr::from_ptr(app_info.p_engine_name)
                .to_string_lossy()
                .into_owned(),
            extensions: names(
                create_info.pp_enabled_extension_names,
                create_info.enabled_extension_count,
            ),
            layers: names(
                create_info.pp_enabled_layer_names,
                create_info.enabled_layer_count,
            ),
            bootstrap_messenger: bootstrap_messenger.is_some(),
        }));
        STATE.with(|state| state.borrow_mut().live_instances += 1);

        if let Some(info) = bootstrap_messenger {
            emit(info);
        }

        let instance = MockInstance::new(self.adapters.clone());
        Ok(if self.debug_utils {
            instance
        } else {
            instance.without_debug_utils()
        })
    }
}
