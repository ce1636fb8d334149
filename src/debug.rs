//! Debug messenger utils.
use std::{
    ffi::{c_void, CStr},
    io::{self, Write},
};

use ash::vk;
use cstr::cstr;
use thiserror::Error;

use crate::RuntimeInstance;

/// Name of the dynamic entry point creating a debug messenger.
pub const CREATE_DEBUG_UTILS_MESSENGER: &CStr = cstr!("vkCreateDebugUtilsMessengerEXT");
/// Name of the dynamic entry point destroying a debug messenger.
pub const DESTROY_DEBUG_UTILS_MESSENGER: &CStr = cstr!("vkDestroyDebugUtilsMessengerEXT");

/// Severity and category filter of a debug messenger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DebugMessengerFilter {
    /// Severities forwarded to the callback.
    pub message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    /// Message categories forwarded to the callback.
    pub message_type: vk::DebugUtilsMessageTypeFlagsEXT,
}

impl Default for DebugMessengerFilter {
    /// Verbose, warning and error messages of every category. Info is left
    /// out, it reports every resource creation.
    fn default() -> Self {
        DebugMessengerFilter {
            message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        }
    }
}

impl DebugMessengerFilter {
    /// Filter for the severity of debug messages.
    #[inline]
    pub fn message_severity(mut self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        self.message_severity = severity;
        self
    }

    /// Filter for the type of debug messages.
    #[inline]
    pub fn message_type(mut self, ty: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        self.message_type = ty;
        self
    }

    /// Builds the messenger descriptor for this filter, pointing at
    /// [`validation_callback`] without any user data.
    ///
    /// This is plain data and does not create anything. The same descriptor
    /// is chained into instance creation and used for the persistent
    /// messenger.
    pub fn create_info(&self) -> vk::DebugUtilsMessengerCreateInfoEXT {
        vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(self.message_severity)
            .message_type(self.message_type)
            .pfn_user_callback(Some(validation_callback))
            .build()
    }
}

/// Writes `message` to `out` in the diagnostic sink format.
pub fn write_validation_message(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "validation layer: {message}")
}

/// The debug callback installed by [`DebugMessengerFilter::create_info`].
///
/// Writes the message to stderr and never asks the runtime to abort the
/// call that triggered it.
pub unsafe extern "system" fn validation_callback(
    _message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        "".into()
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };

    // A failed write to stderr has nowhere better to go.
    let _ = write_validation_message(&mut io::stderr().lock(), &message);

    vk::FALSE
}

/// Errors that can occur while creating the debug messenger.
#[derive(Debug, Error)]
pub enum DebugMessengerError {
    /// The instance does not expose `vkCreateDebugUtilsMessengerEXT`.
    #[error("vkCreateDebugUtilsMessengerEXT not present")]
    DiagnosticsEntryPointMissing,
    /// The runtime rejected the messenger.
    #[error("failed to set up debug messenger")]
    DiagnosticMessengerCreationFailed(#[source] vk::Result),
}

unsafe fn resolve_create(
    instance: &impl RuntimeInstance,
) -> Option<vk::PFN_vkCreateDebugUtilsMessengerEXT> {
    let function = instance.get_instance_proc_addr(CREATE_DEBUG_UTILS_MESSENGER)?;
    Some(std::mem::transmute::<
        unsafe extern "system" fn(),
        vk::PFN_vkCreateDebugUtilsMessengerEXT,
    >(function))
}

unsafe fn resolve_destroy(
    instance: &impl RuntimeInstance,
) -> Option<vk::PFN_vkDestroyDebugUtilsMessengerEXT> {
    let function = instance.get_instance_proc_addr(DESTROY_DEBUG_UTILS_MESSENGER)?;
    Some(std::mem::transmute::<
        unsafe extern "system" fn(),
        vk::PFN_vkDestroyDebugUtilsMessengerEXT,
    >(function))
}

/// The persistent debug messenger, living between instance creation and
/// instance destruction.
///
/// Entry points are resolved through the instance on every create and
/// destroy, nothing is cached.
#[derive(Debug)]
pub struct DebugMessenger {
    handle: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Creates the messenger through `vkCreateDebugUtilsMessengerEXT`.
    pub unsafe fn create(
        instance: &impl RuntimeInstance,
        filter: &DebugMessengerFilter,
    ) -> Result<Self, DebugMessengerError> {
        let create = resolve_create(instance)
            .ok_or(DebugMessengerError::DiagnosticsEntryPointMissing)?;

        let create_info = filter.create_info();
        let mut handle = vk::DebugUtilsMessengerEXT::null();
        create(instance.handle(), &create_info, std::ptr::null(), &mut handle)
            .result()
            .map_err(DebugMessengerError::DiagnosticMessengerCreationFailed)?;

        log::debug!("created debug messenger {handle:?}");
        Ok(DebugMessenger { handle })
    }

    /// The messenger handle.
    #[inline]
    pub fn handle(&self) -> vk::DebugUtilsMessengerEXT {
        self.handle
    }

    /// Destroys the messenger. Must run before `instance` is destroyed.
    ///
    /// When the destroy entry point cannot be resolved this returns without
    /// doing anything; destroying the instance reclaims the messenger.
    pub unsafe fn destroy(self, instance: &impl RuntimeInstance) {
        match resolve_destroy(instance) {
            Some(destroy) => {
                destroy(instance.handle(), self.handle, std::ptr::null());
                log::debug!("destroyed debug messenger {:?}", self.handle);
            }
            None => log::debug!(
                "{DESTROY_DEBUG_UTILS_MESSENGER:?} not present, leaving messenger to the instance"
            ),
        }
    }
}
