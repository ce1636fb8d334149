//! Bootstrap configuration.
use crate::{ApplicationIdentity, DebugMessengerFilter};

/// Whether validation layers and the debug messenger are enabled by
/// default: on in debug builds, off in release builds.
pub const DIAGNOSTICS_ENABLED: bool = cfg!(debug_assertions);

/// Everything [`VulkanContext::new`](crate::VulkanContext::new) needs to
/// know besides the window system extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Enable the validation layer and the debug messenger.
    pub diagnostics_enabled: bool,
    /// Name and versions advertised to the runtime.
    pub identity: ApplicationIdentity,
    /// Filter used for both the bootstrap and the persistent messenger.
    pub debug_filter: DebugMessengerFilter,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            diagnostics_enabled: DIAGNOSTICS_ENABLED,
            identity: ApplicationIdentity::default(),
            debug_filter: DebugMessengerFilter::default(),
        }
    }
}

impl BootstrapConfig {
    /// Enable or disable diagnostics.
    #[inline]
    pub fn diagnostics(mut self, diagnostics_enabled: bool) -> Self {
        self.diagnostics_enabled = diagnostics_enabled;
        self
    }

    /// Name and versions to advertise.
    #[inline]
    pub fn identity(mut self, identity: ApplicationIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Filter for debug messages.
    #[inline]
    pub fn debug_filter(mut self, debug_filter: DebugMessengerFilter) -> Self {
        self.debug_filter = debug_filter;
        self
    }
}
