//! Instance creation utils.
use std::{
    ffi::{CStr, CString},
    fmt,
    os::raw::c_char,
};

use ash::extensions::ext::DebugUtils;
use ash::vk;
use cstr::cstr;
use thiserror::Error;

use crate::{BootstrapSmallVec, DebugMessengerFilter, Runtime, RuntimeInstance};

/// The Khronos validation layer, the only layer enabled with diagnostics.
pub const VALIDATION_LAYER: &CStr = cstr!("VK_LAYER_KHRONOS_validation");

/// Name, versions and target API version advertised to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationIdentity {
    app_name: CString,
    app_version: u32,
    engine_name: CString,
    engine_version: u32,
    api_version: u32,
}

impl Default for ApplicationIdentity {
    fn default() -> Self {
        ApplicationIdentity {
            app_name: CString::from(cstr!("Vulkan Application")),
            app_version: vk::make_api_version(0, 1, 0, 0),
            engine_name: CString::from(cstr!("My Engine")),
            engine_version: vk::make_api_version(0, 1, 0, 0),
            api_version: vk::API_VERSION_1_0,
        }
    }
}

impl ApplicationIdentity {
    /// Application name to advertise.
    #[inline]
    pub fn app_name(mut self, app_name: &str) -> Result<Self, std::ffi::NulError> {
        self.app_name = CString::new(app_name)?;
        Ok(self)
    }

    /// Application version to advertise.
    #[inline]
    pub fn app_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.app_version = vk::make_api_version(0, major, minor, patch);
        self
    }

    /// Engine name to advertise.
    #[inline]
    pub fn engine_name(mut self, engine_name: &str) -> Result<Self, std::ffi::NulError> {
        self.engine_name = CString::new(engine_name)?;
        Ok(self)
    }

    /// Engine version to advertise.
    #[inline]
    pub fn engine_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.engine_version = vk::make_api_version(0, major, minor, patch);
        self
    }

    /// Instance API version to target.
    #[inline]
    pub fn api_version(mut self, major: u32, minor: u32) -> Self {
        self.api_version = vk::make_api_version(0, major, minor, 0);
        self
    }

    /// The advertised application name.
    #[inline]
    pub fn app_name_cstr(&self) -> &CStr {
        &self.app_name
    }

    /// The advertised engine name.
    #[inline]
    pub fn engine_name_cstr(&self) -> &CStr {
        &self.engine_name
    }

    /// The packed application version.
    #[inline]
    pub fn app_version_raw(&self) -> u32 {
        self.app_version
    }

    /// The packed engine version.
    #[inline]
    pub fn engine_version_raw(&self) -> u32 {
        self.engine_version
    }

    /// The packed API version.
    #[inline]
    pub fn api_version_raw(&self) -> u32 {
        self.api_version
    }
}

/// Ordered, duplicate free list of instance extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet(BootstrapSmallVec<CString>);

impl ExtensionSet {
    /// Merges the extensions the window system needs with the debug utils
    /// extension.
    ///
    /// Platform extensions keep their order and come first. With
    /// `diagnostics_enabled`, `VK_EXT_debug_utils` is appended once.
    pub fn assemble<'a>(
        platform_extensions: impl IntoIterator<Item = &'a CStr>,
        diagnostics_enabled: bool,
    ) -> Result<Self, InstanceCreationError> {
        let mut extensions = ExtensionSet::default();
        for extension in platform_extensions {
            extensions.push(extension);
        }

        if extensions.is_empty() {
            return Err(InstanceCreationError::PlatformExtensionUnavailable);
        }

        if diagnostics_enabled {
            extensions.push(DebugUtils::name());
        }

        Ok(extensions)
    }

    fn push(&mut self, extension: &CStr) {
        if !self.contains(extension) {
            self.0.push(extension.to_owned());
        }
    }

    /// Returns true if `extension` is part of the set.
    #[inline]
    pub fn contains(&self, extension: &CStr) -> bool {
        self.0.iter().any(|e| e.as_c_str() == extension)
    }

    /// The extensions, in order.
    #[inline]
    pub fn as_slice(&self) -> &[CString] {
        &self.0
    }

    /// Number of extensions.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no extensions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered list of instance layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSet(BootstrapSmallVec<CString>);

impl LayerSet {
    /// [`VALIDATION_LAYER`] with diagnostics, nothing without.
    pub fn for_diagnostics(diagnostics_enabled: bool) -> Self {
        let mut layers = LayerSet::default();
        if diagnostics_enabled {
            layers.0.push(VALIDATION_LAYER.to_owned());
        }

        layers
    }

    /// Checks every layer against the layers the runtime advertises, by
    /// exact name. Stops at the first missing layer.
    pub fn check_support(&self, runtime: &impl Runtime) -> Result<(), LayerError> {
        let layer_properties = runtime.enumerate_instance_layer_properties()?;
        for layer in self.0.iter() {
            let present = layer_properties.iter().any(|supported_layer| unsafe {
                CStr::from_ptr(supported_layer.layer_name.as_ptr()) == layer.as_c_str()
            });

            if !present {
                return Err(LayerError::LayerNotFound(layer.clone()));
            }
        }

        Ok(())
    }

    /// The layers, in order.
    #[inline]
    pub fn as_slice(&self) -> &[CString] {
        &self.0
    }

    /// Returns true if there are no layers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Errors of the layer check.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Vulkan Error.
    #[error("vulkan error")]
    VulkanError(#[from] vk::Result),
    /// A requested layer is not installed.
    #[error("layer {0:?} not present")]
    LayerNotFound(CString),
}

/// Errors that can occur during instance creation.
#[derive(Debug, Error)]
pub enum InstanceCreationError {
    /// The window system reported no required extensions.
    #[error("window system reported no instance extensions")]
    PlatformExtensionUnavailable,
    /// Validation was requested but the layer is missing.
    #[error("validation layers requested, but not available")]
    ValidationLayersUnavailable(#[source] LayerError),
    /// The runtime rejected the instance.
    #[error("failed to create instance")]
    InstanceCreationFailed(#[source] vk::Result),
}

/// Metadata for after instance creation.
#[derive(Clone)]
pub struct InstanceMetadata {
    instance_handle: vk::Instance,
    api_version: u32,
    enabled_layers: BootstrapSmallVec<CString>,
    enabled_extensions: BootstrapSmallVec<CString>,
}

impl InstanceMetadata {
    /// The instance this metadata belongs to.
    #[inline]
    pub fn instance_handle(&self) -> vk::Instance {
        self.instance_handle
    }

    /// Retrieve the used instance API version.
    #[inline]
    pub fn api_version_raw(&self) -> u32 {
        self.api_version
    }

    /// Retrieve the used instance API major version.
    #[inline]
    pub fn api_version_major(&self) -> u32 {
        vk::api_version_major(self.api_version)
    }

    /// Retrieve the used instance API minor version.
    #[inline]
    pub fn api_version_minor(&self) -> u32 {
        vk::api_version_minor(self.api_version)
    }

    /// List of all enabled layers in the instance.
    #[inline]
    pub fn enabled_layers(&self) -> &[CString] {
        &self.enabled_layers
    }

    /// Returns true if `layer` is enabled.
    #[inline]
    pub fn is_layer_enabled(&self, layer: &CStr) -> bool {
        self.enabled_layers.iter().any(|e| e.as_c_str() == layer)
    }

    /// List of all enabled extensions in the instance.
    #[inline]
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.enabled_extensions
    }

    /// Returns true if `extension` is enabled.
    #[inline]
    pub fn is_extension_enabled(&self, extension: &CStr) -> bool {
        self.enabled_extensions.iter().any(|i| i.as_c_str() == extension)
    }
}

impl fmt::Debug for InstanceMetadata {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("InstanceMetadata")
            .field(
                "api_version",
                &format_args!("{}.{}", self.api_version_major(), self.api_version_minor()),
            )
            .field("enabled_layers", &self.enabled_layers)
            .field("enabled_extensions", &self.enabled_extensions)
            .finish()
    }
}

/// Creates an instance from an [`ApplicationIdentity`], an [`ExtensionSet`]
/// and a [`LayerSet`].
pub struct InstanceBuilder {
    identity: ApplicationIdentity,
    extensions: ExtensionSet,
    layers: LayerSet,
    bootstrap_messenger: Option<DebugMessengerFilter>,
}

impl InstanceBuilder {
    /// Create a new instance builder without extensions or layers.
    #[inline]
    pub fn new(identity: ApplicationIdentity) -> Self {
        InstanceBuilder {
            identity,
            extensions: ExtensionSet::default(),
            layers: LayerSet::default(),
            bootstrap_messenger: None,
        }
    }

    /// Extensions to enable.
    #[inline]
    pub fn extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    /// Layers to enable. Creation fails if any of them is missing.
    #[inline]
    pub fn layers(mut self, layers: LayerSet) -> Self {
        self.layers = layers;
        self
    }

    /// Chain a messenger descriptor into the create info, so messages
    /// emitted while the instance itself is created and destroyed are
    /// reported too.
    #[inline]
    pub fn bootstrap_messenger(mut self, filter: DebugMessengerFilter) -> Self {
        self.bootstrap_messenger = Some(filter);
        self
    }

    /// Configures layers and the bootstrap messenger for `diagnostics_enabled`.
    #[inline]
    pub fn diagnostics(self, diagnostics_enabled: bool, filter: DebugMessengerFilter) -> Self {
        let builder = self.layers(LayerSet::for_diagnostics(diagnostics_enabled));
        if diagnostics_enabled {
            builder.bootstrap_messenger(filter)
        } else {
            builder
        }
    }

    /// Returns the instance and [`InstanceMetadata`] about what is enabled
    /// in it.
    ///
    /// Layers are checked before anything is created; on failure no instance
    /// exists.
    pub unsafe fn build<R: Runtime>(
        self,
        runtime: &R,
    ) -> Result<(R::Instance, InstanceMetadata), InstanceCreationError> {
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&self.identity.app_name)
            .application_version(self.identity.app_version)
            .engine_name(&self.identity.engine_name)
            .engine_version(self.identity.engine_version)
            .api_version(self.identity.api_version);

        let enabled_extensions: BootstrapSmallVec<*const c_char> =
            self.extensions.0.iter().map(|e| e.as_ptr()).collect();
        let enabled_layers: BootstrapSmallVec<*const c_char> =
            self.layers.0.iter().map(|l| l.as_ptr()).collect();

        let mut instance_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layers);

        if !self.layers.is_empty() {
            self.layers
                .check_support(runtime)
                .map_err(InstanceCreationError::ValidationLayersUnavailable)?;
        }

        let mut messenger_info = self.bootstrap_messenger.map(|filter| filter.create_info());
        if let Some(messenger_info) = messenger_info.as_mut() {
            instance_info = instance_info.push_next(messenger_info);
        }

        for extension in self.extensions.as_slice() {
            log::debug!("enabling instance extension {extension:?}");
        }

        let instance = runtime
            .create_instance(&instance_info)
            .map_err(InstanceCreationError::InstanceCreationFailed)?;

        let instance_metadata = InstanceMetadata {
            instance_handle: instance.handle(),
            api_version: app_info.api_version,
            enabled_layers: self.layers.0,
            enabled_extensions: self.extensions.0,
        };
        log::debug!("created instance {instance_metadata:?}");

        Ok((instance, instance_metadata))
    }
}
