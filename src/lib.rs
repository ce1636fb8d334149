#![allow(clippy::missing_safety_doc)]
#![warn(missing_docs)]
/*!
Minimal Vulkan bootstrap for Rust, built on [`ash`].

- ✅ Instance creation, with the Khronos validation layer in debug builds
- ✅ Debug messenger covering instance creation and the rest of the
  instance's lifetime
- ✅ Physical device selection by score
- ✅ Graphics queue family lookup
- ❌ No logical device, swapchain or rendering

## Cargo Features

- `window` (enabled by default): Enables the [`winit`] window, the
  [`raw-window-handle`] based surface extension query and the
  `vulkan-bootstrap` binary.

## Example

```rust,ignore
let mut window = AppWindow::new()?;
let runtime = unsafe { AshRuntime::load() }?;
let config = BootstrapConfig::default();

let context =
    unsafe { VulkanContext::new(&runtime, &config, window.required_extensions()) }?;
let adapter = context.adapter().unwrap();
println!("{} (score: {})", adapter.name(), adapter.score());

window.run_until_closed();
// destroys the debug messenger, then the instance
drop(context);
```

The pieces can also be used on their own:

```rust,ignore
let extensions = ExtensionSet::assemble(window.required_extensions(), true)?;
let (instance, metadata) = unsafe {
    InstanceBuilder::new(ApplicationIdentity::default())
        .extensions(extensions)
        .diagnostics(true, DebugMessengerFilter::default())
        .build(&runtime)
}?;
let debug_messenger =
    unsafe { DebugMessenger::create(&instance, &DebugMessengerFilter::default()) }?;
let adapter = unsafe { AdapterSelector::new().select(&instance) }?;
```

## Licensing

This project is licensed under the zlib License.

[`winit`]: https://crates.io/crates/winit
[`raw-window-handle`]: https://crates.io/crates/raw-window-handle
*/

#[cfg(feature = "window")]
pub mod app;
pub mod config;
pub mod context;
pub mod debug;
pub mod device;
pub mod instance;
pub mod logging;
#[cfg(test)]
mod mock;
pub mod runtime;
#[cfg(feature = "window")]
pub mod window;

pub use config::*;
pub use context::*;
pub use debug::*;
pub use device::*;
pub use instance::*;
pub use logging::*;
pub use runtime::*;
#[cfg(feature = "window")]
pub use window::*;

type BootstrapSmallVec<T> = smallvec::SmallVec<[T; 8]>;
