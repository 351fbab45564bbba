/*!
# Stellar Render - Vulkan Backend

Vulkan implementation of the stellar_render device traits.

This crate provides a `GraphicsDevice` built on Ash for Vulkan bindings and
gpu-allocator for memory management, a window swapchain, and a
`ShaderReflector` reading SPIR-V with spirq.

Validation layers and the colored debug messenger are compiled in only with
the `vulkan-validation` feature.

# Example

```no_run
use std::sync::Arc;
use stellar_render::stellar::{FrameConfig, RenderContext};
use stellar_render::stellar::frame::FrameLifecycleManager;
use stellar_render_vulkan::stellar::{VulkanConfig, VulkanDevice};
# fn run(window: &winit::window::Window) -> stellar_render::stellar::Result<()> {
let device = VulkanDevice::new(window, VulkanConfig::default())?;
let swapchain = device.create_swapchain(window, 1280, 720)?;
let context = RenderContext::new(Arc::new(device), FrameConfig::default(), swapchain.as_ref())?;
let frames = FrameLifecycleManager::new(&context, swapchain)?;
# Ok(())
# }
```
*/

mod vulkan_config;
mod vulkan_format;
mod vulkan_context;
#[cfg(feature = "vulkan-validation")]
mod debug;

mod vulkan_texture;
mod vulkan_buffer;
mod vulkan_sync;
mod vulkan_render_pass;
mod vulkan_framebuffer;
mod vulkan_pipeline;
mod vulkan_descriptor;
mod vulkan_command_list;
mod vulkan_swapchain;
mod vulkan_reflection;
mod vulkan_device;

pub use vulkan_config::{
    DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats, VulkanConfig,
};
pub use vulkan_device::VulkanDevice;
pub use vulkan_reflection::SpirqReflector;
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_texture::{VulkanRenderTarget, VulkanTexture};
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_command_list::VulkanCommandList;

#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report};

/// Public namespace mirroring `stellar_render::stellar`
pub mod stellar {
    pub use crate::vulkan_config::{
        DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats, VulkanConfig,
    };
    pub use crate::vulkan_device::VulkanDevice;
    pub use crate::vulkan_reflection::SpirqReflector;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report};
}
