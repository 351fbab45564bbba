/// Device module - backend-agnostic GPU object traits consumed by the frame graph

pub mod graphics_device;
pub mod texture;
pub mod buffer;
pub mod render_pass;
pub mod framebuffer;
pub mod pipeline;
pub mod descriptor;
pub mod command_list;
pub mod sync;
pub mod swapchain;
pub mod shader_reflection;

#[cfg(test)]
pub mod mock_graphics_device;

pub use graphics_device::*;
pub use texture::*;
pub use buffer::*;
pub use render_pass::*;
pub use framebuffer::*;
pub use pipeline::*;
pub use descriptor::*;
pub use command_list::*;
pub use sync::*;
pub use swapchain::*;
pub use shader_reflection::*;
