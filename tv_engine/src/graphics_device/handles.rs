/// Opaque GPU object handles
///
/// Backends store their native 64-bit handle values inside these newtypes.
/// The core never interprets the value.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Null handle
            pub const NULL: Self = Self(0);

            /// Wrap a backend handle value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Backend handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// Registered shader stage binary
    ShaderModuleHandle
);
define_handle!(
    /// Graphics pipeline object
    PipelineHandle
);
define_handle!(
    /// Pipeline layout (descriptor set layouts + push constant ranges)
    PipelineLayoutHandle
);
define_handle!(
    /// Render pass object
    RenderPassHandle
);
define_handle!(
    /// Framebuffer bound to one swapchain image
    FramebufferHandle
);
define_handle!(
    /// Primary command buffer
    CommandBufferHandle
);
