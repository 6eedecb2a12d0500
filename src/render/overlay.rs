//! egui overlay drawn on top of the composite.

use crate::render::surface::SurfaceSize;

/// One frame of tessellated UI, produced by the host after running egui.
pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Records egui paint jobs into the frame's command encoder.
pub struct Overlay {
    renderer: egui_wgpu::Renderer,
    pending: Option<OverlayFrame>,
}

impl Overlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, format, None, 1, false),
            pending: None,
        }
    }

    /// Queue a UI frame; replaces any frame not yet drawn.
    pub fn submit(&mut self, frame: OverlayFrame) {
        self.pending = Some(frame);
    }

    /// Draw the pending UI frame onto `view` with a load pass.
    ///
    /// Returns command buffers from egui paint callbacks; they must be
    /// submitted ahead of `encoder`.
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: SurfaceSize,
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(frame) = self.pending.take() else {
            return Vec::new();
        };

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: frame.pixels_per_point,
        };

        for (id, image_delta) in &frame.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let callbacks = self
            .renderer
            .update_buffers(device, queue, encoder, &frame.primitives, &screen);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            self.renderer.render(&mut render_pass, &frame.primitives, &screen);
        }

        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }

        callbacks
    }
}
