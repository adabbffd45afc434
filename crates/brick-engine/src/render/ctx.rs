use crate::coords::{Rect, Viewport};

/// Renderer-facing context (device/queue + surface format + canvas placement).
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    /// Canvas size in canvas pixels; raster coordinates are relative to it.
    pub canvas: Viewport,
    /// Where the canvas lands on the surface, in physical pixels.
    pub present: Rect,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        canvas: Viewport,
        present: Rect,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            canvas,
            present,
        }
    }

    /// Applies the canvas placement to `rpass`.
    pub(crate) fn set_present_viewport(&self, rpass: &mut wgpu::RenderPass<'_>) {
        let r = self.present;
        rpass.set_viewport(r.min.x, r.min.y, r.width().max(1.0), r.height().max(1.0), 0.0, 1.0);
    }
}

/// Target for drawing (encoder + color view).
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self { encoder, color_view }
    }

    /// Opens a pass that keeps the current contents.
    pub(crate) fn load_pass(&mut self, label: &str) -> wgpu::RenderPass<'_> {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// Canvas placement inside a surface: the largest centered rect with the
/// canvas aspect ratio.
pub fn fit_canvas(canvas: Viewport, surface: Viewport) -> Rect {
    if !canvas.is_valid() || !surface.is_valid() {
        return Rect::new(0.0, 0.0, surface.width.max(0.0), surface.height.max(0.0));
    }
    let scale = (surface.width / canvas.width).min(surface.height / canvas.height);
    let size = canvas.size().scale(scale);
    let min = (surface.size() - size).scale(0.5);
    Rect::from_min_max(min, min + size)
}
