use image::RgbaImage;

use crate::render::{RenderCtx, RenderTarget};

use super::common::{
    alpha_blend, create_rgba_texture, nearest_sampler, texture_layout_entries,
    triangle_list_primitive, write_rgba,
};

/// Draws a CPU canvas as a full-canvas layer.
///
/// Each frame the image is uploaded to a texture (reallocated when the canvas
/// size changes) and drawn with `source-over` blending onto the target.
pub struct CanvasCompositor {
    label: &'static str,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,

    texture: Option<wgpu::Texture>,
    texture_size: (u32, u32),
    bind_group: Option<wgpu::BindGroup>,
}

impl CanvasCompositor {
    /// `label` names the layer in GPU debug labels (`"main"`, `"overlay"`).
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            pipeline_format: None,
            pipeline: None,
            bind_group_layout: None,
            sampler: None,
            texture: None,
            texture_size: (0, 0),
            bind_group: None,
        }
    }

    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, image: &RgbaImage) {
        self.ensure_pipeline(ctx);
        self.ensure_texture(ctx, image.dimensions());

        let Some(texture) = self.texture.as_ref() else { return };
        write_rgba(ctx.queue, texture, image);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };

        let mut rpass = target.load_pass("brick canvas layer pass");
        ctx.set_present_viewport(&mut rpass);
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("brick canvas shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/canvas.wgsl").into()),
        });

        let bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("brick canvas bgl"),
                entries: &texture_layout_entries(0),
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("brick canvas pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("brick canvas pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: triangle_list_primitive(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bgl);
        self.bind_group = None;
        self.texture = None;
    }

    fn ensure_texture(&mut self, ctx: &RenderCtx<'_>, size: (u32, u32)) {
        if self.texture.is_some() && self.bind_group.is_some() && self.texture_size == size {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let sampler = self
            .sampler
            .get_or_insert_with(|| nearest_sampler(ctx.device, "brick canvas sampler"));

        let texture = create_rgba_texture(ctx.device, self.label, size.0, size.1);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
        self.texture = Some(texture);
        self.texture_size = size;
        log::debug!("{} canvas texture {}x{}", self.label, size.0, size.1);
    }
}
