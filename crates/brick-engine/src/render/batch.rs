use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::draw::{BatchFrame, BatchVertex, RenderError, SheetId, TileSheets};
use crate::paint::BlendMode;
use crate::render::{RenderCtx, RenderTarget};

use super::common::{
    additive_blend, alpha_blend, create_rgba_texture, nearest_sampler, texture_layout_entries,
    triangle_list_primitive, viewport_uniform_layout_entry, write_rgba, ViewportUniform,
};

/// GPU copy of one tile sheet.
struct SheetTexture {
    generation: u64,
    bind_group: wgpu::BindGroup,
    // Kept alive for the bind group.
    _texture: wgpu::Texture,
}

/// Submits a [`BatchFrame`] through wgpu.
///
/// The whole frame's vertices are uploaded once; each [`Batch`](crate::draw::Batch)
/// becomes one draw call with its sheet texture and blend pipeline bound.
/// Resources are created lazily and rebuilt when the surface format changes.
#[derive(Default)]
pub struct GpuBatchRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    normal_pipeline: Option<wgpu::RenderPipeline>,
    additive_pipeline: Option<wgpu::RenderPipeline>,

    viewport_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    viewport_bind_group: Option<wgpu::BindGroup>,
    viewport_ubo: Option<wgpu::Buffer>,

    sampler: Option<wgpu::Sampler>,
    white: Option<SheetTexture>,
    sheets: HashMap<SheetId, SheetTexture>,

    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: usize,
}

impl GpuBatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `frame` over the current contents of `target`.
    ///
    /// Fails with [`RenderError::BackendUnavailable`] when GPU resources are
    /// missing after initialization.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        frame: BatchFrame<'_>,
        sheets: &TileSheets,
    ) -> Result<(), RenderError> {
        if frame.is_empty() {
            return Ok(());
        }

        self.ensure_pipelines(ctx);
        self.ensure_bindings(ctx);
        self.sync_sheets(ctx, sheets);

        self.write_viewport_uniform(ctx, frame);
        self.ensure_vertex_capacity(ctx, frame.vertices.len());

        let unavailable = |what: &str| RenderError::BackendUnavailable(format!("{what} missing"));
        let vbo = self.vertex_vbo.as_ref().ok_or_else(|| unavailable("vertex buffer"))?;
        ctx.queue
            .write_buffer(vbo, 0, bytemuck::cast_slice(frame.vertices));

        let normal = self.normal_pipeline.as_ref().ok_or_else(|| unavailable("pipeline"))?;
        let additive = self.additive_pipeline.as_ref().ok_or_else(|| unavailable("pipeline"))?;
        let viewport_bg = self
            .viewport_bind_group
            .as_ref()
            .ok_or_else(|| unavailable("viewport bind group"))?;
        let white = self.white.as_ref().ok_or_else(|| unavailable("white texture"))?;

        let mut rpass = target.load_pass("brick batch pass");
        ctx.set_present_viewport(&mut rpass);
        rpass.set_bind_group(0, viewport_bg, &[]);
        rpass.set_vertex_buffer(0, vbo.slice(..));

        for batch in frame.batches {
            rpass.set_pipeline(match batch.blend {
                BlendMode::Normal => normal,
                BlendMode::Additive => additive,
            });

            let texture = batch
                .texture
                .and_then(|id| self.sheets.get(&id))
                .unwrap_or(white);
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.draw(batch.vertices.clone(), 0..1);
        }

        Ok(())
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.normal_pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("brick tile shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tile.wgsl").into()),
        });

        let viewport_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("brick tile viewport bgl"),
                entries: &[viewport_uniform_layout_entry(0)],
            });

        let texture_bgl = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("brick tile sheet bgl"),
                entries: &texture_layout_entries(0),
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("brick tile pipeline layout"),
                bind_group_layouts: &[&viewport_bgl, &texture_bgl],
                immediate_size: 0,
            });

        let make = |label: &str, blend: wgpu::BlendState| {
            ctx.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[batch_vertex_layout()],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: ctx.surface_format,
                            blend: Some(blend),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: triangle_list_primitive(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                })
        };

        self.normal_pipeline = Some(make("brick tile pipeline (normal)", alpha_blend()));
        self.additive_pipeline = Some(make("brick tile pipeline (additive)", additive_blend()));
        self.pipeline_format = Some(ctx.surface_format);
        log::debug!("batch pipelines built for {:?}", ctx.surface_format);

        self.viewport_bgl = Some(viewport_bgl);
        self.texture_bgl = Some(texture_bgl);

        // Bind groups belong to the old layouts.
        self.viewport_bind_group = None;
        self.viewport_ubo = None;
        self.white = None;
        self.sheets.clear();
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_none() {
            self.sampler = Some(nearest_sampler(ctx.device, "brick tile sampler"));
        }

        if self.viewport_bind_group.is_none() {
            let Some(bgl) = self.viewport_bgl.as_ref() else { return };
            let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("brick tile viewport ubo"),
                size: std::mem::size_of::<ViewportUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.viewport_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("brick tile viewport bind group"),
                layout: bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: ubo.as_entire_binding(),
                }],
            }));
            self.viewport_ubo = Some(ubo);
        }

        if self.white.is_none() {
            let texture = ctx.device.create_texture_with_data(
                ctx.queue,
                &wgpu::TextureDescriptor {
                    label: Some("brick white texture"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &[255, 255, 255, 255],
            );
            self.white = self.sheet_texture(ctx, texture, 0);
        }
    }

    /// Uploads sheets that finished loading or changed since the last frame.
    fn sync_sheets(&mut self, ctx: &RenderCtx<'_>, sheets: &TileSheets) {
        for (id, sheet) in sheets.iter() {
            let Some(image) = sheet.image() else { continue };
            if self
                .sheets
                .get(&id)
                .is_some_and(|t| t.generation == sheet.generation())
            {
                continue;
            }

            let texture = create_rgba_texture(
                ctx.device,
                "brick tile sheet",
                image.width(),
                image.height(),
            );
            write_rgba(ctx.queue, &texture, image);

            if let Some(t) = self.sheet_texture(ctx, texture, sheet.generation()) {
                log::debug!("uploaded tile sheet {id:?} ({}x{})", image.width(), image.height());
                self.sheets.insert(id, t);
            }
        }
    }

    fn sheet_texture(
        &self,
        ctx: &RenderCtx<'_>,
        texture: wgpu::Texture,
        generation: u64,
    ) -> Option<SheetTexture> {
        let bgl = self.texture_bgl.as_ref()?;
        let sampler = self.sampler.as_ref()?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("brick tile sheet bind group"),
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
        });
        Some(SheetTexture {
            generation,
            bind_group,
            _texture: texture,
        })
    }

    fn write_viewport_uniform(&mut self, ctx: &RenderCtx<'_>, frame: BatchFrame<'_>) {
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        let u = ViewportUniform {
            viewport: [frame.canvas.width.max(1.0), frame.canvas.height.max(1.0)],
            _pad: [0.0; 2],
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.vertex_capacity && self.vertex_vbo.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(6 * 256);
        self.vertex_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("brick tile vbo"),
            size: (new_cap * std::mem::size_of::<BatchVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.vertex_capacity = new_cap;
    }
}

const BATCH_VERTEX_ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x2, // pos
    1 => Float32x2, // uv
    2 => Unorm8x4,  // color
    3 => Unorm8x4,  // additive
    4 => Uint32     // textured
];

fn batch_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BatchVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &BATCH_VERTEX_ATTRS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<BatchVertex>(), 28);
        let offsets: Vec<u64> = BATCH_VERTEX_ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 8, 16, 20, 24]);
    }
}
