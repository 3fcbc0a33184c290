use std::sync::Arc;

// Use web-time for cross-platform time support (works on both desktop and web)
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use glam::Vec2;
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Cursor, CursorIcon, Fullscreen, Window},
};

use crate::board::{image_color, Sprite, TileBoard, TileState};
use crate::expansion::ExpansionEvent;
use crate::grid::Rect;
use crate::scene::Scene;
use crate::{strategy, Config, Error};

const WINDOW_TITLE: &str = "Infinigrid";

/// Pixels per wheel "line", matching what browsers report for one notch
const WHEEL_LINE_PIXELS: f32 = 100.0;

/// Title word markers drawn under the expanded tile
const TITLE_LINE_HEIGHT: f32 = 24.0;
const TITLE_CHAR_WIDTH: f32 = 9.0;
const TITLE_GAP: f32 = 12.0;

/// Nav label glyph blocks, anchored to the top-left corner
const NAV_MARGIN: f32 = 24.0;
const NAV_CHAR_WIDTH: f32 = 10.0;
const NAV_GLYPH_HEIGHT: f32 = 14.0;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.025,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    corner: [f32; 2],
}

impl Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

const VERTICES: &[Vertex] = &[
    Vertex { corner: [0.0, 0.0] }, // Top-left
    Vertex { corner: [1.0, 0.0] }, // Top-right
    Vertex { corner: [1.0, 1.0] }, // Bottom-right
    Vertex { corner: [0.0, 1.0] }, // Bottom-left
];

const INDICES: &[u16] = &[
    0, 1, 2,
    2, 3, 0,
];

/// One screen-space quad: rect in pixels (x, y, width, height) and a straight-alpha color
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadInstance {
    rect: [f32; 4],
    color: [f32; 4],
}

impl QuadInstance {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

impl From<Sprite> for QuadInstance {
    fn from(sprite: Sprite) -> Self {
        let Rect { x, y, width, height } = sprite.rect;
        Self {
            rect: [x, y, width, height],
            color: sprite.color,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct RenderParams {
    viewport: Vec2,
    _padding: Vec2,
}

/// Word markers for the title reveal, laid out centered under the expanded rect
fn title_sprites(scene: &Scene<TileBoard>, expanded: Rect, now_ms: f64) -> Vec<Sprite> {
    let Some(reveal) = scene.expansion().title_reveal() else {
        return Vec::new();
    };
    let widths: Vec<f32> = reveal
        .words()
        .iter()
        .map(|word| word.chars().count() as f32 * TITLE_CHAR_WIDTH)
        .collect();
    let total: f32 = widths.iter().sum::<f32>() + TITLE_GAP * widths.len().saturating_sub(1) as f32;

    let baseline = expanded.bottom() + TITLE_LINE_HEIGHT;
    let mut x = expanded.center().x - total / 2.0;
    let mut sprites = Vec::with_capacity(widths.len());
    for (width, offset) in widths.iter().zip(reveal.offsets(now_ms)) {
        // Words outside their line are masked, fading approximates the clip
        let alpha = (1.0 - offset.abs()).clamp(0.0, 1.0);
        if alpha > 0.0 {
            sprites.push(Sprite {
                rect: Rect::new(x, baseline + offset * TITLE_LINE_HEIGHT, *width, 4.0),
                color: [0.92, 0.92, 0.9, alpha],
            });
        }
        x += width + TITLE_GAP;
    }
    sprites
}

/// One block per nav character, risen and faded per its reveal state
fn nav_sprites(scene: &Scene<TileBoard>, now_ms: f64) -> Vec<Sprite> {
    scene
        .nav()
        .glyphs(now_ms)
        .iter()
        .enumerate()
        .filter(|(_, glyph)| !glyph.ch.is_whitespace() && glyph.opacity > 0.0)
        .map(|(slot, glyph)| Sprite {
            rect: Rect::new(
                NAV_MARGIN + slot as f32 * NAV_CHAR_WIDTH,
                NAV_MARGIN + glyph.rise * NAV_GLYPH_HEIGHT,
                NAV_CHAR_WIDTH - 2.0,
                NAV_GLYPH_HEIGHT,
            ),
            color: [0.92, 0.92, 0.9, glyph.opacity],
        })
        .collect()
}

pub struct RenderApp {
    config: Config,
    window: Option<Arc<Window>>,
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    surface: Option<wgpu::Surface<'static>>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    render_pipeline: Option<wgpu::RenderPipeline>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    // Gallery state, created once the window size is known
    scene: Option<Scene<TileBoard>>,
    started: Instant,
    cursor_position: Vec2,
    active_touch: Option<u64>,

    window_width: u32,
    window_height: u32,
}

impl RenderApp {
    pub async fn new(_event_loop: &EventLoop<()>, config: Config) -> Result<Self, Error> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", info.name, info.backend);

        #[cfg(target_arch = "wasm32")]
        let required_limits = wgpu::Limits::downlevel_webgl2_defaults();
        #[cfg(not(target_arch = "wasm32"))]
        let required_limits = wgpu::Limits::default();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                ..Default::default()
            })
            .await?;

        let window_width = config.width;
        let window_height = config.height;
        log::info!("Initial window size: {}x{} pixels", window_width, window_height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Tile Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/tiles.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        // Two quads per tile (placeholder + image) for a full window, grown on demand
        let instance_capacity = 256;
        let instance_buffer = Self::create_instance_buffer(&device, instance_capacity);

        let params = RenderParams {
            viewport: Vec2::new(window_width as f32, window_height as f32),
            _padding: Vec2::ZERO,
        };
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Params Buffer"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            config,
            window: None,
            instance,
            adapter,
            surface: None,
            device,
            queue,
            surface_config: None,
            shader,
            pipeline_layout,
            render_pipeline: None,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            instance_capacity,
            params_buffer,
            bind_group,
            scene: None,
            started: Instant::now(),
            cursor_position: Vec2::new(window_width as f32 / 2.0, window_height as f32 / 2.0),
            active_touch: None,
            window_width,
            window_height,
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Instance Buffer"),
            size: (capacity * std::mem::size_of::<QuadInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_pipeline(&self, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc(), QuadInstance::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn viewport(&self) -> Vec2 {
        Vec2::new(self.window_width as f32, self.window_height as f32)
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let mut window_attributes = Window::default_attributes().with_title(WINDOW_TITLE);

        // On desktop, set the window size. On web, don't - let it use the canvas's existing size
        #[cfg(not(target_arch = "wasm32"))]
        {
            window_attributes = window_attributes.with_inner_size(winit::dpi::PhysicalSize::new(
                self.window_width,
                self.window_height,
            ));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            window_attributes = match crate::web::gallery_canvas() {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => {
                    log::warn!("No #{} element found, appending a new canvas", crate::web::CANVAS_ID);
                    window_attributes.with_append(true)
                }
            };
        }

        // Set fullscreen if requested (desktop only)
        #[cfg(not(target_arch = "wasm32"))]
        if self.config.fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);

        // Update actual window dimensions (may differ from requested if fullscreen)
        let actual_size = window.inner_size();
        if actual_size.width > 0 && actual_size.height > 0 {
            self.window_width = actual_size.width;
            self.window_height = actual_size.height;
        } else {
            log::warn!(
                "Window reported size {}x{}, using config dimensions {}x{}",
                actual_size.width,
                actual_size.height,
                self.window_width,
                self.window_height
            );
        }

        let surface = self.instance.create_surface(window.clone())?;
        let surface_caps = surface.get_capabilities(&self.adapter);

        // On web, prefer Bgra8Unorm for compatibility. On desktop, prefer sRGB.
        #[cfg(target_arch = "wasm32")]
        let preferred = surface_caps
            .formats
            .iter()
            .find(|f| **f == wgpu::TextureFormat::Bgra8Unorm)
            .copied();
        #[cfg(not(target_arch = "wasm32"))]
        let preferred = surface_caps.formats.iter().find(|f| f.is_srgb()).copied();

        let surface_format = preferred
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: self.window_width,
            height: self.window_height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&self.device, &config);

        self.render_pipeline = Some(self.create_pipeline(surface_format));
        self.window = Some(window);
        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.write_params();

        #[cfg(target_arch = "wasm32")]
        let reduced_motion = crate::web::prefers_reduced_motion();
        #[cfg(not(target_arch = "wasm32"))]
        let reduced_motion = false;

        let choreography = strategy::select(self.config.animations, reduced_motion);
        let now = self.now_ms();
        self.scene = Some(Scene::new(
            &self.config,
            choreography,
            TileBoard::new(),
            self.viewport(),
            now,
        ));
        Ok(())
    }

    fn write_params(&self) {
        let params = RenderParams {
            viewport: self.viewport(),
            _padding: Vec2::ZERO,
        };
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[params]));
    }

    pub fn recenter(&mut self) {
        log::info!("Recentering camera");
        if let Some(scene) = self.scene.as_mut() {
            scene.recenter();
        }
    }

    /// Advance the scene by one frame and react to expansion events
    fn update(&mut self) {
        let now = self.now_ms();
        let Some(scene) = self.scene.as_mut() else {
            return;
        };

        let report = scene.frame(now);
        if let Some(event) = report.expansion {
            let title = match (event, scene.expansion().title()) {
                (ExpansionEvent::Ended(_), _) | (_, None) => WINDOW_TITLE.to_string(),
                (_, Some(title)) => format!("{} | {}", WINDOW_TITLE, title),
            };
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
        }

        #[cfg(target_arch = "wasm32")]
        crate::web::publish_camera(scene.motion().camera().current);
    }

    fn collect_quads(&self, now_ms: f64) -> Vec<QuadInstance> {
        let Some(scene) = self.scene.as_ref() else {
            return Vec::new();
        };

        let mut sprites = scene.presenter().sprites(scene.screen_origin(), now_ms);
        if let Some(rect) = scene.expansion().current_rect(now_ms) {
            let index = scene.expansion().image_index().unwrap_or(1);
            let [r, g, b] = image_color(index);
            sprites.push(Sprite {
                rect,
                color: [r, g, b, 1.0],
            });
            sprites.extend(title_sprites(scene, rect, now_ms));
        }
        sprites.extend(nav_sprites(scene, now_ms));
        sprites.into_iter().map(QuadInstance::from).collect()
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (Some(surface), Some(pipeline)) = (self.surface.as_ref(), self.render_pipeline.as_ref()) else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let quads = self.collect_quads(self.now_ms());
        if quads.len() > self.instance_capacity {
            self.instance_capacity = quads.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(&self.device, self.instance_capacity);
            log::debug!("Grew instance buffer to {} quads", self.instance_capacity);
        }
        if !quads.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&quads));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !quads.is_empty() {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..INDICES.len() as u32, 0, 0..quads.len() as u32);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn reconfigure_surface(&mut self, width: u32, height: u32) {
        if let (Some(config), Some(surface)) = (self.surface_config.as_mut(), self.surface.as_ref()) {
            config.width = width.max(1);
            config.height = height.max(1);
            surface.configure(&self.device, config);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, keycode: KeyCode) {
        match keycode {
            KeyCode::F11 => {
                if let Some(window) = &self.window {
                    let is_fullscreen = window.fullscreen().is_some();
                    window.set_fullscreen(if is_fullscreen {
                        None
                    } else {
                        Some(Fullscreen::Borderless(None))
                    });
                }
            }
            KeyCode::Escape => {
                // Collapse first, then leave fullscreen, then exit
                let now = self.now_ms();
                if self.scene.as_mut().is_some_and(|scene| scene.dismiss(now)) {
                    return;
                }
                if let Some(window) = &self.window {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                    } else {
                        log::info!("Escape pressed, exiting...");
                        event_loop.exit();
                    }
                }
            }
            KeyCode::Digit0 | KeyCode::Numpad0 => self.recenter(),
            _ => {}
        }
    }
}

impl Drop for RenderApp {
    fn drop(&mut self) {
        // Drop GPU-side state before the surface, and the surface before the window
        self.render_pipeline = None;
        self.surface_config = None;
        if let Some(surface) = self.surface.take() {
            drop(surface);
        }
        self.window = None;
    }
}

impl ApplicationHandler for RenderApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_window(event_loop) {
                log::error!("Failed to initialize window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let now = self.now_ms();
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                // Check if a recenter was requested from JavaScript
                #[cfg(target_arch = "wasm32")]
                if crate::web::take_recenter_request() {
                    self.recenter();
                }

                self.update();
                match self.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        if let Some(window) = &self.window {
                            let size = window.inner_size();
                            self.reconfigure_surface(size.width, size.height);
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    self.reconfigure_surface(physical_size.width, physical_size.height);
                    self.window_width = physical_size.width;
                    self.window_height = physical_size.height;
                    self.write_params();
                    let viewport = self.viewport();
                    if let Some(scene) = self.scene.as_mut() {
                        scene.resize(viewport, now);
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports content motion, the scene expects scroll distance
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(-x * WHEEL_LINE_PIXELS, -y * WHEEL_LINE_PIXELS),
                    MouseScrollDelta::PixelDelta(pos) => Vec2::new(-pos.x as f32, -pos.y as f32),
                };
                if let Some(scene) = self.scene.as_mut() {
                    scene.wheel(delta);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_position = Vec2::new(position.x as f32, position.y as f32);
                let cursor = self.cursor_position;
                if let Some(scene) = self.scene.as_mut() {
                    scene.pointer_move(cursor, now);
                    if !scene.motion().is_dragging() {
                        let hovered = scene
                            .hovered()
                            .and_then(|address| scene.virtualizer().handle(address))
                            .and_then(|id| scene.presenter().state(*id, now));
                        let icon = match hovered {
                            Some(TileState::Hovered) => CursorIcon::Pointer,
                            _ => CursorIcon::Default,
                        };
                        if let Some(window) = &self.window {
                            window.set_cursor(Cursor::Icon(icon));
                        }
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.pointer_left(now);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let cursor = self.cursor_position;
                let icon = match state {
                    ElementState::Pressed => CursorIcon::Grabbing,
                    ElementState::Released => CursorIcon::Default,
                };
                if let Some(window) = &self.window {
                    window.set_cursor(Cursor::Icon(icon));
                }
                if let Some(scene) = self.scene.as_mut() {
                    match state {
                        ElementState::Pressed => scene.pointer_down(cursor, now),
                        ElementState::Released => {
                            scene.pointer_up(cursor, now);
                        }
                    }
                }
            }
            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                let Some(scene) = self.scene.as_mut() else {
                    return;
                };
                // Only the first finger drives the canvas
                match touch.phase {
                    TouchPhase::Started if self.active_touch.is_none() => {
                        self.active_touch = Some(touch.id);
                        scene.touch_start(position, now);
                    }
                    TouchPhase::Moved if self.active_touch == Some(touch.id) => {
                        scene.touch_move(position, now);
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled if self.active_touch == Some(touch.id) => {
                        self.active_touch = None;
                        scene.touch_end(position, now);
                    }
                    _ => {}
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(keycode) = event.physical_key {
                        self.handle_key(event_loop, keycode);
                    }
                }
            }
            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
