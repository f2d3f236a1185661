use std::borrow::Cow;
use std::iter;
use std::path::Path;

use bytemuck::{bytes_of, Zeroable};
use log::{info, warn};
use thiserror::Error;
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{
    Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBindingType, BufferUsages, Color,
    ColorTargetState, ColorWrites, CommandEncoderDescriptor, CompositeAlphaMode, Device,
    DeviceDescriptor, Dx12Compiler, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, MultisampleState, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode,
    PrimitiveState, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, SamplerBindingType, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, Surface, SurfaceConfiguration, SurfaceError, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDescriptor, TextureViewDimension, VertexState,
};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::tracer::packer::PackedScene;
use crate::tracer::scene::TextureHandle;
use crate::tracer::texture::{self, Image, TextureError, ACCUMULATION_FORMAT};
use crate::tracer::uniforms::{FrameUniform, PresentUniform, SceneUniform};
use crate::tracer::RenderBackend;

// 두 쉐이더 모두 화면을 덮는 삼각형 하나를 그리는 같은 정점 쉐이더를 씀
const FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");
const PATH_TRACE_WGSL: &str = include_str!("../shaders/path_trace.wgsl");
const PRESENT_WGSL: &str = include_str!("../shaders/present.wgsl");

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("surface를 만들 수 없음: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("조건에 맞는 GPU 어댑터가 없음")]
    NoAdapter,
    #[error("GPU 장치 요청 실패: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface가 지원하는 텍스쳐 포맷이 없음")]
    NoSurfaceFormat,
}

pub struct GpuBackend {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,

    // 핑퐁 누적 버퍼. 매 프레임 latest를 읽고 다른 쪽에 (이전 합 + 새 샘플)을 씀
    accumulation: [Image; 2],
    latest: usize,
    // 바닥 텍스쳐가 없을 때 대신 묶어둘 1x1 흰색
    placeholder: Image,
    textures: Vec<Image>,
    bound_texture: Option<TextureHandle>,

    frame_buffer: Buffer,
    scene_buffer: Buffer,
    present_buffer: Buffer,

    trace_pipeline: RenderPipeline,
    trace_layout: BindGroupLayout,
    // [i]는 accumulation[i]를 읽음
    trace_bind_groups: [BindGroup; 2],

    present_pipeline: RenderPipeline,
    present_layout: BindGroupLayout,
    present_bind_groups: [BindGroup; 2],
}

impl GpuBackend {
    pub async fn new(window: &Window) -> Result<Self, SetupError> {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // 전달하는 window가 surface보다 오래 살아야 함. Application이 둘 다 들고 있음.
        let surface = unsafe { instance.create_surface(window) }?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance, // 경로 추적은 무거우니 고성능 GPU
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(SetupError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: if cfg!(target_arch = "wasm32") {
                        // 브라우저가 아직 webgpu를 제대로 지원 안하니 webgl2 기준 채택
                        Limits::downlevel_webgl2_defaults()
                    } else {
                        Limits::default()
                    },
                    label: Some("Glowtrace GPU"),
                },
                None,
            )
            .await?;
        info!("GPU 어댑터: {:?}", adapter.get_info());

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = choose_surface_format(&capabilities.formats)?;
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let viewport = PhysicalSize::new(config.width, config.height);
        let accumulation = [
            Image::accumulation(&device, viewport, "Accumulation A"),
            Image::accumulation(&device, viewport, "Accumulation B"),
        ];
        let mut placeholder = Image::new(&device, 1, 1, "Ground placeholder");
        placeholder.load_image(&queue, &[0xFF; 4]);

        let frame_buffer = uniform_buffer(&device, "Frame uniform", bytes_of(&FrameUniform::zeroed()));
        let scene_buffer = uniform_buffer(&device, "Scene uniform", bytes_of(&SceneUniform::zeroed()));
        let present_buffer = uniform_buffer(&device, "Present uniform", bytes_of(&PresentUniform::new(1)));

        let trace_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Path trace layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                texture_entry(2, true),
                sampler_entry(3),
                // 32비트 float는 필터링이 안되니 textureLoad로만 읽음
                texture_entry(4, false),
            ],
        });
        let present_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Present layout"),
            entries: &[uniform_entry(0), texture_entry(1, false)],
        });

        // 1번 패스: 이전 합 + 새 샘플을 다른 버퍼에 씀. Rgba32Float는 블렌딩이 안되니 덮어쓰기
        let trace_pipeline = create_pipeline(
            &device,
            "Path trace",
            PATH_TRACE_WGSL,
            &trace_layout,
            ColorTargetState {
                format: ACCUMULATION_FORMAT,
                blend: None,
                write_mask: ColorWrites::ALL,
            },
        );

        // 2번 패스: 누적 버퍼 / 샘플 수
        let present_pipeline = create_pipeline(
            &device,
            "Present",
            PRESENT_WGSL,
            &present_layout,
            ColorTargetState {
                format: surface_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            },
        );

        let trace_bind_groups = [0, 1].map(|i| {
            trace_bind_group(&device, &trace_layout, &frame_buffer, &scene_buffer, &placeholder, &accumulation[i])
        });
        let present_bind_groups =
            [0, 1].map(|i| present_bind_group(&device, &present_layout, &present_buffer, &accumulation[i]));

        Ok(Self {
            surface,
            device,
            queue,
            config,
            accumulation,
            latest: 0,
            placeholder,
            textures: vec![],
            bound_texture: None,
            frame_buffer,
            scene_buffer,
            present_buffer,
            trace_pipeline,
            trace_layout,
            trace_bind_groups,
            present_pipeline,
            present_layout,
            present_bind_groups,
        })
    }

    /// 텍스쳐를 올리고 장면에 넣을 수 있는 핸들을 돌려줌.
    ///
    /// 네이티브에선 파일을, wasm에선 같은 경로를 fetch로 읽음.
    pub async fn load_texture<P: AsRef<Path>>(&mut self, path: P) -> Result<TextureHandle, TextureError> {
        let (rgba, label) = texture::load(path.as_ref()).await?;
        let image = Image::from_rgba(&self.device, &self.queue, &rgba, &label);

        info!("텍스쳐 불러옴: {} ({:?})", image.name, image.size());
        self.textures.push(image);
        Ok(TextureHandle((self.textures.len() - 1) as u32))
    }

    fn texture(&self, handle: Option<TextureHandle>) -> Option<&Image> {
        handle.and_then(|TextureHandle(index)| self.textures.get(index as usize))
    }

    // 바닥 텍스쳐나 누적 버퍼가 바뀌면 그걸 가리키는 bind group도 새로
    fn rebuild_bind_groups(&mut self) {
        let ground = self.texture(self.bound_texture).unwrap_or(&self.placeholder);
        let trace = [0, 1].map(|i| {
            trace_bind_group(
                &self.device,
                &self.trace_layout,
                &self.frame_buffer,
                &self.scene_buffer,
                ground,
                &self.accumulation[i],
            )
        });
        let present = [0, 1].map(|i| {
            present_bind_group(&self.device, &self.present_layout, &self.present_buffer, &self.accumulation[i])
        });

        self.trace_bind_groups = trace;
        self.present_bind_groups = present;
    }
}

impl RenderBackend for GpuBackend {
    type Error = SurfaceError;

    fn clear_accumulation(&mut self) {
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Clear encoder"),
        });

        // 아무것도 안 그리고 Clear만 하는 패스. 다음에 어느 쪽을 읽든 0이 되도록 둘 다
        for target in &self.accumulation {
            encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Clear accumulation"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::TRANSPARENT),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
        }

        self.queue.submit(iter::once(encoder.finish()));
    }

    fn upload_scene(&mut self, scene: &PackedScene) {
        let mut uniform = SceneUniform::from(scene);

        let texture = scene
            .ground_texture
            .filter(|&handle| self.texture(Some(handle)).is_some());
        if scene.ground_texture.is_some() && texture.is_none() {
            // 모르는 핸들은 텍스쳐 없음으로 취급
            warn!("등록되지 않은 텍스쳐 핸들: {:?}", scene.ground_texture);
            uniform.ground.has_texture = 0;
        }

        self.queue.write_buffer(&self.scene_buffer, 0, bytes_of(&uniform));

        if texture != self.bound_texture {
            self.bound_texture = texture;
            self.rebuild_bind_groups();
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        for target in &mut self.accumulation {
            target.resize(&self.device, new_size);
        }
        self.rebuild_bind_groups();
    }

    fn draw(&mut self, frame: &FrameUniform, present: &PresentUniform) -> Result<(), Self::Error> {
        let output = self.surface.get_current_texture()?; // 렌더링 결과를 출력할 곳
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        self.queue.write_buffer(&self.frame_buffer, 0, bytes_of(frame));
        self.queue.write_buffer(&self.present_buffer, 0, bytes_of(present));

        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Frame encoder"),
        });

        let previous = self.latest;
        let next = swap_target(previous);

        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Path trace pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &self.accumulation[next].view,
                    resolve_target: None,
                    ops: Operations {
                        // 모든 픽셀을 덮어쓰니 불러올 필요 없음
                        load: LoadOp::Clear(Color::TRANSPARENT),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.trace_pipeline);
            pass.set_bind_group(0, &self.trace_bind_groups[previous], &[]);
            pass.draw(0..3, 0..1);
        }

        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Present pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            pass.set_pipeline(&self.present_pipeline);
            pass.set_bind_group(0, &self.present_bind_groups[next], &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        self.latest = next;

        Ok(())
    }
}

fn swap_target(latest: usize) -> usize {
    1 - latest
}

// sRGB 말고 다른거 쓰면 의도한 것보다 밝기에서 차이가 날 수 있음.
fn choose_surface_format(formats: &[TextureFormat]) -> Result<TextureFormat, SetupError> {
    formats
        .iter()
        .find(|format| format.is_srgb())
        .or_else(|| formats.first())
        .copied()
        .ok_or(SetupError::NoSurfaceFormat)
}

fn uniform_buffer(device: &Device, label: &str, contents: &[u8]) -> Buffer {
    device.create_buffer_init(&BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    })
}

fn uniform_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            multisampled: false,
            view_dimension: TextureViewDimension::D2,
            sample_type: TextureSampleType::Float { filterable },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
        count: None,
    }
}
fn create_pipeline(
    device: &Device,
    label: &str,
    fragment_source: &str,
    layout: &BindGroupLayout,
    target: ColorTargetState,
) -> RenderPipeline {
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(Cow::Owned(format!("{}\n{}", FULLSCREEN_WGSL, fragment_source))),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &module,
            entry_point: "vs_main",
            buffers: &[], // 정점은 vertex_index로 쉐이더에서 만듦
        },
        fragment: Some(FragmentState {
            module: &module,
            entry_point: "fs_main",
            targets: &[Some(target)],
        }),
        primitive: PrimitiveState::default(),
        depth_stencil: None,
        multisample: MultisampleState::default(),
        multiview: None,
    })
}

fn trace_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    frame: &Buffer,
    scene: &Buffer,
    ground: &Image,
    previous: &Image,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Path trace bind group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: frame.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: scene.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: BindingResource::TextureView(&ground.view),
            },
            BindGroupEntry {
                binding: 3,
                resource: BindingResource::Sampler(&ground.sampler),
            },
            BindGroupEntry {
                binding: 4,
                resource: BindingResource::TextureView(&previous.view),
            },
        ],
    })
}

fn present_bind_group(device: &Device, layout: &BindGroupLayout, present: &Buffer, sum: &Image) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Present bind group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: present.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::TextureView(&sum.view),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulation_is_full_precision_float() {
        // 16비트면 합이 2048 근처에서 더 이상 늘지 않아 화면이 점점 어두워짐
        assert_eq!(ACCUMULATION_FORMAT, TextureFormat::Rgba32Float);
    }

    // 1번 패스가 하는 일(이전 합 + 샘플)을 f32로 그대로 따라 해 봄.
    #[test]
    fn long_accumulation_keeps_the_average() {
        for sample in [0.75f32, 0.1, 3.7] {
            let mut sum = 0.0f32;
            for count in 1..=100_000u32 {
                sum += sample;
                if count % 10_000 == 0 {
                    let presented = sum / count as f32;
                    assert!(
                        ((presented - sample) / sample).abs() < 1e-2,
                        "샘플 {} 평균이 {}번째에 {}",
                        sample,
                        count,
                        presented
                    );
                }
            }
        }
    }

    #[test]
    fn targets_alternate() {
        assert_eq!(swap_target(0), 1);
        assert_eq!(swap_target(swap_target(0)), 0);
    }

    #[test]
    fn surface_format_prefers_srgb() {
        let formats = [TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats).unwrap(), TextureFormat::Bgra8UnormSrgb);
        assert_eq!(
            choose_surface_format(&[TextureFormat::Rgba16Float]).unwrap(),
            TextureFormat::Rgba16Float
        );
        assert!(matches!(choose_surface_format(&[]), Err(SetupError::NoSurfaceFormat)));
    }
}
