use log::{info, warn};
use nalgebra::{Point3, Vector3};
use rand::{thread_rng, Rng};
use web_time::Instant;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::window::Window;

use crate::context::Context;
use crate::tracer::gpu::{GpuBackend, SetupError};
use crate::tracer::scene::{Material, Scene};
use crate::tracer::{Settings, Tracer};
use crate::util::random_vec;

pub struct Application {
    // surface가 window를 참조하니 context가 먼저 drop 되어야 함. 필드 순서 바꾸지 말 것!
    context: Context<GpuBackend>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    last_frame: Instant,
}

impl Application {
    pub async fn new(window: Window, settings: Settings) -> Result<Self, SetupError> {
        let mut backend = GpuBackend::new(&window).await?;

        let mut scene = Scene::with_default_layout();
        if let Some(path) = &settings.ground_texture {
            // 텍스쳐가 없어도 그림은 그려야 하니 경고만
            match backend.load_texture(path).await {
                Ok(handle) => scene.set_ground_texture(Some(handle)),
                Err(error) => warn!("바닥 텍스쳐를 불러오지 못함 ({}): {}", path.display(), error),
            }
        }

        let tracer = Tracer::new(backend, window.inner_size(), settings);
        let context = Context::new(tracer, scene);
        info!("초기화 완료: {:?}", window.inner_size());

        Ok(Self {
            context,
            window,
            last_frame: Instant::now(),
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.tracer().viewport()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    // true: 앱에서 입력 처리를 했으니 따로 관리할 필요 없음
    // false: 아래 event loop에서 처리 해야 함.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        if let WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(key),
                    ..
                },
            ..
        } = event
        {
            match key {
                VirtualKeyCode::Delete | VirtualKeyCode::Back => {
                    self.context.clear_scene();
                    return true;
                }
                VirtualKeyCode::R => {
                    self.context.restore_default_scene();
                    return true;
                }
                VirtualKeyCode::N => {
                    self.add_random_sphere();
                    return true;
                }
                _ => {}
            }
        }

        self.context.input(event)
    }

    fn add_random_sphere(&mut self) {
        let mut rng = thread_rng();
        let offset = random_vec(&mut rng, -2.0..2.0f32);
        let center = Point3::new(offset.x, rng.gen_range(0.0..1.0), offset.z - 2.0);
        let color: Vector3<f32> = random_vec(&mut rng, 0.0..1.0f32);
        let material = Material::try_from(rng.gen_range(0..4)).unwrap_or_default();

        if !self.context.add_sphere(center, rng.gen_range(0.1..0.5), color, material) {
            info!("구가 이미 꽉 차서 추가하지 않음");
        }
    }

    pub fn update(&mut self) -> Result<(), SurfaceError> {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;

        self.context.frame(frame_time)
    }
}
