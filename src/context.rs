use nalgebra::{Point3, Vector3};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;

use crate::camera::OrbitCamera;
use crate::tracer::scene::{Color, Material, PrimitiveKind, Scene, TextureHandle};
use crate::tracer::{RenderBackend, Tracer};

/// 장면, 카메라, 누적 상태를 한곳에 모아 둔 것.
///
/// 바깥(입력 처리)에서는 이걸 통해서만 상태를 바꿀 수 있고, 바뀐 게 있으면 여기서
/// 알아서 누적을 초기화함.
pub struct Context<B: RenderBackend> {
    scene: Scene,
    camera: OrbitCamera,
    tracer: Tracer<B>,
}

impl<B: RenderBackend> Context<B> {
    pub fn new(mut tracer: Tracer<B>, scene: Scene) -> Self {
        let camera = OrbitCamera::new(tracer.settings.camera.clone());
        tracer.sync_scene(&scene);

        Self {
            scene,
            camera,
            tracer,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn tracer(&self) -> &Tracer<B> {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tracer<B> {
        &mut self.tracer
    }

    // 장면을 고친 뒤 GPU에 올라갈 값이 달라졌으면 다시 올리고 초기화
    pub fn edit_scene<R>(&mut self, edit: impl FnOnce(&mut Scene) -> R) -> R {
        let result = edit(&mut self.scene);
        self.tracer.sync_scene(&self.scene);
        result
    }

    pub fn add_sphere(&mut self, center: Point3<f32>, radius: f32, color: Color, material: Material) -> bool {
        self.edit_scene(|scene| scene.add_sphere(center, radius, color, material))
    }

    pub fn add_cuboid(&mut self, center: Point3<f32>, size: Vector3<f32>, color: Color, material: Material) -> bool {
        self.edit_scene(|scene| scene.add_cuboid(center, size, color, material))
    }

    pub fn add_triangle(
        &mut self,
        vertices: [Point3<f32>; 3],
        color: Color,
        material: Material,
    ) -> bool {
        let [v0, v1, v2] = vertices;
        self.edit_scene(|scene| scene.add_triangle(v0, v1, v2, color, material))
    }

    pub fn remove(&mut self, kind: PrimitiveKind, index: usize) -> bool {
        self.edit_scene(|scene| scene.remove(kind, index))
    }

    pub fn clear_scene(&mut self) {
        self.edit_scene(Scene::clear)
    }

    pub fn restore_default_scene(&mut self) {
        self.edit_scene(Scene::populate_default)
    }

    pub fn set_ground_texture(&mut self, texture: Option<TextureHandle>) {
        self.edit_scene(|scene| scene.set_ground_texture(texture))
    }

    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) -> bool {
        let moved = self.camera.orbit(delta_x, delta_y);
        if moved {
            self.tracer.reset();
        }
        moved
    }

    pub fn zoom(&mut self, steps: f32) -> bool {
        let moved = self.camera.zoom(steps);
        if moved {
            self.tracer.reset();
        }
        moved
    }

    // true면 카메라가 움직여서 초기화했다는 뜻
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let moved = self.camera.input(event);
        if moved {
            self.tracer.reset();
        }
        moved
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.tracer.resize(new_size);
    }

    // 한 프레임 진행. frame_time은 ms
    pub fn frame(&mut self, frame_time: f32) -> Result<(), B::Error> {
        if self.camera.update(frame_time) {
            self.tracer.reset();
        }

        self.tracer.update(&self.camera)
    }
}
