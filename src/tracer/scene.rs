use log::warn;
use nalgebra::{Point3, Vector2, Vector3};

/// 쉐이더에 선언된 배열 크기. 구, 상자, 삼각형이 같은 상한을 공유함.
pub const MAX_OBJECTS: usize = 20;

// 1.0보다 큰 값은 발광 세기로 쓰임
pub type Color = Vector3<f32>;

// 쉐이더가 정수로 받아서 분기에 쓰는 값이니 순서 바꾸지 말 것
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Material {
    Metal = 0,
    #[default]
    Diffuse = 1,
    Light = 2,
    Glass = 3,
}

impl Material {
    pub fn as_index(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Material {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Material::Metal),
            1 => Ok(Material::Diffuse),
            2 => Ok(Material::Light),
            3 => Ok(Material::Glass),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Sphere,
    Cuboid,
    Triangle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Point3<f32>,
    pub radius: f32,
    pub color: Color,
    pub material: Material,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Point3::origin(),
            radius: 1.0,
            color: Vector3::new(1.0, 1.0, 1.0),
            material: Material::Diffuse,
        }
    }
}

/// 축 정렬 상자. `size`는 축마다 다를 수 있는 전체 길이.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    pub center: Point3<f32>,
    pub size: Vector3<f32>,
    pub color: Color,
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
    pub color: Color,
    pub material: Material,
}

/// 외부 로더가 돌려준 텍스쳐를 가리키는 불투명한 값
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

#[derive(Debug, Clone, PartialEq)]
pub struct GroundPlane {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub color: Color,
    pub material: Material,
    pub texture: Option<TextureHandle>,
    pub texture_scale: f32,
    // (가로, 깊이)
    pub size: Vector2<f32>,
}

impl Default for GroundPlane {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, -0.5, 0.0),
            normal: Vector3::y(),
            color: Vector3::new(0.7, 0.7, 0.7),
            material: Material::Diffuse,
            texture: None,
            texture_scale: 1.0,
            size: Vector2::new(20.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
    cuboids: Vec<Cuboid>,
    triangles: Vec<Triangle>,
    pub ground: GroundPlane,
}

impl Scene {
    // 빈 장면. 바닥은 언제나 하나 있음.
    pub fn new() -> Self {
        Self {
            spheres: Vec::with_capacity(MAX_OBJECTS),
            cuboids: Vec::with_capacity(MAX_OBJECTS),
            triangles: Vec::with_capacity(MAX_OBJECTS),
            ground: GroundPlane::default(),
        }
    }

    // 시작할 때 보여줄 장면. 난수 없이 고정된 값만 써서 매번 같은 결과가 나와야 함.
    pub fn with_default_layout() -> Self {
        let mut scene = Self::new();
        scene.populate_default();
        scene
    }

    pub fn populate_default(&mut self) {
        self.clear();

        // 왼쪽 금색 피라미드
        self.add_pyramid(
            Point3::new(-5.0, 0.0, -5.0),
            1.2,
            1.8,
            Vector3::new(1.0, 215.0 / 255.0, 0.0),
            Material::Diffuse,
        );

        // 오른쪽 시에르핀스키 삼각형, 깊이 2 = 삼각형 9개
        self.add_sierpinski(
            Point3::new(5.0, 1.0, -6.84),
            2.0,
            Vector3::new(1.0, 0.84, 0.0),
            Material::Diffuse,
            2,
        );
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn cuboids(&self) -> &[Cuboid] {
        &self.cuboids
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Sphere => self.spheres.len(),
            PrimitiveKind::Cuboid => self.cuboids.len(),
            PrimitiveKind::Triangle => self.triangles.len(),
        }
    }

    pub fn is_full(&self, kind: PrimitiveKind) -> bool {
        self.len(kind) >= MAX_OBJECTS
    }

    // 꽉 찼으면 false, 장면은 그대로
    pub fn add_sphere(&mut self, center: Point3<f32>, radius: f32, color: Color, material: Material) -> bool {
        if self.is_full(PrimitiveKind::Sphere) {
            warn!("구는 최대 {}개까지만 넣을 수 있음", MAX_OBJECTS);
            return false;
        }

        self.spheres.push(Sphere {
            center,
            radius,
            color,
            material,
        });
        true
    }

    pub fn add_cuboid(&mut self, center: Point3<f32>, size: Vector3<f32>, color: Color, material: Material) -> bool {
        if self.is_full(PrimitiveKind::Cuboid) {
            warn!("상자는 최대 {}개까지만 넣을 수 있음", MAX_OBJECTS);
            return false;
        }

        self.cuboids.push(Cuboid {
            center,
            size,
            color,
            material,
        });
        true
    }

    pub fn add_triangle(
        &mut self,
        v0: Point3<f32>,
        v1: Point3<f32>,
        v2: Point3<f32>,
        color: Color,
        material: Material,
    ) -> bool {
        if self.is_full(PrimitiveKind::Triangle) {
            warn!("삼각형은 최대 {}개까지만 넣을 수 있음", MAX_OBJECTS);
            return false;
        }

        self.triangles.push(Triangle {
            vertices: [v0, v1, v2],
            color,
            material,
        });
        true
    }

    /// 밑면 두 장과 옆면 네 장으로 피라미드를 만듦.
    ///
    /// 자리가 모자라면 들어가는 만큼만 넣고, 실제로 추가된 삼각형 개수를 돌려줌.
    pub fn add_pyramid(
        &mut self,
        position: Point3<f32>,
        base: f32,
        height: f32,
        color: Color,
        material: Material,
    ) -> usize {
        let half = base / 2.0;
        let bottom = position.y - height / 2.0;

        let back_left = Point3::new(position.x - half, bottom, position.z - half);
        let back_right = Point3::new(position.x + half, bottom, position.z - half);
        let front_right = Point3::new(position.x + half, bottom, position.z + half);
        let front_left = Point3::new(position.x - half, bottom, position.z + half);
        let top = Point3::new(position.x, bottom + height, position.z);

        let faces = [
            // 밑면
            [back_left, back_right, front_right],
            [back_left, front_right, front_left],
            // 뒤, 오른쪽, 앞, 왼쪽
            [back_left, back_right, top],
            [back_right, front_right, top],
            [front_right, front_left, top],
            [front_left, back_left, top],
        ];

        faces
            .iter()
            .take_while(|[v0, v1, v2]| self.add_triangle(*v0, *v1, *v2, color, material))
            .count()
    }

    /// XY 평면 위의 정삼각형을 `depth`번 쪼갠 시에르핀스키 삼각형. 잎 삼각형은 최대 3^depth개.
    ///
    /// 배열이 다 차면 거기서 멈추고 추가된 개수만 돌려줌. 오류는 없음.
    pub fn add_sierpinski(
        &mut self,
        position: Point3<f32>,
        size: f32,
        color: Color,
        material: Material,
        depth: u32,
    ) -> usize {
        let half = size * 0.5;
        let height = size * 3f32.sqrt() / 2.0;

        let top = Point3::new(position.x, position.y + height / 3.0, position.z);
        let bottom_left = Point3::new(position.x - half, position.y - height * 2.0 / 3.0, position.z);
        let bottom_right = Point3::new(position.x + half, position.y - height * 2.0 / 3.0, position.z);

        self.subdivide(top, bottom_left, bottom_right, depth, color, material)
    }

    fn subdivide(
        &mut self,
        v0: Point3<f32>,
        v1: Point3<f32>,
        v2: Point3<f32>,
        depth: u32,
        color: Color,
        material: Material,
    ) -> usize {
        if self.is_full(PrimitiveKind::Triangle) {
            return 0;
        }

        if depth == 0 {
            return usize::from(self.add_triangle(v0, v1, v2, color, material));
        }

        let mid01 = nalgebra::center(&v0, &v1);
        let mid12 = nalgebra::center(&v1, &v2);
        let mid20 = nalgebra::center(&v2, &v0);

        self.subdivide(v0, mid01, mid20, depth - 1, color, material)
            + self.subdivide(mid01, v1, mid12, depth - 1, color, material)
            + self.subdivide(mid20, mid12, v2, depth - 1, color, material)
    }

    // 범위를 벗어나면 false. 뒤에 있던 원소들은 한 칸씩 앞으로 당겨짐.
    pub fn remove(&mut self, kind: PrimitiveKind, index: usize) -> bool {
        fn remove_from<T>(list: &mut Vec<T>, index: usize) -> bool {
            if index < list.len() {
                list.remove(index);
                true
            } else {
                false
            }
        }

        match kind {
            PrimitiveKind::Sphere => remove_from(&mut self.spheres, index),
            PrimitiveKind::Cuboid => remove_from(&mut self.cuboids, index),
            PrimitiveKind::Triangle => remove_from(&mut self.triangles, index),
        }
    }

    // 바닥은 건드리지 않음
    pub fn clear(&mut self) {
        self.spheres.clear();
        self.cuboids.clear();
        self.triangles.clear();
    }

    pub fn set_ground_texture(&mut self, texture: Option<TextureHandle>) {
        self.ground.texture = texture;
    }
}
