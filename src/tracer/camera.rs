use nalgebra::{Point3, Vector3};

/// 화면 위 임의의 (s, t) ∈ [0, 1]² 좌표에서 광선 방향을 구할 수 있는 카메라 기저.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayBasis {
    pub origin: Point3<f32>,
    pub lower_left_corner: Point3<f32>,
    pub horizontal: Vector3<f32>,
    pub vertical: Vector3<f32>,
}

/// lookfrom/lookat 방식의 오른손 좌표계 카메라 기저를 만듦.
///
/// `up`이 `eye - target`과 평행하면 외적이 0벡터가 되어 결과는 NaN이 됨.
/// 검사하지 않으니 호출하는 쪽에서 피할 것.
pub fn build_basis(
    eye: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    vertical_fov_degrees: f32,
    aspect: f32,
) -> RayBasis {
    let theta = vertical_fov_degrees.to_radians();
    let half_height = (theta / 2.0).tan();
    let half_width = aspect * half_height;

    // w는 시선 반대 방향, u는 오른쪽, v는 위쪽
    let w = (eye - target).normalize();
    let u = up.cross(&w).normalize();
    let v = w.cross(&u);

    RayBasis {
        origin: eye,
        lower_left_corner: eye - u * half_width - v * half_height - w,
        horizontal: u * (2.0 * half_width),
        vertical: v * (2.0 * half_height),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    // 쉐이더가 하는 계산과 같음. (0, 0)이 왼쪽 아래
    fn direction(basis: &RayBasis, s: f32, t: f32) -> Vector3<f32> {
        let target = basis.lower_left_corner + basis.horizontal * s + basis.vertical * t;
        (target - basis.origin).normalize()
    }

    fn sample_basis() -> RayBasis {
        build_basis(
            Point3::new(1.0, 2.0, 3.0),
            Point3::new(0.0, 0.3, -1.0),
            Vector3::y(),
            75.0,
            16.0 / 9.0,
        )
    }

    #[test]
    fn axes_are_orthonormal() {
        let basis = sample_basis();
        let u = basis.horizontal.normalize();
        let v = basis.vertical.normalize();
        let w = -direction(&basis, 0.5, 0.5);

        assert_relative_eq!(u.dot(&v), 0.0, epsilon = 1e-5);
        assert_relative_eq!(u.dot(&w), 0.0, epsilon = 1e-5);
        assert_relative_eq!(v.dot(&w), 0.0, epsilon = 1e-5);
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn spans_follow_fov_and_aspect() {
        let basis = build_basis(Point3::new(0.0, 0.0, 1.0), Point3::origin(), Vector3::y(), 90.0, 2.0);

        // tan(45°) = 1
        assert_relative_eq!(basis.vertical, Vector3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(basis.horizontal, Vector3::new(4.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(basis.lower_left_corner, Point3::new(-2.0, -1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn corners_reconstruct_frustum() {
        let eye = Point3::new(0.0, 0.0, 1.0);
        let basis = build_basis(eye, Point3::origin(), Vector3::y(), 90.0, 1.0);

        let top_right = basis.lower_left_corner + basis.horizontal + basis.vertical;
        assert_relative_eq!(top_right, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-5);

        // 화면 중앙 광선은 target을 향함
        let center = direction(&basis, 0.5, 0.5);
        assert_relative_eq!(center, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(eye + center, Point3::origin(), epsilon = 1e-5);
    }

    #[test]
    fn parallel_up_vector_is_undefined() {
        // 전제 조건 위반. 복구하지 않고 NaN이 그대로 나옴.
        let basis = build_basis(Point3::new(0.0, 5.0, 0.0), Point3::origin(), Vector3::y(), 75.0, 1.0);
        assert!(basis.horizontal.iter().any(|c| c.is_nan()));
    }
}
