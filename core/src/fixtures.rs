//! Shared synthetic cubes for the test modules.

use std::sync::Arc;

use ndarray::{Array2, ArrayD, IxDyn};

use crate::cube::{Cube, ExtraCoord};
use crate::wcs::linear::LinearWcs;
use crate::wcs::Wcs;

fn counting_data(shape: &[usize]) -> ArrayD<f64> {
    let len: usize = shape.iter().product();
    ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f64).collect()).unwrap()
}

/// 3-4-5 rotation coupling two pixel axes into a celestial pair.
fn celestial_block(pc: &mut Array2<f64>, first: usize) {
    pc[[first, first]] = 0.8;
    pc[[first, first + 1]] = -0.6;
    pc[[first + 1, first]] = 0.6;
    pc[[first + 1, first + 1]] = 0.8;
}

/// 3-D WCS in pixel order (wavelength, lat, lon) for a (lon 2, lat 3,
/// wavelength 4) array. Wavelength values are 1.02, 1.04, 1.06, 1.08 nm.
pub fn wcs_3d() -> Arc<dyn Wcs> {
    let mut pc = Array2::eye(3);
    celestial_block(&mut pc, 1);
    Arc::new(
        LinearWcs::with_pc(
            vec![4, 3, 2],
            vec![0.0; 3],
            vec![1.02e-9, 0.0, 1.0],
            vec![2e-11, 0.5, 0.4],
            pc,
            vec![
                "em.wl".into(),
                "custom:pos.helioprojective.lat".into(),
                "custom:pos.helioprojective.lon".into(),
            ],
            vec!["m".into(), "deg".into(), "deg".into()],
        )
        .unwrap(),
    )
}

pub fn cube_3d_bare() -> Cube {
    Cube::new(counting_data(&[2, 3, 4]), wcs_3d()).unwrap()
}

/// The full 3-D fixture: mask, uncertainty equal to the data, and extra
/// coordinates "time" (axis 0), "hello" (axis 1), "bye" (axis 2).
pub fn cube_3d() -> Cube {
    let data = counting_data(&[2, 3, 4]);
    let mask = data.mapv(|v| v > 0.0);
    cube_3d_bare()
        .with_mask(mask)
        .unwrap()
        .with_uncertainty(data)
        .unwrap()
        .with_extra_coord(
            "time",
            ExtraCoord::new(
                vec![0],
                ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.0, 60.0]).unwrap(),
                "s".into(),
                "time".into(),
            ),
        )
        .unwrap()
        .with_extra_coord(
            "hello",
            ExtraCoord::new(
                vec![1],
                ArrayD::from_shape_vec(IxDyn(&[3]), vec![1.0, 2.0, 3.0]).unwrap(),
                "".into(),
                "custom:hello".into(),
            ),
        )
        .unwrap()
        .with_extra_coord(
            "bye",
            ExtraCoord::new(
                vec![2],
                ArrayD::from_shape_vec(IxDyn(&[4]), vec![10.0, 20.0, 30.0, 40.0]).unwrap(),
                "m".into(),
                "custom:bye".into(),
            ),
        )
        .unwrap()
}

/// 4-D WCS in pixel order (time, wavelength, lat, lon) for a (lon 3, lat 4,
/// wavelength 5, time 4) array. Time runs 0.2–1.4 min in steps of 0.4.
pub fn wcs_4d() -> Arc<dyn Wcs> {
    let mut pc = Array2::eye(4);
    celestial_block(&mut pc, 2);
    Arc::new(
        LinearWcs::with_pc(
            vec![4, 5, 4, 3],
            vec![0.0; 4],
            vec![0.2, 2e-11, 0.0, 1.0],
            vec![0.4, 2e-11, 0.5, 0.4],
            pc,
            vec![
                "time".into(),
                "em.wl".into(),
                "custom:pos.helioprojective.lat".into(),
                "custom:pos.helioprojective.lon".into(),
            ],
            vec!["min".into(), "m".into(), "deg".into(), "deg".into()],
        )
        .unwrap(),
    )
}

/// The full 4-D fixture with an "exposure" extra coordinate on the time
/// axis.
pub fn cube_4d() -> Cube {
    let data = counting_data(&[3, 4, 5, 4]);
    let mask = data.mapv(|v| v > 0.0);
    Cube::new(data.clone(), wcs_4d())
        .unwrap()
        .with_mask(mask)
        .unwrap()
        .with_uncertainty(data)
        .unwrap()
        .with_extra_coord(
            "exposure",
            ExtraCoord::new(
                vec![3],
                ArrayD::from_shape_vec(IxDyn(&[4]), vec![0.0, 1.0, 2.0, 3.0]).unwrap(),
                "s".into(),
                "time".into(),
            ),
        )
        .unwrap()
}

/// Component-wise cube equality: data, mask, uncertainty, extra coordinates,
/// and the observable surface of the WCS.
pub fn assert_cubes_equal(left: &Cube, right: &Cube) {
    assert_eq!(left.data(), right.data());
    assert_eq!(left.mask(), right.mask());
    assert_eq!(left.uncertainty(), right.uncertainty());
    assert_eq!(left.extra_coords(), right.extra_coords());

    let (lw, rw) = (left.wcs(), right.wcs());
    assert_eq!(lw.pixel_n_dim(), rw.pixel_n_dim());
    assert_eq!(lw.world_n_dim(), rw.world_n_dim());
    assert_eq!(lw.pixel_shape(), rw.pixel_shape());
    assert_eq!(lw.axis_correlation_matrix(), rw.axis_correlation_matrix());
    assert_eq!(
        lw.world_axis_physical_types(),
        rw.world_axis_physical_types()
    );
    assert_eq!(lw.world_axis_units(), rw.world_axis_units());

    let origin = vec![0.0; lw.pixel_n_dim()];
    assert_eq!(
        lw.pixel_to_world(&origin).unwrap(),
        rw.pixel_to_world(&origin).unwrap()
    );
}
