use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};
use ndarray::{array, concatenate, Array1, Array2, Axis};
use radar_composite::{
    composite_reflectivity, CompositeConfig, CompositeError, InMemoryVolume, MaskedField,
    CROSS_CORRELATION_RATIO, REFLECTIVITY,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Geolocation that encodes the azimuth of each ray so ordering can be checked
fn geolocation(azimuth: &Array1<f64>, gates: usize) -> (Array2<f64>, Array2<f64>) {
    let nrays = azimuth.len();
    let lon = Array2::from_shape_fn((nrays, gates), |(r, g)| -100.0 + azimuth[r] / 100.0 + g as f64 * 0.01);
    let lat = Array2::from_shape_fn((nrays, gates), |(r, g)| 35.0 + azimuth[r] / 200.0 - g as f64 * 0.01);
    (lon, lat)
}

fn build_volume(
    sweeps: &[(Array1<f64>, Array2<f32>)],
    time: Array1<f64>,
    rho_hv: Option<Array2<f32>>,
) -> InMemoryVolume {
    let azimuth = concatenate(Axis(0), &sweeps.iter().map(|(az, _)| az.view()).collect::<Vec<_>>()).unwrap();
    let reflectivity = concatenate(Axis(0), &sweeps.iter().map(|(_, z)| z.view()).collect::<Vec<_>>()).unwrap();
    let (lon, lat) = geolocation(&azimuth, reflectivity.ncols());

    let mut volume = InMemoryVolume::new(azimuth, time, "seconds since 2023-07-04T18:00:00Z", lon, lat).unwrap();
    let mut start = 0;
    for (az, _) in sweeps {
        volume.add_sweep(start, start + az.len() - 1).unwrap();
        start += az.len();
    }
    volume.add_field_data(REFLECTIVITY, reflectivity).unwrap();
    if let Some(rho) = rho_hv {
        volume.add_field_data(CROSS_CORRELATION_RATIO, rho).unwrap();
    }
    volume
}

#[test]
fn test_two_sweep_scenario_after_upsample_alignment() {
    init_logging();

    let volume = build_volume(
        &[
            (array![10.0, 350.0, 190.0, 70.0], Array2::from_elem((4, 2), 20.0)),
            (array![0.0, 90.0, 180.0, 270.0], Array2::from_elem((4, 2), 30.0)),
        ],
        Array1::zeros(8),
        None,
    );
    let config = CompositeConfig {
        rhv_filter: false,
        verbose: true,
        super_res_rays: 8,
        ..CompositeConfig::default()
    };

    let product = composite_reflectivity(&volume, &config).unwrap();
    let composite = &product.composite_reflectivity.data;

    assert_eq!(composite.dim(), (8, 2));
    assert_eq!(composite.valid_count(), 16);
    assert!(composite.data().iter().all(|&v| v == 30.0));

    // Canonical grid comes from sweep 0, sorted [10, 70, 190, 350], closed, then doubled
    let lon = &product.longitude.data;
    assert_eq!(lon.dim(), (8, 2));
    assert_eq!(lon.row(7), lon.row(0));
    assert_eq!(product.latitude.data.row(7), product.latitude.data.row(0));
    let expected_az = [10.0, 10.0, 70.0, 70.0, 190.0, 190.0, 10.0, 10.0];
    for (row, az) in expected_az.iter().enumerate() {
        assert_abs_diff_eq!(lon[[row, 0]], -100.0 + az / 100.0, epsilon = 1e-12);
    }
}

#[test]
fn test_correlation_filter_scenario() {
    init_logging();

    let azimuth = array![0.0, 90.0, 180.0, 270.0];
    let mut rho = Array2::from_elem((8, 2), 0.99f32);
    // Sweep 0: (1, 0) and (2, 1) fail; sweep 1: only (2, 1) fails
    rho[[1, 0]] = 0.80;
    rho[[2, 1]] = 0.80;
    rho[[4 + 2, 1]] = 0.80;

    let volume = build_volume(
        &[
            (azimuth.clone(), Array2::from_elem((4, 2), 40.0)),
            (azimuth, Array2::from_elem((4, 2), 25.0)),
        ],
        Array1::zeros(8),
        Some(rho),
    );
    let config = CompositeConfig {
        super_res_rays: 4,
        ..CompositeConfig::default()
    };

    let product = composite_reflectivity(&volume, &config).unwrap();
    let composite = &product.composite_reflectivity.data;

    assert_eq!(composite.get(1, 0), Some(25.0));
    assert_eq!(composite.get(2, 1), None);
    assert_eq!(composite.get(0, 0), Some(40.0));
    assert_eq!(composite.get(3, 1), Some(40.0));
    assert_eq!(composite.valid_count(), 7);
}

#[test]
fn test_full_resolution_volume_mixed_sweeps() {
    init_logging();

    // Coarse sweep starting mid-rotation at 137.5 deg, values rise with azimuth
    let coarse_az = Array1::from_shape_fn(360, |i| ((i + 137) % 360) as f64 + 0.5);
    let coarse_z = Array2::from_shape_fn((360, 3), |(r, _)| coarse_az[r] as f32 / 10.0);
    // Super-resolution sweep starting at 205.5 deg with a flat 5 dBZ
    let fine_az = Array1::from_shape_fn(720, |i| ((i + 411) % 720) as f64 * 0.5);
    let fine_z = Array2::from_elem((720, 3), 5.0f32);

    let volume = build_volume(
        &[(coarse_az, coarse_z), (fine_az, fine_z)],
        Array1::from_shape_fn(1080, |i| i as f64 * 0.01),
        None,
    );
    let config = CompositeConfig {
        rhv_filter: false,
        ..CompositeConfig::default()
    };

    let product = composite_reflectivity(&volume, &config).unwrap();
    let composite = &product.composite_reflectivity.data;

    assert_eq!(composite.dim(), (720, 3));
    assert_eq!(product.longitude.data.dim(), (720, 3));
    for row in 0..720 {
        let coarse = ((row / 2) as f64 + 0.5) as f32 / 10.0;
        let expected = coarse.max(5.0);
        for gate in 0..3 {
            assert_abs_diff_eq!(composite.get(row, gate).unwrap(), expected, epsilon = 1e-5);
        }
    }

    // Sorted geolocation is azimuth-ordered up to the closed wrap rows
    let lon = &product.longitude.data;
    for row in 1..718 {
        assert!(lon[[row, 0]] >= lon[[row - 1, 0]]);
    }
    assert_eq!(lon.row(719), lon.row(0));

    // Mean of 0.00 .. 10.79 s
    let expected_time = Utc.with_ymd_and_hms(2023, 7, 4, 18, 0, 5).unwrap() + Duration::milliseconds(395);
    assert_eq!(product.time.data, expected_time);
}

#[test]
fn test_sweep_order_does_not_change_composite() {
    init_logging();

    let az_a = array![30.0, 120.0, 210.0, 300.0];
    let az_b = array![200.0, 290.0, 20.0, 110.0];
    let z_a = array![[10.0, 0.0], [20.0, 35.0], [-5.0, 1.0], [12.0, 12.0]];
    let z_b = array![[15.0, 2.0], [8.0, 40.0], [9.0, -3.0], [11.0, 30.0]];

    let config = CompositeConfig {
        rhv_filter: false,
        super_res_rays: 4,
        ..CompositeConfig::default()
    };

    let forward = build_volume(&[(az_a.clone(), z_a.clone()), (az_b.clone(), z_b.clone())], Array1::zeros(8), None);
    let reverse = build_volume(&[(az_b, z_b), (az_a, z_a)], Array1::zeros(8), None);

    let forward = composite_reflectivity(&forward, &config).unwrap();
    let reverse = composite_reflectivity(&reverse, &config).unwrap();

    assert_eq!(
        forward.composite_reflectivity.data,
        reverse.composite_reflectivity.data
    );
    // Sorted: a rows at [30, 120, 210, 300], b rows at [20, 110, 200, 290]
    assert_eq!(
        forward.composite_reflectivity.data.data(),
        &array![[10.0, 0.0], [20.0, 35.0], [15.0, 2.0], [12.0, 40.0]]
    );
}

#[test]
fn test_time_is_mean_of_all_rays() {
    init_logging();

    let azimuth = array![0.0, 90.0, 180.0, 270.0];
    let time = array![0.0, 1.0, 2.0, 3.0, 40.0, 41.0, 42.0, 43.0];
    let config = CompositeConfig {
        rhv_filter: false,
        super_res_rays: 4,
        ..CompositeConfig::default()
    };

    let low = build_volume(
        &[(azimuth.clone(), Array2::from_elem((4, 1), 1.0)), (azimuth.clone(), Array2::from_elem((4, 1), 2.0))],
        time.clone(),
        None,
    );
    let high = build_volume(
        &[(azimuth.clone(), Array2::from_elem((4, 1), 60.0)), (azimuth, Array2::from_elem((4, 1), 70.0))],
        time,
        None,
    );

    let expected = Utc.with_ymd_and_hms(2023, 7, 4, 18, 0, 21).unwrap() + Duration::milliseconds(500);
    let low = composite_reflectivity(&low, &config).unwrap();
    let high = composite_reflectivity(&high, &config).unwrap();
    assert_eq!(low.time.data, expected);
    assert_eq!(high.time.data, expected);
    assert_eq!(low.time.units, "timestamp");
}

#[test]
fn test_all_invalid_column_stays_invalid() {
    init_logging();

    let azimuth = array![0.0, 180.0];
    let mut z = Array2::from_elem((4, 1), 10.0f32);
    z[[0, 0]] = f32::NAN;
    z[[2, 0]] = f32::NAN;

    let volume = build_volume(
        &[(azimuth.clone(), z.slice(ndarray::s![0..2, ..]).to_owned()), (azimuth, z.slice(ndarray::s![2..4, ..]).to_owned())],
        Array1::zeros(4),
        None,
    );
    let config = CompositeConfig {
        rhv_filter: false,
        super_res_rays: 2,
        ..CompositeConfig::default()
    };

    let composite: MaskedField = composite_reflectivity(&volume, &config)
        .unwrap()
        .composite_reflectivity
        .data;
    assert_eq!(composite.get(0, 0), None);
    assert_eq!(composite.get(1, 0), Some(10.0));
}

#[test]
fn test_mismatched_correlation_field_rejected() {
    init_logging();

    let mut volume = build_volume(
        &[(array![0.0, 180.0], Array2::zeros((2, 2)))],
        Array1::zeros(2),
        None,
    );
    let result = volume.add_field_data(CROSS_CORRELATION_RATIO, Array2::zeros((2, 3)));
    assert!(matches!(result, Err(CompositeError::ShapeMismatch(_))));

    let config = CompositeConfig {
        super_res_rays: 2,
        ..CompositeConfig::default()
    };
    assert!(matches!(
        composite_reflectivity(&volume, &config),
        Err(CompositeError::MissingField { sweep: 0, .. })
    ));
}
