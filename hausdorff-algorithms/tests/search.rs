use anyhow::Result;
use assert_approx_eq::assert_approx_eq;
use hausdorff_algorithms::{
    diameter::max_diameter,
    search::{
        approximate_hausdorff, match_clouds, HausdorffSearch, RecordingTrace, SearchConfig,
        TerminationReason,
    },
};
use hausdorff_core::{symmetric_hausdorff, Dimension, PointCloud, Transformation};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_cloud<R: Rng>(rng: &mut R, dimension: Dimension, count: usize) -> Result<PointCloud> {
    let coordinates = (0..count)
        .map(|_| {
            (0..dimension.dim())
                .map(|_| rng.gen_range(-10.0..10.0))
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<_>>();
    PointCloud::from_coordinates(&coordinates)
}

fn random_transformation<R: Rng>(
    rng: &mut R,
    dimension: Dimension,
    reflect: bool,
) -> Result<Transformation> {
    let translation = (0..dimension.dim())
        .map(|_| rng.gen_range(-20.0..20.0))
        .collect::<Vec<_>>();
    let rotation = (0..dimension.rotation_dim())
        .map(|_| rng.gen_range(-1.5..1.5))
        .collect::<Vec<_>>();
    Transformation::new(dimension, &translation, &rotation, reflect)
}

fn asymmetric_polygon() -> Result<PointCloud> {
    PointCloud::from_coordinates(&[
        [0.0, 0.0],
        [4.0, 0.0],
        [5.0, 1.5],
        [2.0, 3.0],
        [0.5, 2.0],
        [1.5, 0.7],
    ])
}

#[test]
fn test_symmetric_under_inversion() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(17);
    for &dimension in [Dimension::Planar, Dimension::Spatial].iter() {
        for &reflect in [false, true].iter() {
            let a = random_cloud(&mut rng, dimension, 40)?;
            let b = random_cloud(&mut rng, dimension, 25)?;
            let t = random_transformation(&mut rng, dimension, reflect)?;
            let forward = symmetric_hausdorff(&a, &b, &t)?;
            let backward = symmetric_hausdorff(&b, &a, &t.invert())?;
            assert_approx_eq!(forward, backward, 1e-9);
        }
    }
    Ok(())
}

#[test]
fn test_progress_is_monotone() -> Result<()> {
    let a = asymmetric_polygon()?;
    let b = PointCloud::from_coordinates(&[[1.0, 1.0], [3.0, 4.0], [-2.0, 2.5], [0.0, -1.0]])?;
    let mut trace = RecordingTrace::default();
    let result = HausdorffSearch::new(&a, &b, SearchConfig::accuracy(0.05))?
        .run_with_trace(&mut trace)?;

    let seed = trace.seed.expect("seed event");
    assert!(seed.best_possible <= seed.best_found);
    let mut best_found = seed.best_found;
    let mut best_possible = seed.best_possible;
    for event in &trace.iterations {
        assert!(event.best_found <= best_found);
        assert!(event.best_possible >= best_possible - 1e-9);
        assert!(event.best_possible <= event.best_found);
        assert!(event.children > 0);
        best_found = event.best_found;
        best_possible = event.best_possible;
    }
    assert_eq!(trace.iterations.len(), result.iterations);
    assert_eq!(trace.finish.as_ref(), Some(&result));
    assert!(result.error_bound >= 0.0);
    assert_eq!(result.termination, TerminationReason::Converged);
    Ok(())
}

#[test]
fn test_planar_copy_converges() -> Result<()> {
    let a = asymmetric_polygon()?;
    let t = Transformation::new(Dimension::Planar, &[7.0, -3.0], &[2.4], false)?;
    let b = a.transform(&t)?;
    let target_error = 0.05 * max_diameter(&a, &b);

    let result = match_clouds(&a, &b, &SearchConfig::accuracy(0.05))?;
    assert_eq!(result.termination, TerminationReason::Converged);
    assert!(result.distance <= target_error + 1e-9);
    assert!(result.error_bound <= target_error + 1e-9);
    // the reported transformation realizes the reported distance on the original clouds
    assert_approx_eq!(
        symmetric_hausdorff(&a, &b, &result.transformation)?,
        result.distance,
        1e-9
    );
    Ok(())
}

#[test]
fn test_planar_reflected_copy_converges() -> Result<()> {
    let a = asymmetric_polygon()?;
    let t = Transformation::new(Dimension::Planar, &[-1.0, 2.0], &[-0.7], true)?;
    let b = a.transform(&t)?;
    let target_error = 0.05 * max_diameter(&a, &b);

    let result = match_clouds(&a, &b, &SearchConfig::accuracy(0.05))?;
    assert!(result.distance <= target_error + 1e-9);

    // the polygon is chiral, so no proper motion aligns it with its mirror image
    let proper = match_clouds(
        &a,
        &b,
        &SearchConfig::accuracy(0.05).with_proper_rigid_only(true),
    )?;
    assert!(!proper.transformation.reflects());
    assert!(proper.distance > 0.0);
    Ok(())
}

#[test]
fn test_spatial_copy_converges() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(42);
    let a = random_cloud(&mut rng, Dimension::Spatial, 8)?;
    let t = Transformation::new(Dimension::Spatial, &[1.0, 2.0, -3.0], &[0.3, -0.9, 0.5], false)?;
    let b = a.transform(&t)?;
    let target_error = 0.25 * max_diameter(&a, &b);

    let result = match_clouds(
        &a,
        &b,
        &SearchConfig::accuracy(0.25).with_proper_rigid_only(true),
    )?;
    assert_eq!(result.termination, TerminationReason::Converged);
    assert!(result.distance <= target_error + 1e-9);
    Ok(())
}

#[test]
fn test_spatial_reflected_copy_converges() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(7);
    let a = random_cloud(&mut rng, Dimension::Spatial, 8)?;
    let t = Transformation::new(Dimension::Spatial, &[-2.0, 0.5, 4.0], &[-0.6, 0.2, 1.1], true)?;
    let b = a.transform(&t)?;
    let target_error = 0.25 * max_diameter(&a, &b);

    let result = match_clouds(&a, &b, &SearchConfig::accuracy(0.25))?;
    assert_eq!(result.termination, TerminationReason::Converged);
    assert!(result.distance <= target_error + 1e-9);
    assert_approx_eq!(
        symmetric_hausdorff(&a, &b, &result.transformation)?,
        result.distance,
        1e-9
    );
    Ok(())
}

#[test]
fn test_single_points_align_exactly() -> Result<()> {
    let (distance, error_bound) =
        approximate_hausdorff(&[[0.0, 0.0]], &[[5.0, 0.0]], &SearchConfig::accuracy(0.05))?;
    assert_approx_eq!(distance, 0.0, 1e-12);
    assert_approx_eq!(error_bound, 0.0, 1e-12);
    Ok(())
}

#[test]
fn test_single_point_against_segment() -> Result<()> {
    // the best position for the single point is the midpoint of the segment
    let (distance, error_bound) = approximate_hausdorff(
        &[[3.0, 3.0]],
        &[[0.0, 0.0], [2.0, 0.0]],
        &SearchConfig::accuracy(0.05),
    )?;
    assert!(distance >= 1.0 - 1e-9);
    assert!(distance - error_bound <= 1.0 + 1e-9);
    assert!(error_bound <= 0.1 + 1e-9);
    Ok(())
}

#[test]
fn test_scaling_scales_distance() -> Result<()> {
    let a = asymmetric_polygon()?;
    let b = PointCloud::from_coordinates(&[[1.0, 1.0], [3.0, 4.0], [-2.0, 2.5], [0.0, -1.0]])?;
    let config = SearchConfig::accuracy(0.05);
    let unscaled = match_clouds(&a, &b, &config)?;
    let scaled = match_clouds(&a.scaled(2.0)?, &b.scaled(2.0)?, &config)?;
    assert_approx_eq!(scaled.distance, 2.0 * unscaled.distance, 1e-9);
    Ok(())
}

#[test]
fn test_error_bound_within_target_accuracy() -> Result<()> {
    let triangle = vec![[0.0, 0.0], [3.0, 0.0], [1.0, 2.0]];
    let square = vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
    let (distance, error_bound) =
        approximate_hausdorff(&triangle, &square, &SearchConfig::accuracy(0.05))?;
    let a = PointCloud::from_coordinates(&triangle)?;
    let b = PointCloud::from_coordinates(&square)?;
    assert!(error_bound >= 0.0);
    assert!(error_bound <= 0.05 * max_diameter(&a, &b) + 1e-9);
    assert!(distance > 0.0);
    Ok(())
}

#[test]
fn test_stall_mode_terminates() -> Result<()> {
    let a = asymmetric_polygon()?;
    let t = Transformation::new(Dimension::Planar, &[2.0, 2.0], &[1.0], false)?;
    let b = a.transform(&t)?;
    let mut trace = RecordingTrace::default();
    let result = HausdorffSearch::new(&a, &b, SearchConfig::stall(20))?.run_with_trace(&mut trace)?;

    assert_eq!(result.termination, TerminationReason::Stalled);
    assert!(result.iterations >= 21);
    assert!(result.error_bound >= 0.0);
    let seed = trace.seed.expect("seed event");
    assert!(result.distance <= seed.best_found);
    let last = trace.iterations.last().expect("at least one iteration");
    assert_eq!(last.stall_count, 21);
    Ok(())
}

#[test]
fn test_iteration_limit() -> Result<()> {
    let a = asymmetric_polygon()?;
    let b = PointCloud::from_coordinates(&[[1.0, 1.0], [3.0, 4.0], [-2.0, 2.5], [0.0, -1.0]])?;
    let result = match_clouds(&a, &b, &SearchConfig::accuracy(0.001).with_max_iterations(3))?;
    assert_eq!(result.termination, TerminationReason::IterationLimit);
    assert_eq!(result.iterations, 3);
    Ok(())
}

#[test]
fn test_invalid_input_fails_fast() {
    let planar = [[0.0, 0.0], [1.0, 0.0]];
    let spatial = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
    let empty: [[f64; 2]; 0] = [];

    assert!(approximate_hausdorff(&planar, &planar, &SearchConfig::default()).is_err());
    assert!(approximate_hausdorff(&empty, &planar, &SearchConfig::accuracy(0.1)).is_err());
    assert!(approximate_hausdorff(&planar, &planar, &SearchConfig::accuracy(1.5)).is_err());

    let a = PointCloud::from_coordinates(&planar).expect("valid coordinates");
    let b = PointCloud::from_coordinates(&spatial).expect("valid coordinates");
    assert!(match_clouds(&a, &b, &SearchConfig::accuracy(0.1)).is_err());

    let both = SearchConfig {
        target_accuracy: Some(0.1),
        max_stall_iterations: Some(10),
        ..Default::default()
    };
    assert!(match_clouds(&a, &a, &both).is_err());
}
