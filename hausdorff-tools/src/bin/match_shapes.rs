#![warn(clippy::all)]

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::{value_t, App, Arg};
use hausdorff_algorithms::search::{HausdorffSearch, LogTrace, SearchConfig, SearchTrace};
use hausdorff_core::{nalgebra::Vector3, Dimension, PointCloud, Transformation};
use log::{info, warn};
use rand::{distributions::Uniform, rngs::SmallRng, Rng, SeedableRng};

struct Args {
    pub dimension: Dimension,
    pub points: usize,
    pub seed: u64,
    pub config: SearchConfig,
    pub reflect: bool,
    pub noise: f64,
    pub timeout: Option<Duration>,
    pub coordinates: Option<(Vec<Vec<f64>>, Vec<Vec<f64>>)>,
}

fn get_args() -> Result<Args> {
    let matches = App::new("match shapes")
        .version("0.1")
        .about("Generates a random point cloud and a randomly moved copy of it, then approximates the minimum Hausdorff distance between both over all rigid motions")
        .arg(Arg::with_name("DIMENSION").short("d").long("dimension").takes_value(true).value_name("DIMENSION").possible_values(&["2", "3"]).default_value("2").help("Dimension of the generated point clouds"))
        .arg(Arg::with_name("POINTS").short("n").long("points").takes_value(true).value_name("POINTS").default_value("50").help("Number of points per cloud"))
        .arg(Arg::with_name("SEED").short("s").long("seed").takes_value(true).value_name("SEED").default_value("0").help("Seed of the random number generator"))
        .arg(Arg::with_name("ACCURACY").short("a").long("accuracy").takes_value(true).value_name("ACCURACY").conflicts_with("STALL").help("Run in accuracy mode with this target accuracy relative to the larger diameter (default mode, 0.05)"))
        .arg(Arg::with_name("STALL").long("stall").takes_value(true).value_name("ITERATIONS").help("Run in stall mode, stopping after this many refinements without improvement"))
        .arg(Arg::with_name("MARGIN").long("margin").takes_value(true).value_name("MARGIN").default_value("0.01").help("Relative improvement that resets the stall counter"))
        .arg(Arg::with_name("BRANCHING").short("p").long("branching").takes_value(true).value_name("BRANCHING").default_value("2").help("Number of sub-cells per axis when refining a cell"))
        .arg(Arg::with_name("MAX_ITERATIONS").long("max-iterations").takes_value(true).value_name("MAX_ITERATIONS").help("Hard limit on the number of refinements"))
        .arg(Arg::with_name("PROPER").long("proper").help("Only search proper rigid motions, i.e. forbid reflections"))
        .arg(Arg::with_name("REFLECT").long("reflect").help("Mirror the generated copy"))
        .arg(Arg::with_name("NOISE").long("noise").takes_value(true).value_name("NOISE").default_value("0").help("Maximum uniform noise added to every coordinate of the copy"))
        .arg(Arg::with_name("SOURCE").long("source").takes_value(true).value_name("COORDINATES").requires("TARGET").help("Coordinates of the first cloud instead of a random one, e.g. \"0,0;1,0;0,2\""))
        .arg(Arg::with_name("TARGET").long("target").takes_value(true).value_name("COORDINATES").requires("SOURCE").help("Coordinates of the second cloud instead of a moved copy of the first one"))
        .arg(Arg::with_name("TIMEOUT").short("t").long("timeout").takes_value(true).value_name("SECONDS").help("Stop the search after this many seconds"))
        .get_matches();

    let dimension = Dimension::from_dim(value_t!(matches, "DIMENSION", usize)?)?;
    let points = value_t!(matches, "POINTS", usize)?;
    if points == 0 {
        return Err(anyhow!("Number of points must be positive"));
    }
    let seed = value_t!(matches, "SEED", u64)?;

    let mut config = if matches.is_present("STALL") {
        SearchConfig::stall(value_t!(matches, "STALL", usize)?)
    } else if matches.is_present("ACCURACY") {
        SearchConfig::accuracy(value_t!(matches, "ACCURACY", f64)?)
    } else {
        SearchConfig::accuracy(0.05)
    }
    .with_improvement_margin(value_t!(matches, "MARGIN", f64)?)
    .with_branching_factor(value_t!(matches, "BRANCHING", usize)?)
    .with_proper_rigid_only(matches.is_present("PROPER"));
    if matches.is_present("MAX_ITERATIONS") {
        config = config.with_max_iterations(value_t!(matches, "MAX_ITERATIONS", usize)?);
    }
    config.validate()?;

    let timeout = if matches.is_present("TIMEOUT") {
        let seconds = value_t!(matches, "TIMEOUT", f64)?;
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(anyhow!("Timeout must be a non-negative number of seconds"));
        }
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    };

    let coordinates = match (matches.value_of("SOURCE"), matches.value_of("TARGET")) {
        (Some(source), Some(target)) => Some((parse_coordinates(source)?, parse_coordinates(target)?)),
        _ => None,
    };

    Ok(Args {
        dimension,
        points,
        seed,
        config,
        reflect: matches.is_present("REFLECT"),
        noise: value_t!(matches, "NOISE", f64)?,
        timeout,
        coordinates,
    })
}

/// Parses points given as `x,y[,z]` tuples separated by `;`
fn parse_coordinates(text: &str) -> Result<Vec<Vec<f64>>> {
    text.split(';')
        .map(str::trim)
        .filter(|tuple| !tuple.is_empty())
        .map(|tuple| {
            tuple
                .split(',')
                .map(|c| {
                    c.trim()
                        .parse::<f64>()
                        .map_err(|e| anyhow!("Invalid coordinate '{}' in '{}': {}", c, tuple, e))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn random_point<R: Rng>(rng: &mut R, dimension: Dimension, range: Uniform<f64>) -> Vector3<f64> {
    match dimension {
        Dimension::Planar => Vector3::new(rng.sample(range), rng.sample(range), 0.0),
        Dimension::Spatial => Vector3::new(rng.sample(range), rng.sample(range), rng.sample(range)),
    }
}

fn random_motion<R: Rng>(rng: &mut R, dimension: Dimension, reflect: bool) -> Transformation {
    let translation = random_point(rng, dimension, Uniform::new(-20.0, 20.0));
    let rotation = match dimension {
        Dimension::Planar => Vector3::new(0.0, 0.0, rng.sample(Uniform::new(-3.0, 3.0))),
        Dimension::Spatial => random_point(rng, dimension, Uniform::new(-1.5, 1.5)),
    };
    Transformation::from_vectors(dimension, translation, rotation, reflect)
}

fn generate_clouds(args: &Args) -> Result<(PointCloud, PointCloud, Transformation)> {
    let mut rng = SmallRng::seed_from_u64(args.seed);
    let range = Uniform::new(-10.0, 10.0);
    let points = (0..args.points)
        .map(|_| random_point(&mut rng, args.dimension, range))
        .collect();
    let source = PointCloud::new(args.dimension, points)?;

    let motion = random_motion(&mut rng, args.dimension, args.reflect);
    let moved = motion.apply(source.points());
    let target = if args.noise > 0.0 {
        let noise = Uniform::new_inclusive(-args.noise, args.noise);
        let noisy = moved
            .iter()
            .map(|p| p + random_point(&mut rng, args.dimension, noise))
            .collect();
        PointCloud::new(args.dimension, noisy)?
    } else {
        PointCloud::new(args.dimension, moved)?
    };
    Ok((source, target, motion))
}

fn print_transformation(name: &str, transformation: &Transformation) {
    println!("{}", name);
    println!(
        "\tTranslation: {:?}",
        transformation.dimension().project(transformation.translation())
    );
    println!("\tRotation:    {:?}", transformation.rotation_parameters());
    println!("\tReflection:  {}", transformation.reflects());
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = get_args()?;
    let (source, target, motion) = match &args.coordinates {
        Some((source, target)) => {
            let source = PointCloud::from_coordinates(source)?;
            let target = PointCloud::from_coordinates(target)?;
            info!(
                "Matching {:?} point clouds with {} and {} points",
                source.dimension(),
                source.len(),
                target.len()
            );
            (source, target, None)
        }
        None => {
            let (source, target, motion) = generate_clouds(&args)?;
            info!(
                "Generated {:?} point clouds with {} points each (seed {})",
                args.dimension, args.points, args.seed
            );
            (source, target, Some(motion))
        }
    };

    let start = Instant::now();
    let mut search = HausdorffSearch::new(&source, &target, args.config.clone())?;
    let mut trace = LogTrace;
    trace.on_seed(&search.seed_event());
    loop {
        if search.step_traced(&mut trace)?.is_finished() {
            break;
        }
        if let Some(timeout) = args.timeout {
            if start.elapsed() >= timeout {
                warn!("Timeout after {} iterations", search.iterations());
                break;
            }
        }
    }
    let result = search.result();
    trace.on_finish(&result);

    println!("Distance:    {}", result.distance);
    println!("Error bound: {}", result.error_bound);
    println!("Termination: {:?}", result.termination);
    println!("Iterations:  {}", result.iterations);
    println!("Frontier:    {}", search.frontier_len());
    println!("Runtime:     {:.3}s", start.elapsed().as_secs_f64());
    if let Some(motion) = &motion {
        print_transformation("Generated motion", motion);
    }
    print_transformation("Found motion", &result.transformation);

    Ok(())
}
