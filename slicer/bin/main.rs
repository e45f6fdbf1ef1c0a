use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use args::Args;
use common::config::Config;
use slicer::{
    contour::Contour,
    landmarks::PlaneId,
    mesh::load_mesh,
    plane::Plane,
    slicer::{Side, Slicer},
};

mod args;

fn main() -> Result<()> {
    let filter = filter::Targets::new()
        .with_default(LevelFilter::INFO)
        .with_target("slicer", LevelFilter::DEBUG)
        .with_target("common", LevelFilter::DEBUG);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config);
    if args.no_caps {
        config.slice.generate_caps = false;
    }

    let ext = (args.mesh.extension())
        .context("Mesh path has no extension")?
        .to_string_lossy()
        .to_ascii_lowercase();
    let file = File::open(&args.mesh)
        .with_context(|| format!("Can't open `{}`", args.mesh.display()))?;
    let mesh = load_mesh(BufReader::new(file), &ext)?;
    info!(
        "Loaded `{}`. {{ vert: {}, face: {} }}",
        args.mesh.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    if !mesh.is_watertight() {
        warn!("Mesh isn't watertight, caps may be incomplete");
    }

    let landmarks = args.landmarks.landmarks();
    let plane = match args.landmarks.reference_plane {
        Some(id) => {
            let landmarks = landmarks.context("--reference-plane needs all three landmarks")?;
            let planes = (landmarks.reference_planes(&config.plane_stack))
                .context("Landmarks are collinear")?;
            let reference = (planes.into_iter())
                .find(|x| x.id == PlaneId(id))
                .with_context(|| format!("No reference plane {id}"))?;
            info!("Cutting along {:?} plane {}", reference.kind, id);
            reference.plane
        }
        None => Plane::from_normal_and_point(args.normal, args.point)
            .context("Plane normal can't be zero")?,
    };

    let now = Instant::now();
    let slicer = Slicer::new(config.slice.clone());
    let result = slicer.slice(&mesh, &plane);
    info!(
        "Sliced in {:.1}ms: {:?}",
        now.elapsed().as_secs_f32() * 1000.0,
        result.report
    );

    let format = args.output_format()?;
    let stem = (args.mesh.file_stem())
        .context("Mesh path has no file name")?
        .to_string_lossy();
    fs::create_dir_all(&args.output_dir)?;

    for (side, name) in [(Side::Positive, "positive"), (Side::Negative, "negative")] {
        let half = result.half(side);
        if half.is_empty() {
            info!("Nothing on the {name} side, skipping");
            continue;
        }

        let path = args.output_dir.join(format!("{stem}_{name}.{format}"));
        let mut writer = BufWriter::new(
            File::create(&path).with_context(|| format!("Can't create `{}`", path.display()))?,
        );
        mesh_format::save_mesh(&mut writer, &half.mesh.to_raw(), &format)?;
        writer.flush()?;
        info!(
            "Wrote `{}`. {{ vert: {}, face: {}, cap: {} }}",
            path.display(),
            half.mesh.vertex_count(),
            half.mesh.face_count(),
            half.cap_faces
        );
    }

    let right = landmarks.map(|x| x.right_tragion - x.left_tragion);
    for (i, points) in result.contours.iter().enumerate() {
        let Some(contour) = Contour::from_loop(points, &plane, right, config.contour.scale) else {
            continue;
        };
        let m = contour.measure(&config.contour);
        info!(
            "Contour {i}: circumference {:.2}, mean radius {:.2}, width {:.2}, length {:.2}, \
             diagonals {:.2}/{:.2}, CVA {:.2}, CVAI {:.1}%, CR {:.1}%",
            m.circumference,
            m.mean_radius,
            m.width,
            m.length,
            m.diagonals.0,
            m.diagonals.1,
            m.cva,
            m.cvai,
            m.cephalic_ratio
        );
    }

    Ok(())
}
