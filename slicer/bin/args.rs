use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Ok, Result};
use clap::Parser;
use nalgebra::{ArrayStorage, Const, Matrix, Scalar, Vector3, U1};
use num_traits::Zero;
use slicer::landmarks::Landmarks;

#[derive(Debug, Parser)]
/// Cuts a mesh in two along a plane and closes both halves.
pub struct Args {
    #[arg(long)]
    /// Path to a .stl or .obj file.
    pub mesh: PathBuf,

    #[arg(long, default_value = "0, 1, 0", value_parser = vector_value_parser::<f32, 3>)]
    /// Normal of the cutting plane. The positive half is on the side it
    /// points into.
    pub normal: Vector3<f32>,
    #[arg(long, default_value = "0, 0, 0", value_parser = vector_value_parser::<f32, 3>)]
    /// Any point on the cutting plane.
    pub point: Vector3<f32>,

    #[command(flatten)]
    pub landmarks: LandmarkArgs,

    #[arg(long, default_value = "slicer.toml")]
    /// Config file to load. Defaults are used if it doesn't exist.
    pub config: PathBuf,
    #[arg(long)]
    /// Format of the written halves, obj or stl. Defaults to the format of
    /// the input mesh.
    pub format: Option<String>,
    #[arg(long)]
    /// Leave the halves open instead of capping the seam.
    pub no_caps: bool,

    /// Directory to write `<stem>_positive` and `<stem>_negative` to.
    pub output_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct LandmarkArgs {
    #[arg(long, value_parser = vector_value_parser::<f32, 3>)]
    /// Deepest point of the nasal bridge, in mesh space.
    pub sellion: Option<Vector3<f32>>,
    #[arg(long, value_parser = vector_value_parser::<f32, 3>)]
    pub right_tragion: Option<Vector3<f32>>,
    #[arg(long, value_parser = vector_value_parser::<f32, 3>)]
    pub left_tragion: Option<Vector3<f32>>,

    #[arg(long)]
    /// Cut along this plane of the reference stack built from the landmarks
    /// instead of --normal and --point. Planes are numbered from 1.
    pub reference_plane: Option<u32>,
}

impl LandmarkArgs {
    pub fn landmarks(&self) -> Option<Landmarks> {
        Some(Landmarks {
            sellion: self.sellion?,
            right_tragion: self.right_tragion?,
            left_tragion: self.left_tragion?,
        })
    }
}

impl Args {
    /// Output format, falling back to the extension of the input.
    pub fn output_format(&self) -> Result<String> {
        match &self.format {
            Some(format) => Ok(format.to_ascii_lowercase()),
            None => Ok(self
                .mesh
                .extension()
                .context("Mesh path has no extension")?
                .to_string_lossy()
                .to_ascii_lowercase()),
        }
    }
}

fn vector_value_parser<T, const N: usize>(
    raw: &str,
) -> Result<Matrix<T, Const<N>, U1, ArrayStorage<T, N, 1>>>
where
    T: FromStr + Scalar + Zero,
    T::Err: Send + Sync + std::error::Error,
{
    let mut vec = Matrix::<T, Const<N>, U1, ArrayStorage<T, N, 1>>::zeros();

    let mut parts = raw.splitn(N, ',');
    for i in 0..N {
        let element = parts.next().context("Missing vector element")?.trim();
        vec[i] = element
            .parse()
            .context("Can't convert element from string")?;
    }

    Ok(vec)
}
