//! Random samplers.
//!
//! Every sampler draws from the thread-local generator on each run; there
//! is no hidden state between resolutions.

use std::f64::consts::PI;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, SelectionError, SynthResult};
use crate::provider::Provider;
use crate::rotation::{quaternion_to_euler, track_z, transform};
use crate::value::Value;

/// `a + (b - a) * u` with `u` in `[0, 1)`; tolerates `a > b`.
fn uniform<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    a + (b - a) * rng.gen::<f64>()
}

/// Samples each of three coordinates uniformly from `[min_i, max_i]`.
///
/// ```json
/// {"provider": "sampler.Uniform3d", "min": [-0.5, -0.5, -0.5], "max": [0.5, 0.5, 0.5]}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform3d;

impl Provider for Uniform3d {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let min = config.get_vector3d("min")?;
        let max = config.get_vector3d("max")?;

        let mut rng = rand::thread_rng();
        let position = (0..3).map(|i| uniform(&mut rng, min[i], max[i])).collect();
        Ok(Value::Vector(position))
    }
}

/// Samples rotations uniformly over SO(3) and returns XYZ Euler angles.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSO3;

impl Provider for UniformSO3 {
    fn run(&self, _config: &Config) -> SynthResult<Value> {
        let mut rng = rand::thread_rng();
        let rand: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
        Ok(Value::Euler(quaternion_to_euler(random_quaternion(rand))))
    }
}

/// Maps three independent uniforms in `[0, 1)` to a unit quaternion
/// `(w, x, y, z)` with the subgroup algorithm.
#[must_use]
pub fn random_quaternion(rand: [f64; 3]) -> [f64; 4] {
    let r1 = (1.0 - rand[0]).sqrt();
    let r2 = rand[0].sqrt();
    let t1 = 2.0 * PI * rand[1];
    let t2 = 2.0 * PI * rand[2];
    [t2.cos() * r2, t1.sin() * r1, t1.cos() * r1, t2.sin() * r2]
}

/// Returns one file matching a glob pattern, chosen uniformly.
///
/// ```json
/// {"provider": "sampler.Path", "path": "/data/models/*.obj"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSampler;

impl Provider for PathSampler {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let pattern = config.get_string("path")?;
        let paths = glob::glob(&pattern)
            .map_err(|e| ConfigError::conversion("path", "glob pattern", e))?
            .filter_map(Result::ok)
            .collect::<Vec<_>>();

        let chosen = paths
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| SelectionError::NoMatch {
                what: format!("no files match pattern '{pattern}'"),
            })?;
        debug!(pattern = %pattern, candidates = paths.len(), "Sampled path");
        Ok(Value::String(chosen.display().to_string()))
    }
}

/// Samples a single bool, int, or float.
///
/// Ints are drawn from `[min, max)`, floats from `[min, max)`, bools are a
/// fair coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSampler;

impl Provider for ValueSampler {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let kind = config.get_string("type")?;
        let mut rng = rand::thread_rng();

        match kind.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Value::Bool(rng.gen_bool(0.5))),
            "int" => {
                let min = config.get_int("min")?;
                let max = config.get_int("max")?;
                if min >= max {
                    return Err(ConfigError::conversion(
                        "max",
                        format!("int greater than min ({min})"),
                        max,
                    )
                    .into());
                }
                Ok(Value::Int(rng.gen_range(min..max)))
            }
            "float" => {
                let min = config.get_float("min")?;
                let max = config.get_float("max")?;
                Ok(Value::Float(uniform(&mut rng, min, max)))
            }
            _ => Err(ConfigError::conversion("type", "one of bool, int, float", kind).into()),
        }
    }
}

/// Samples a point on a circle or a disk.
///
/// The shape lies in the plane through `center` orthogonal to `up_vector`
/// (default `[0, 0, 1]`). `mode` is `disk` (default, uniform over the area)
/// or `circle` (on the rim).
///
/// ```json
/// {"provider": "sampler.Disk", "center": [0, 0, 1], "radius": 2, "mode": "circle"}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSampler;

impl Provider for DiskSampler {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let center = config.get_vector3d("center")?;
        let radius = config.get_float("radius")?;
        let mode = config.get_string_or("mode", "disk")?;
        let up = config.get_vector3d_or("up_vector", [0.0, 0.0, 1.0])?;
        let plane = track_z(up)
            .ok_or_else(|| ConfigError::conversion("up_vector", "non-zero vector", format!("{up:?}")))?;

        let mut rng = rand::thread_rng();
        let magnitude = match mode.as_str() {
            "circle" => radius,
            "disk" => radius * rng.gen::<f64>().sqrt(),
            _ => return Err(ConfigError::conversion("mode", "one of circle, disk", mode).into()),
        };
        let angle = uniform(&mut rng, 0.0, 2.0 * PI);
        let (sin, cos) = angle.sin_cos();

        let offset = transform(&plane, [magnitude * cos, magnitude * sin, 0.0]);
        let point = (0..3).map(|i| center[i] + offset[i]).collect();
        Ok(Value::Vector(point))
    }
}

/// Samples an RGBA color; every bound must lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorSampler;

impl Provider for ColorSampler {
    fn run(&self, config: &Config) -> SynthResult<Value> {
        let min = config.get_vector4d("min")?;
        let max = config.get_vector4d("max")?;

        let in_unit = |v: &[f64; 4]| v.iter().all(|c| (0.0..=1.0).contains(c));
        if !in_unit(&min) || !in_unit(&max) {
            return Err(ConfigError::conversion(
                "min/max",
                "components in [0, 1]",
                format!("{min:?} / {max:?}"),
            )
            .into());
        }

        let mut rng = rand::thread_rng();
        let color = (0..4).map(|i| uniform(&mut rng, min[i], max[i])).collect();
        Ok(Value::Color(color))
    }
}
