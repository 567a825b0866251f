//! Command-line and environment configuration for the server binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use image_refine_core::{EnhanceParams, DEFAULT_MAX_DIMENSION};

use crate::jobs::{StagePlan, MAX_PACING_SCALE};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8000;

/// Default upload cap in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

#[derive(Debug, Parser)]
#[command(name = "image-refine", version, about = "Image enhancement job server")]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "IMAGE_REFINE_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to bind. Falls back to `PORT`, then 8000.
    #[arg(long, env = "IMAGE_REFINE_PORT")]
    pub port: Option<u16>,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "IMAGE_REFINE_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    /// Cap on the longer side of the enhanced image.
    #[arg(long, env = "IMAGE_REFINE_MAX_DIMENSION", default_value_t = DEFAULT_MAX_DIMENSION,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_dimension: u32,

    /// Multiplier on the default stage pacing (0 disables pacing).
    #[arg(long, env = "IMAGE_REFINE_PACING_SCALE", default_value_t = 1.0, value_parser = parse_scale)]
    pub pacing_scale: f64,
}

fn parse_scale(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("pacing scale must be a non-negative number, got {raw}"));
    }
    if value > MAX_PACING_SCALE {
        return Err(format!("pacing scale must be at most {MAX_PACING_SCALE}, got {raw}"));
    }
    Ok(value)
}

impl Cli {
    /// Resolve into a [`ServerConfig`], reading `PORT` when `--port` is absent.
    pub fn into_config(self) -> ServerConfig {
        let port = self
            .port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT);

        ServerConfig {
            bind: SocketAddr::new(self.host, port),
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            enhance: EnhanceParams {
                max_dimension: self.max_dimension,
                ..EnhanceParams::default()
            },
            plan: StagePlan::scaled(self.pacing_scale),
        }
    }
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
    pub enhance: EnhanceParams,
    pub plan: StagePlan,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            enhance: EnhanceParams::default(),
            plan: StagePlan::default(),
        }
    }
}

impl ServerConfig {
    /// Same as the default, with no pacing between stages.
    pub fn immediate() -> Self {
        Self {
            plan: StagePlan::immediate(),
            ..Self::default()
        }
    }
}
