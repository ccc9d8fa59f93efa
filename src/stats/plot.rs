use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;
use plotters::prelude::*;

use crate::stats::model::Distribution;
use crate::util::sanitize_stat_name;

const PLOT_SIZE: (u32, u32) = (800, 500);

/// Render one latency distribution as a bar chart PNG under `plot_dir`.
/// The file is named after the owning component and the (sanitized) stat
/// name; returns the path written.
pub fn plot_histogram(
    component: &str,
    dist: &Distribution,
    plot_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(plot_dir)
        .with_context(|| format!("creating {}", plot_dir.display()))?;
    let out_path = plot_dir.join(format!(
        "{}_{}.png",
        component,
        sanitize_stat_name(&dist.name)
    ));

    let x_max = dist.bin_size * dist.counts.len() as f64;
    let y_max = dist
        .counts
        .iter()
        .cloned()
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.1;

    // Scope the drawing area so its borrow of out_path ends before the
    // path is returned.
    {
        let root = BitMapBackend::new(&out_path, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| anyhow!("filling plot background: {}", e))?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{} {}", component, dist.name), ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, 0.0..y_max)
            .map_err(|e| anyhow!("building chart: {}", e))?;

        chart
            .configure_mesh()
            .x_desc(format!("latency (cycles, bin size = {})", dist.bin_size))
            .y_desc("count")
            .draw()
            .map_err(|e| anyhow!("drawing chart mesh: {}", e))?;

        chart
            .draw_series(dist.counts.iter().enumerate().map(|(i, &count)| {
                let x0 = i as f64 * dist.bin_size;
                // Leave a sliver between bars, as wide bins otherwise merge.
                let x1 = x0 + dist.bin_size * 0.9;
                Rectangle::new([(x0, 0.0), (x1, count)], BLUE.mix(0.6).filled())
            }))
            .map_err(|e| anyhow!("drawing histogram bars: {}", e))?;

        root.present()
            .map_err(|e| anyhow!("writing {}: {}", out_path.display(), e))?;
    }
    info!("saved histogram {}", out_path.display());
    Ok(out_path)
}
