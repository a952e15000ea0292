//! Run history of conserved quantities, and plots of it.

use std::error::Error;

use lin_alg::f64::Vec3;
use log::info;
use plotters::{
    element::PathElement,
    prelude::{
        BitMapBackend, ChartBuilder, Color, IntoDrawingArea, BLACK, BLUE, GREEN, RED, WHITE,
    },
    series::LineSeries,
};

use crate::simulation::Simulation;

#[derive(Clone, Debug)]
pub struct Sample {
    pub time: f64,
    pub nparts: usize,
    pub circ: Vec3,
    pub impulse: Vec3,
    pub body_circ: Vec3,
}

#[derive(Clone, Debug, Default)]
pub struct History {
    pub samples: Vec<Sample>,
}

impl History {
    pub fn record(&mut self, sim: &Simulation) {
        let sample = Sample {
            time: sim.get_time(),
            nparts: sim.get_nparts(),
            circ: sim.total_circulation(),
            impulse: sim.total_impulse(),
            body_circ: sim.body_circulation(),
        };

        info!(
            "t={:.4} n={} circ=({:.3e} {:.3e} {:.3e}) impulse=({:.3e} {:.3e} {:.3e})",
            sample.time,
            sample.nparts,
            sample.circ.x,
            sample.circ.y,
            sample.circ.z,
            sample.impulse.x,
            sample.impulse.y,
            sample.impulse.z
        );

        self.samples.push(sample);
    }

    fn series(&self, f: impl Fn(&Sample) -> Vec3) -> [Vec<(f64, f64)>; 3] {
        let mut result = [Vec::new(), Vec::new(), Vec::new()];
        for s in &self.samples {
            let v = f(s);
            result[0].push((s.time, v.x));
            result[1].push((s.time, v.y));
            result[2].push((s.time, v.z));
        }
        result
    }

    pub fn plot_circulation(&self, filename: &str) -> Result<(), Box<dyn Error>> {
        plot(&self.series(|s| s.circ), "Γ", "Total circulation", filename)
    }

    pub fn plot_impulse(&self, filename: &str) -> Result<(), Box<dyn Error>> {
        plot(&self.series(|s| s.impulse), "I", "Linear impulse", filename)
    }
}

fn range(data: &[Vec<(f64, f64)>], f: impl Fn(&(f64, f64)) -> f64) -> (f64, f64) {
    let (min, max) = data
        .iter()
        .flatten()
        .map(f)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        });

    if !min.is_finite() {
        return (0., 1.);
    }
    if max - min < 1e-12 {
        return (min - 0.5, max + 0.5);
    }
    (min, max)
}

/// Plot x, y, z components against time, to `{filename}.png`.
fn plot(
    data: &[Vec<(f64, f64)>; 3],
    y_label: &str,
    plot_title: &str,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let x_range = range(data, |(x, _)| *x);
    let y_range = range(data, |(_, y)| *y);

    let fname = format!("{filename}.png");
    let root = BitMapBackend::new(&fname, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(plot_title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc("t")
        .y_desc(y_label)
        .draw()?;

    let styles = [(RED, "x"), (GREEN, "y"), (BLUE, "z")];
    for (series, (color, label)) in data.iter().zip(styles) {
        chart
            .draw_series(LineSeries::new(series.iter().cloned(), color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new([(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("Saved {fname}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_range_is_padded() {
        let data = vec![vec![(0., 2.), (1., 2.)]];
        assert_eq!(range(&data, |(_, y)| *y), (1.5, 2.5));
        assert_eq!(range(&data, |(x, _)| *x), (0., 1.));
        assert_eq!(range(&[], |(x, _)| *x), (0., 1.));
    }

    #[test]
    fn records_samples() {
        let mut sim = Simulation::default();
        sim.add_particles(vec![0., 0., 0., 1., 0., 0., 0.]).unwrap();

        let mut history = History::default();
        history.record(&sim);
        sim.step();
        history.record(&sim);

        assert_eq!(history.samples.len(), 2);
        assert_eq!(history.samples[1].nparts, 1);
        assert_eq!(history.samples[1].circ.x, 1.);

        let [xs, ..] = history.series(|s| s.circ);
        assert_eq!(xs, vec![(0., 1.), (0.01, 1.)]);
    }
}
