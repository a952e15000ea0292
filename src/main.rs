//! Demo run: a vortex ring fired at a sphere, with a line of tracer points. Writes plots of
//! circulation and impulse when done.

use std::{path::Path, thread, time::Duration};

use lin_alg::f64::Vec3;
use log::{error, info, warn};
use vortex_bem::{
    body::Body,
    boundary_features::Ovoid,
    config::{Config, DEFAULT_CONFIG_FILE},
    diagnostics::History,
    flow_features::{FlowFeature, VortexRing},
    Simulation,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const NUM_TRACERS: usize = 21;

fn load_config() -> Config {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    match Config::load(path) {
        Ok(cfg) => {
            info!("Loaded config from {DEFAULT_CONFIG_FILE}");
            cfg
        }
        Err(_) => {
            let cfg = Config::default();
            if let Err(e) = cfg.save(path) {
                warn!("Unable to save a default config: {e}");
            }
            cfg
        }
    }
}

fn build_scene(sim: &mut Simulation) -> vortex_bem::Result<()> {
    let sphere = sim.add_body(Body::new("sphere"));
    sim.add_boundary(&Ovoid::new(Some(sphere), Vec3::new_zero(), 1.))?;

    let ring = VortexRing {
        pos: Vec3::new(0., 0., -2.),
        normal: Vec3::new(0., 0., 1.),
        major_rad: 0.75,
        circ: 1.,
    };
    info!("Adding {ring}");
    sim.add_particles(ring.init_particles(sim.get_ips()))?;

    let mut tracers = Vec::with_capacity(NUM_TRACERS * 3);
    for i in 0..NUM_TRACERS {
        let x = -1.5 + 3. * i as f64 / (NUM_TRACERS - 1) as f64;
        tracers.extend_from_slice(&[x, 0., -1.]);
    }
    sim.add_fldpts(tracers, true)?;

    sim.set_initialized();
    Ok(())
}

fn main() {
    env_logger::init();

    let cfg = load_config();
    let mut sim = Simulation::new(&cfg);
    // Coarse particles keep the demo quick.
    sim.set_re_for_ips(0.1);

    if let Err(e) = build_scene(&mut sim) {
        error!("Unable to set up the scene: {e}");
        return;
    }
    info!(
        "Running {} steps with {} particles, {} panels, {} field points",
        cfg.num_timesteps,
        sim.get_nparts(),
        sim.get_npanels(),
        sim.get_nfldpts()
    );

    let ratio = cfg.diagnostic_ratio.max(1);
    let mut history = History::default();
    history.record(&sim);

    for i in 0..cfg.num_timesteps {
        sim.async_step();
        while !sim.test_for_new_results() {
            thread::sleep(POLL_INTERVAL);
        }

        // No linear solver here; the boundary sheets stay at zero strength.
        if (i + 1) % ratio == 0 {
            info!("BEM RHS has {} rows", sim.bem_rhs().len());
            history.record(&sim);
        }
    }

    if let Err(e) = history.plot_circulation("circulation") {
        error!("Unable to plot circulation: {e}");
    }
    if let Err(e) = history.plot_impulse("impulse") {
        error!("Unable to plot impulse: {e}");
    }
}
