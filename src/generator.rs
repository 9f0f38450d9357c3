use crate::config::Config;
use crate::model::{Population, Site, SiteId};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;

/// Minimum number of no-take sites in every generated population.
pub const MIN_NO_TAKE: usize = 5;

/// Site generator.
///
/// Holds the random number generator and draws populations whose
/// protection status is confounded with fishing pressure.
pub struct Generator {
    rng: ChaCha12Rng,
}

impl Generator {
    /// Create a new `Generator` seeded from the operating system.
    pub fn from_os_rng() -> Result<Self> {
        let rng = ChaCha12Rng::try_from_os_rng().context("failed to seed rng")?;
        Ok(Self { rng })
    }

    /// Create a new `Generator` with a reproducible seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut ChaCha12Rng {
        &mut self.rng
    }

    /// Generate a `grid_size x grid_size` population.
    pub fn generate_population(&mut self, grid_size: usize, cfg: &Config) -> Result<Population> {
        let mut hab_dist_vec = Vec::with_capacity(cfg.model.n_hab());
        for &prob in &cfg.habitat.probs {
            hab_dist_vec.push(Bernoulli::new(prob).context("invalid habitat probability")?);
        }

        let mut sites = Vec::with_capacity(grid_size * grid_size);
        for y in 0..grid_size {
            for x in 0..grid_size {
                let fishing_pressure = fishing_pressure(x, grid_size);

                // Protection favours sites with low fishing pressure.
                let prob = no_take_probability(fishing_pressure, cfg.no_take.bias_strength)
                    * cfg.no_take.coverage
                    * 5.0;
                let no_take_dist =
                    Bernoulli::new(prob.clamp(0.0, 1.0)).context("invalid no-take probability")?;
                let no_take = no_take_dist.sample(&mut self.rng);

                let mut habitats: Vec<bool> = hab_dist_vec
                    .iter()
                    .map(|dist| dist.sample(&mut self.rng))
                    .collect();
                if cfg.habitat.simple_mode && no_take {
                    apply_simple_mode(&mut habitats);
                }

                let id = SiteId::new(x, y);
                sites.push(Site::new(id, habitats, fishing_pressure, no_take, &cfg.model));
            }
        }

        let mut pop = Population::new(grid_size, sites);
        ensure_min_no_take(&mut pop, cfg);

        log::debug!("generated {} sites, {} no-take", pop.len(), pop.n_no_take());

        Ok(pop)
    }
}

/// Fishing pressure at column `x`, falling linearly from 1 at the left edge to 0 at the right.
pub fn fishing_pressure(x: usize, grid_size: usize) -> f64 {
    if grid_size <= 1 {
        return 1.0;
    }
    1.0 - x as f64 / (grid_size - 1) as f64
}

/// Relative chance of protection, before scaling by the coverage target.
pub fn no_take_probability(fishing_pressure: f64, bias_strength: f64) -> f64 {
    (1.0 - fishing_pressure) * bias_strength + (1.0 - bias_strength) * 0.5
}

// Protected sites hold habitat 1 and never habitat 2.
fn apply_simple_mode(habitats: &mut [bool]) {
    habitats[0] = true;
    habitats[1] = false;
}

/// Promote the least fished sites when too few sites are protected.
fn ensure_min_no_take(pop: &mut Population, cfg: &Config) {
    let n_no_take = pop.n_no_take();
    if n_no_take >= MIN_NO_TAKE {
        return;
    }

    let mut i_fished: Vec<usize> = pop
        .sites()
        .iter()
        .enumerate()
        .filter(|(_, site)| !site.is_no_take())
        .map(|(idx, _)| idx)
        .collect();
    // Stable sort keeps population order among ties.
    let sites = pop.sites_mut();
    i_fished.sort_by(|&a, &b| {
        sites[a]
            .fishing_pressure()
            .total_cmp(&sites[b].fishing_pressure())
    });

    for &idx in i_fished.iter().take(MIN_NO_TAKE) {
        let site = &mut sites[idx];
        if cfg.habitat.simple_mode {
            site.set_habitat(0, true, &cfg.model);
            site.set_habitat(1, false, &cfg.model);
        }
        site.set_no_take(true, &cfg.model);
    }

    log::info!(
        "only {n_no_take} no-take sites drawn, promoted {} more",
        i_fished.len().min(MIN_NO_TAKE)
    );
}
