use crate::config::{Config, clamp_site_count};
use crate::estimator::{Impacts, theoretical_impact};
use crate::generator::Generator;
use crate::model::{Population, Site, SiteId};
use anyhow::{Context, Result, bail};

/// Outcome of toggling a site.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Toggle {
    Added,
    Removed,
    /// The survey is full and the site was not added.
    CapacityExceeded,
}

/// Interactive scenario.
///
/// Owns the current population and the survey drawn from it.
/// The survey keeps sites in selection order.
pub struct Session {
    cfg: Config,
    generator: Generator,
    pop: Population,
    survey: Vec<SiteId>,
    max_selections: usize,
}

impl Session {
    /// Create a new `Session` and generate its first scenario.
    ///
    /// Without a seed the generator is seeded from the operating system.
    pub fn new(cfg: Config, seed: Option<u64>) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut generator = match seed {
            Some(seed) => Generator::from_seed(seed),
            None => Generator::from_os_rng().context("failed to construct generator")?,
        };

        let pop = generator
            .generate_population(cfg.grid.size, &cfg)
            .context("failed to generate population")?;
        let max_selections = clamp_site_count(cfg.survey.site_count);
        if max_selections as i64 != cfg.survey.site_count {
            log::warn!(
                "survey site count {} clamped to {max_selections}",
                cfg.survey.site_count
            );
        }

        Ok(Self {
            cfg,
            generator,
            pop,
            survey: Vec::new(),
            max_selections,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn population(&self) -> &Population {
        &self.pop
    }

    pub fn max_selections(&self) -> usize {
        self.max_selections
    }

    pub fn survey_ids(&self) -> &[SiteId] {
        &self.survey
    }

    /// Selected sites in selection order.
    pub fn survey_sites(&self) -> Vec<&Site> {
        self.survey
            .iter()
            .filter_map(|&id| self.pop.get(id))
            .collect()
    }

    pub(crate) fn pop_and_generator(&mut self) -> (&Population, &mut Generator) {
        (&self.pop, &mut self.generator)
    }

    /// Replace the population and clear the survey.
    pub fn new_scenario(&mut self) -> Result<()> {
        self.pop = self
            .generator
            .generate_population(self.cfg.grid.size, &self.cfg)
            .context("failed to generate population")?;
        self.survey.clear();
        log::info!("generated new scenario");
        Ok(())
    }

    /// Add the site to the survey, or remove it if already selected.
    pub fn toggle(&mut self, id: SiteId) -> Result<Toggle> {
        let size = self.pop.grid_size();
        let Some(site) = self.pop.get_mut(id) else {
            bail!("{id} is outside the {size}x{size} grid");
        };

        if let Some(idx) = self.survey.iter().position(|&sel| sel == id) {
            site.set_selected(false);
            self.survey.remove(idx);
            log::debug!("deselected {id}");
            return Ok(Toggle::Removed);
        }

        if self.survey.len() >= self.max_selections {
            log::warn!(
                "cannot select {id}, only {} sites may be selected",
                self.max_selections
            );
            return Ok(Toggle::CapacityExceeded);
        }

        site.set_selected(true);
        self.survey.push(id);
        log::debug!("selected {id}");
        Ok(Toggle::Added)
    }

    /// Change the survey capacity, clamped to the accepted range.
    ///
    /// The most recently selected sites are dropped if the survey no longer fits.
    pub fn set_site_count(&mut self, count: i64) -> usize {
        self.max_selections = clamp_site_count(count);
        if self.survey.len() > self.max_selections {
            for id in self.survey.drain(self.max_selections..) {
                if let Some(site) = self.pop.get_mut(id) {
                    site.set_selected(false);
                }
            }
        }
        self.max_selections
    }

    /// Clear the survey, keeping the population.
    pub fn reset(&mut self) {
        for site in self.pop.sites_mut() {
            site.set_selected(false);
        }
        self.survey.clear();
    }

    /// Check that the survey can produce a survey impact.
    pub fn check_ready(&self) -> Result<()> {
        let sites = self.survey_sites();
        if sites.is_empty() {
            bail!("select at least one survey site");
        }
        let has_no_take = sites.iter().any(|site| site.is_no_take());
        let has_fished = sites.iter().any(|site| !site.is_no_take());
        if !has_no_take || !has_fished {
            bail!("select at least one site inside and one site outside a no-take zone");
        }
        Ok(())
    }

    /// Compare the current survey with the whole population.
    pub fn calculate(&self) -> Impacts {
        let model = &self.cfg.model;
        if self.survey.is_empty() {
            return Impacts {
                survey: None,
                truth: None,
                theoretical: theoretical_impact(model),
                discrepancy: None,
            };
        }
        Impacts::compute(
            self.survey_sites(),
            &self.pop,
            model,
            self.cfg.estimator.true_impact,
        )
    }
}
