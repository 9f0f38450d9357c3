use crate::estimator::{Impacts, theoretical_impact};
use crate::model::{Population, Site, SiteId};
use crate::session::Session;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rand::prelude::*;
use std::{fs::File, io::BufWriter, path::Path};

/// Rule used to pick survey sites automatically.
#[derive(Debug, PartialEq, Eq, Clone, Copy, clap::ValueEnum)]
pub enum Design {
    /// Sites drawn uniformly without replacement.
    Random,
    /// Half of the sites drawn from no-take zones, half from fished sites.
    Balanced,
}

impl Design {
    /// Draw up to `n_sites` distinct sites from the population.
    pub fn draw<R>(self, pop: &Population, n_sites: usize, rng: &mut R) -> Vec<SiteId>
    where
        R: Rng + ?Sized,
    {
        match self {
            Design::Random => pop
                .sites()
                .choose_multiple(rng, n_sites)
                .map(Site::id)
                .collect(),
            Design::Balanced => {
                let (no_take, fished): (Vec<&Site>, Vec<&Site>) =
                    pop.sites().iter().partition(|site| site.is_no_take());
                let n_no_take = n_sites / 2;
                let mut ids: Vec<SiteId> = no_take
                    .choose_multiple(rng, n_no_take)
                    .map(|site| site.id())
                    .collect();
                ids.extend(
                    fished
                        .choose_multiple(rng, n_sites - n_no_take)
                        .map(|site| site.id()),
                );
                ids
            }
        }
    }
}

pub trait Obs {
    fn update(&mut self, impacts: &Impacts);
    fn report(&self) -> serde_json::Value;
}

/// Distribution of one impact value, counting replicates where it is undefined.
pub struct ImpactObs {
    name: &'static str,
    value: fn(&Impacts) -> Option<f64>,
    acc: Accumulator,
    n_undefined: usize,
}

impl ImpactObs {
    pub fn new(name: &'static str, value: fn(&Impacts) -> Option<f64>) -> Self {
        Self {
            name,
            value,
            acc: Accumulator::new(),
            n_undefined: 0,
        }
    }
}

impl Obs for ImpactObs {
    fn update(&mut self, impacts: &Impacts) {
        match (self.value)(impacts) {
            Some(val) => self.acc.add(val),
            None => self.n_undefined += 1,
        }
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            self.name: {
                "stats": self.acc.report(),
                "n_undefined": self.n_undefined,
            }
        })
    }
}

/// Signed error of the survey impact relative to the true impact.
pub struct SurveyBias {
    acc: Accumulator,
}

impl SurveyBias {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for SurveyBias {
    fn update(&mut self, impacts: &Impacts) {
        if let (Some(survey), Some(truth)) = (impacts.survey, impacts.truth) {
            self.acc.add(survey - truth);
        }
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "survey_bias": self.acc.report() })
    }
}

/// Repeated scenarios surveyed by a fixed design.
pub struct Experiment {
    session: Session,
    design: Design,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Experiment {
    pub fn new(session: Session, design: Design) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(ImpactObs::new("survey_impact", |imp| imp.survey)));
        obs_ptr_vec.push(Box::new(ImpactObs::new("true_impact", |imp| imp.truth)));
        obs_ptr_vec.push(Box::new(ImpactObs::new("discrepancy", |imp| imp.discrepancy)));
        obs_ptr_vec.push(Box::new(SurveyBias::new()));
        Self {
            session,
            design,
            obs_ptr_vec,
        }
    }

    /// Generate `n_replicates` scenarios and survey each one.
    pub fn run(&mut self, n_replicates: usize) -> Result<()> {
        let log_every = (n_replicates / 10).max(1);

        for i_rep in 0..n_replicates {
            self.session
                .new_scenario()
                .context("failed to start scenario")?;

            let n_sites = self.session.max_selections();
            let (pop, generator) = self.session.pop_and_generator();
            let ids = self.design.draw(pop, n_sites, generator.rng());
            for id in ids {
                self.session.toggle(id).context("failed to select site")?;
            }

            let impacts = self.session.calculate();
            for obs in &mut self.obs_ptr_vec {
                obs.update(&impacts);
            }

            if (i_rep + 1) % log_every == 0 {
                let progress = 100.0 * (i_rep + 1) as f64 / n_replicates as f64;
                log::info!("completed {progress:06.2}%");
            }
        }

        Ok(())
    }

    pub fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::json!({
            "design": format!("{:?}", self.design).to_lowercase(),
            "site_count": self.session.max_selections(),
            "theoretical_impact": theoretical_impact(&self.session.cfg().model),
            "observables": reports,
        })
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self.report())
            .context("failed to serialize results")?;
        Ok(())
    }
}
