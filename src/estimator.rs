//! Impact estimators.
//!
//! Every estimator returns `None` when a required group of sites is empty.
//! `None` means "not computable" and must never be shown as zero.

use crate::config::{Formula, ModelConfig, TrueImpact};
use crate::model::{Population, Site};

/// Mean no-take biomass minus mean fished biomass.
///
/// This is what an analyst computes from a convenience sample.
pub fn survey_impact<'a, I>(sites: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Site>,
{
    let mut no_take = (0usize, 0.0);
    let mut fished = (0usize, 0.0);
    for site in sites {
        let group = if site.is_no_take() {
            &mut no_take
        } else {
            &mut fished
        };
        group.0 += 1;
        group.1 += site.biomass();
    }
    if no_take.0 == 0 || fished.0 == 0 {
        return None;
    }
    Some(no_take.1 / no_take.0 as f64 - fished.1 / fished.0 as f64)
}

/// Biomass gained by a site through its protection.
///
/// Zero for fished sites. Evaluated on a copy, the site is left untouched.
pub fn counterfactual_impact(site: &Site, model: &ModelConfig) -> f64 {
    if !site.is_no_take() {
        return 0.0;
    }
    let fished = site.with_no_take(false, model);
    site.biomass() - fished.biomass()
}

/// Closed-form protection effect of the additive formula.
///
/// The multiplicative effect depends on each site's base biomass, so it has
/// no closed form.
pub fn theoretical_impact(model: &ModelConfig) -> Option<f64> {
    match model.formula {
        Formula::Additive => Some(model.no_take_weight),
        Formula::Multiplicative => None,
    }
}

/// Absolute gap between the survey and true impacts.
pub fn discrepancy(survey_impact: Option<f64>, true_impact: Option<f64>) -> Option<f64> {
    Some((survey_impact? - true_impact?).abs())
}

impl TrueImpact {
    /// Population-level protection effect according to this strategy.
    pub fn estimate(self, pop: &Population, model: &ModelConfig) -> Option<f64> {
        match self {
            TrueImpact::Counterfactual => {
                if pop.n_no_take() == 0 {
                    return None;
                }
                let impacts: Vec<f64> = pop
                    .sites()
                    .iter()
                    .map(|site| counterfactual_impact(site, model))
                    .filter(|&impact| impact != 0.0)
                    .collect();
                // Protection without any effect.
                if impacts.is_empty() {
                    return Some(0.0);
                }
                Some(impacts.iter().sum::<f64>() / impacts.len() as f64)
            }
            TrueImpact::MeanDifference => survey_impact(pop.sites()),
        }
    }
}

/// Results of one impact calculation.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Impacts {
    pub survey: Option<f64>,
    pub truth: Option<f64>,
    pub theoretical: Option<f64>,
    pub discrepancy: Option<f64>,
}

impl Impacts {
    /// Compare a survey against its population.
    pub fn compute<'a, I>(
        survey: I,
        pop: &Population,
        model: &ModelConfig,
        strategy: TrueImpact,
    ) -> Self
    where
        I: IntoIterator<Item = &'a Site>,
    {
        let survey = survey_impact(survey);
        let truth = strategy.estimate(pop, model);
        Self {
            survey,
            truth,
            theoretical: theoretical_impact(model),
            discrepancy: discrepancy(survey, truth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SiteId;

    const TOL: f64 = 1e-12;

    fn site(
        x: usize,
        habitats: &[bool],
        fishing_pressure: f64,
        no_take: bool,
        model: &ModelConfig,
    ) -> Site {
        let id = SiteId::new(x, 0);
        Site::new(id, habitats.to_vec(), fishing_pressure, no_take, model)
    }

    fn two_sites(model: &ModelConfig) -> Vec<Site> {
        vec![
            site(0, &[true, false], 0.5, true, model),
            site(1, &[true, false], 0.5, false, model),
        ]
    }

    #[test]
    fn survey_impact_worked_example() {
        let model = ModelConfig::default();
        let sites = two_sites(&model);
        let impact = survey_impact(&sites).unwrap();
        assert!((impact - 0.4).abs() < TOL);
    }

    #[test]
    fn survey_impact_averages_groups() {
        let model = ModelConfig::default();
        let sites = vec![
            site(0, &[true, true], 0.0, true, &model),
            site(1, &[false, false], 0.0, true, &model),
            site(2, &[false, true], 1.0, false, &model),
        ];
        // no-take: (1.0 + 0.4) and 0.4, fished: 0.3 - 0.3
        let expected = (1.4 + 0.4) / 2.0 - 0.0;
        assert!((survey_impact(&sites).unwrap() - expected).abs() < TOL);
    }

    #[test]
    fn survey_impact_needs_both_groups() {
        let model = ModelConfig::default();
        let sites = two_sites(&model);
        assert_eq!(survey_impact(&sites[..1]), None);
        assert_eq!(survey_impact(&sites[1..]), None);
        assert_eq!(survey_impact(&Vec::<Site>::new()), None);
    }

    #[test]
    fn counterfactual_of_fished_is_zero() {
        let model = ModelConfig::default();
        let fished = site(0, &[true, true], 0.2, false, &model);
        assert_eq!(counterfactual_impact(&fished, &model), 0.0);
    }

    #[test]
    fn additive_counterfactual_is_no_take_weight() {
        let model = ModelConfig::default();
        for habitats in [[false, false], [true, false], [false, true], [true, true]] {
            for fishing_pressure in [0.0, 0.25, 0.5, 1.0] {
                let protected = site(0, &habitats, fishing_pressure, true, &model);
                let impact = counterfactual_impact(&protected, &model);
                assert!((impact - theoretical_impact(&model).unwrap()).abs() < TOL);
                assert!(protected.is_no_take());
            }
        }
    }

    #[test]
    fn multiplicative_counterfactual_scales() {
        let model = ModelConfig {
            formula: Formula::Multiplicative,
            ..ModelConfig::default()
        };
        let protected = site(0, &[true, false], 0.5, true, &model);
        // base = 0.5 - 0.15 = 0.35
        assert!((counterfactual_impact(&protected, &model) - 0.35 * 0.4).abs() < TOL);
    }

    #[test]
    fn discrepancy_needs_both() {
        assert_eq!(discrepancy(None, Some(0.4)), None);
        assert_eq!(discrepancy(Some(0.4), None), None);
        assert!((discrepancy(Some(0.1), Some(0.4)).unwrap() - 0.3).abs() < TOL);
        assert!((discrepancy(Some(0.4), Some(0.1)).unwrap() - 0.3).abs() < TOL);
    }

    fn population(model: &ModelConfig) -> Population {
        let mut sites = Vec::new();
        for y in 0..2 {
            for x in 0..2 {
                let no_take = x == 1;
                let fishing_pressure = 1.0 - x as f64;
                let habitats = vec![y == 0, false];
                let id = SiteId::new(x, y);
                sites.push(Site::new(id, habitats, fishing_pressure, no_take, model));
            }
        }
        Population::new(2, sites)
    }

    #[test]
    fn true_impact_strategies() {
        let model = ModelConfig::default();
        let pop = population(&model);

        let counterfactual = TrueImpact::Counterfactual.estimate(&pop, &model).unwrap();
        assert!((counterfactual - 0.4).abs() < TOL);

        // Protected sites sit where fishing pressure is zero, inflating the naive gap.
        let mean_diff = TrueImpact::MeanDifference.estimate(&pop, &model).unwrap();
        assert!((mean_diff - 0.7).abs() < TOL);
    }

    #[test]
    fn true_impact_without_protection() {
        let model = ModelConfig::default();
        let sites = vec![
            site(0, &[true, false], 1.0, false, &model),
            site(1, &[false, false], 0.0, false, &model),
        ]
        .into_iter()
        .chain((0..2).map(|x| {
            Site::new(SiteId::new(x, 1), vec![false, true], 0.5, false, &model)
        }))
        .collect();
        let pop = Population::new(2, sites);
        assert_eq!(TrueImpact::Counterfactual.estimate(&pop, &model), None);
        assert_eq!(TrueImpact::MeanDifference.estimate(&pop, &model), None);
    }

    #[test]
    fn counterfactual_skips_zero_impacts() {
        let model = ModelConfig {
            formula: Formula::Multiplicative,
            fishing_weight: 0.0,
            ..ModelConfig::default()
        };
        let pop = population(&model);
        // Only the protected site with habitat 1 has a nonzero base biomass.
        let impact = TrueImpact::Counterfactual.estimate(&pop, &model).unwrap();
        assert!((impact - 0.5 * 0.4).abs() < TOL);
    }

    #[test]
    fn estimators_are_idempotent() {
        let model = ModelConfig::default();
        let pop = population(&model);
        let first = Impacts::compute(pop.sites(), &pop, &model, TrueImpact::Counterfactual);
        let second = Impacts::compute(pop.sites(), &pop, &model, TrueImpact::Counterfactual);
        assert_eq!(first, second);
        assert_eq!(first.theoretical, Some(0.4));
    }

    #[test]
    fn zero_effect_protection_is_zero() {
        let model = ModelConfig {
            no_take_weight: 0.0,
            ..ModelConfig::default()
        };
        let pop = population(&model);
        assert_eq!(pop.n_no_take(), 2);
        assert_eq!(TrueImpact::Counterfactual.estimate(&pop, &model), Some(0.0));

        let impacts = Impacts::compute(pop.sites(), &pop, &model, TrueImpact::Counterfactual);
        let survey = impacts.survey.unwrap();
        assert_eq!(impacts.discrepancy, Some(survey.abs()));
    }

    #[test]
    fn multiplicative_has_no_theory() {
        let model = ModelConfig {
            formula: Formula::Multiplicative,
            ..ModelConfig::default()
        };
        assert_eq!(theoretical_impact(&model), None);
        let pop = population(&model);
        let impacts = Impacts::compute(pop.sites(), &pop, &model, TrueImpact::Counterfactual);
        assert_eq!(impacts.theoretical, None);
        assert!(impacts.truth.is_some());
    }
}
