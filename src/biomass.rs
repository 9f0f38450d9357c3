//! Biomass generative formula.

use crate::config::{Formula, ModelConfig};

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

impl ModelConfig {
    /// Biomass of a site with the given habitat flags, fishing pressure and protection status.
    ///
    /// `habitats` must hold one flag per habitat weight.
    pub fn biomass(&self, habitats: &[bool], fishing_pressure: f64, no_take: bool) -> f64 {
        let base = self.base_biomass(habitats, fishing_pressure);
        let no_take = flag(no_take);
        match self.formula {
            Formula::Additive => base + self.no_take_weight * no_take,
            Formula::Multiplicative => base * self.no_take_weight * no_take + base,
        }
    }

    /// Habitat, interaction and fishing terms, without the protection effect.
    fn base_biomass(&self, habitats: &[bool], fishing_pressure: f64) -> f64 {
        debug_assert_eq!(habitats.len(), self.habitat_weights.len());

        let main: f64 = self
            .habitat_weights
            .iter()
            .zip(habitats)
            .map(|(&weight, &hab)| weight * flag(hab))
            .sum();

        let pairs: f64 = self
            .interactions
            .iter()
            .map(|int| int.weight * flag(habitats[int.first]) * flag(habitats[int.second]))
            .sum();

        main + pairs + self.fishing_weight * fishing_pressure
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Formula, Interaction, ModelConfig};

    const TOL: f64 = 1e-12;

    fn three_habitats() -> ModelConfig {
        ModelConfig {
            habitat_weights: vec![0.5, 0.3, 0.4],
            interactions: vec![
                Interaction { first: 0, second: 1, weight: 0.2 },
                Interaction { first: 1, second: 2, weight: 0.1 },
                Interaction { first: 0, second: 2, weight: 0.05 },
            ],
            ..ModelConfig::default()
        }
    }

    #[test]
    fn additive_worked_example() {
        let model = ModelConfig::default();
        let protected = model.biomass(&[true, false], 0.5, true);
        let fished = model.biomass(&[true, false], 0.5, false);
        assert!((protected - 0.75).abs() < TOL);
        assert!((fished - 0.35).abs() < TOL);
    }

    #[test]
    fn additive_interaction_terms() {
        let model = three_habitats();
        let val = model.biomass(&[true, true, true], 0.0, false);
        assert!((val - (0.5 + 0.3 + 0.4 + 0.2 + 0.1 + 0.05)).abs() < TOL);

        let val = model.biomass(&[false, true, true], 1.0, true);
        assert!((val - (0.3 + 0.4 + 0.1 - 0.3 + 0.4)).abs() < TOL);
    }

    #[test]
    fn empty_site_is_fishing_only() {
        let model = ModelConfig::default();
        let val = model.biomass(&[false, false], 1.0, false);
        assert!((val + 0.3).abs() < TOL);
    }

    #[test]
    fn multiplicative_scales_base() {
        let model = ModelConfig {
            formula: Formula::Multiplicative,
            ..ModelConfig::default()
        };
        // base = 0.5 + 0.3 + 0.2 - 0.3 * 0.25 = 0.925
        let fished = model.biomass(&[true, true], 0.25, false);
        let protected = model.biomass(&[true, true], 0.25, true);
        assert!((fished - 0.925).abs() < TOL);
        assert!((protected - 0.925 * 1.4).abs() < TOL);
    }

    #[test]
    fn multiplicative_zero_base_stays_zero() {
        let model = ModelConfig {
            formula: Formula::Multiplicative,
            ..ModelConfig::default()
        };
        assert_eq!(model.biomass(&[false, false], 0.0, true), 0.0);
    }
}
