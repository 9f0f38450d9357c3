use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{collections::HashSet, fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Scenario configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// Every section is optional and falls back to the classroom defaults.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub grid: GridConfig,
    pub survey: SurveyConfig,
    pub model: ModelConfig,
    pub habitat: HabitatConfig,
    pub no_take: NoTakeConfig,
    pub estimator: EstimatorConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Number of sites along each side of the grid.
    pub size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { size: 10 }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurveyConfig {
    /// Default maximum number of survey sites.
    ///
    /// Out-of-range values are clamped when a session starts.
    pub site_count: i64,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self { site_count: 10 }
    }
}

/// Biomass formula variant.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// Habitat, interaction, fishing and no-take terms are summed.
    #[default]
    Additive,
    /// No-take status scales the base biomass by `1 + d`.
    Multiplicative,
}

/// Pairwise habitat interaction term.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Interaction {
    pub first: usize,
    pub second: usize,
    pub weight: f64,
}

/// Biomass coefficients.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub formula: Formula,
    /// Main effect of each habitat (`a_k`).
    pub habitat_weights: Vec<f64>,
    /// Interaction effects (`b_jk`), one per habitat pair.
    pub interactions: Vec<Interaction>,
    /// Fishing pressure effect (`c`).
    pub fishing_weight: f64,
    /// No-take effect (`d`).
    pub no_take_weight: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            formula: Formula::Additive,
            habitat_weights: vec![0.5, 0.3],
            interactions: vec![Interaction {
                first: 0,
                second: 1,
                weight: 0.2,
            }],
            fishing_weight: -0.3,
            no_take_weight: 0.4,
        }
    }
}

impl ModelConfig {
    pub fn n_hab(&self) -> usize {
        self.habitat_weights.len()
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HabitatConfig {
    /// Presence probability of each habitat.
    pub probs: Vec<f64>,
    /// Force no-take sites to have habitat 1 and lack habitat 2.
    pub simple_mode: bool,
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            probs: vec![0.4, 0.3],
            simple_mode: false,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoTakeConfig {
    /// Target fraction of no-take sites.
    pub coverage: f64,
    /// How strongly no-take sites favour low fishing pressure.
    pub bias_strength: f64,
}

impl Default for NoTakeConfig {
    fn default() -> Self {
        Self {
            coverage: 0.2,
            bias_strength: 0.7,
        }
    }
}

/// Strategy used to compute the true impact.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TrueImpact {
    /// Mean of the nonzero counterfactual impacts of no-take sites.
    #[default]
    Counterfactual,
    /// Mean no-take biomass minus mean fished biomass over the population.
    MeanDifference,
}

#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub true_impact: TrueImpact,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub decimal_places: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { decimal_places: 2 }
    }
}

/// Bounds of the survey site count.
pub const SITE_COUNT_MIN: usize = 1;
pub const SITE_COUNT_MAX: usize = 100;

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.grid.size, 1..=100).context("invalid grid size")?;

        self.validate_model().context("invalid model coefficients")?;

        let n_hab = self.model.n_hab();
        check_probs(&self.habitat.probs, n_hab).context("invalid habitat probabilities")?;
        if self.habitat.simple_mode && n_hab < 2 {
            bail!("simple mode requires at least 2 habitats, but there are {n_hab}");
        }

        check_num(self.no_take.coverage, 0.0..=1.0).context("invalid no-take coverage")?;
        check_num(self.no_take.bias_strength, 0.0..=1.0)
            .context("invalid no-take bias strength")?;

        check_num(self.display.decimal_places, 0..=12).context("invalid decimal places")?;

        Ok(())
    }

    fn validate_model(&self) -> Result<()> {
        let model = &self.model;
        let n_hab = model.n_hab();
        check_num(n_hab, 1..=8).context("invalid number of habitats")?;

        // Every unordered pair of habitats needs exactly one interaction term.
        let mut seen = HashSet::new();
        for (i_int, int) in model.interactions.iter().enumerate() {
            if int.first >= int.second || int.second >= n_hab {
                bail!(
                    "interaction {i_int} must satisfy first < second < {n_hab}, but is ({}, {})",
                    int.first,
                    int.second
                );
            }
            if !seen.insert((int.first, int.second)) {
                bail!("interaction ({}, {}) is repeated", int.first, int.second);
            }
        }
        let n_pairs = n_hab * (n_hab - 1) / 2;
        if seen.len() != n_pairs {
            bail!("there must be {n_pairs} interactions, but there are {}", seen.len());
        }

        if model.formula == Formula::Multiplicative && n_hab != 2 {
            bail!("multiplicative formula requires 2 habitats, but there are {n_hab}");
        }

        let mut weights = model
            .habitat_weights
            .iter()
            .chain(model.interactions.iter().map(|int| &int.weight))
            .chain([&model.fishing_weight, &model.no_take_weight]);
        if weights.any(|w| !w.is_finite()) {
            bail!("coefficients must be finite");
        }

        Ok(())
    }
}

/// Clamp a requested survey site count into the accepted range.
pub fn clamp_site_count(count: i64) -> usize {
    count.clamp(SITE_COUNT_MIN as i64, SITE_COUNT_MAX as i64) as usize
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_probs(vec: &[f64], exp_len: usize) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    for (i_ele, &ele) in vec.iter().enumerate() {
        check_num(ele, 0.0..=1.0).with_context(|| format!("invalid element {i_ele}"))?;
    }
    Ok(())
}
