//! Site and population data types.

use crate::config::ModelConfig;
use serde::Serialize;
use std::fmt;

/// Grid coordinates identifying a site.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub struct SiteId {
    pub x: usize,
    pub y: usize,
}

impl SiteId {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site-{}-{}", self.x, self.y)
    }
}

/// Site of the grid.
///
/// The biomass is derived from the other fields and is recomputed by every setter,
/// so it always agrees with the formula it was built with.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    id: SiteId,
    habitats: Vec<bool>,
    fishing_pressure: f64,
    no_take: bool,
    biomass: f64,
    selected: bool,
}

impl Site {
    /// Create a new unselected site and compute its biomass.
    pub fn new(
        id: SiteId,
        habitats: Vec<bool>,
        fishing_pressure: f64,
        no_take: bool,
        model: &ModelConfig,
    ) -> Self {
        let biomass = model.biomass(&habitats, fishing_pressure, no_take);
        Self {
            id,
            habitats,
            fishing_pressure,
            no_take,
            biomass,
            selected: false,
        }
    }

    pub fn id(&self) -> SiteId {
        self.id
    }

    pub fn habitats(&self) -> &[bool] {
        &self.habitats
    }

    pub fn fishing_pressure(&self) -> f64 {
        self.fishing_pressure
    }

    pub fn is_no_take(&self) -> bool {
        self.no_take
    }

    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Change the protection status and recompute the biomass.
    pub fn set_no_take(&mut self, no_take: bool, model: &ModelConfig) {
        self.no_take = no_take;
        self.update_biomass(model);
    }

    /// Change one habitat flag and recompute the biomass.
    pub fn set_habitat(&mut self, i_hab: usize, present: bool, model: &ModelConfig) {
        self.habitats[i_hab] = present;
        self.update_biomass(model);
    }

    /// Copy of this site with a different protection status.
    pub fn with_no_take(&self, no_take: bool, model: &ModelConfig) -> Self {
        let mut site = self.clone();
        site.set_no_take(no_take, model);
        site
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn update_biomass(&mut self, model: &ModelConfig) {
        self.biomass = model.biomass(&self.habitats, self.fishing_pressure, self.no_take);
    }
}

/// All sites of one scenario, stored row by row.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    grid_size: usize,
    sites: Vec<Site>,
}

impl Population {
    /// Build a population from sites in row-major order (`y` outer, `x` inner).
    pub fn new(grid_size: usize, sites: Vec<Site>) -> Self {
        debug_assert_eq!(sites.len(), grid_size * grid_size);
        Self { grid_size, sites }
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.index_of(id).map(|idx| &self.sites[idx])
    }

    pub fn get_mut(&mut self, id: SiteId) -> Option<&mut Site> {
        self.index_of(id).map(|idx| &mut self.sites[idx])
    }

    pub(crate) fn sites_mut(&mut self) -> &mut [Site] {
        &mut self.sites
    }

    pub fn n_no_take(&self) -> usize {
        self.sites.iter().filter(|site| site.is_no_take()).count()
    }

    fn index_of(&self, id: SiteId) -> Option<usize> {
        if id.x < self.grid_size && id.y < self.grid_size {
            Some(id.y * self.grid_size + id.x)
        } else {
            None
        }
    }
}
