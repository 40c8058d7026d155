use super::container::{FlatRegistry, Keyed};
use super::UnlocalizedString;
use tracing::warn;

/// An opt-in feature that is off until enabled in the settings
#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub unlocalized_name: UnlocalizedString,
    pub unlocalized_description: UnlocalizedString,
    pub enabled: bool,
}

impl Keyed for Experiment {
    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
pub struct Experiments {
    experiments: FlatRegistry<Experiment>,
}

impl Experiments {
    /// Register an experiment. A second registration under the same name is ignored.
    pub fn add_experiment(
        &mut self,
        name: impl Into<String>,
        unlocalized_name: impl Into<UnlocalizedString>,
        unlocalized_description: impl Into<UnlocalizedString>,
    ) {
        let name = name.into();
        if self.experiments.find(&name).is_some() {
            warn!("Experiment '{}' is already registered", name);
            return;
        }

        self.experiments.add(Experiment {
            name,
            unlocalized_name: unlocalized_name.into(),
            unlocalized_description: unlocalized_description.into(),
            enabled: false,
        });
    }

    /// Returns false if no experiment is registered under `name`
    pub fn enable_experiment(&mut self, name: &str, enabled: bool) -> bool {
        match self.experiments.find_mut(name) {
            Some(experiment) => {
                experiment.enabled = enabled;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_experiment_enabled(&self, name: &str) -> bool {
        self.experiments.find(name).is_some_and(|experiment| experiment.enabled)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.experiments.find(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.iter()
    }

    pub fn clear(&mut self) {
        self.experiments.clear();
    }
}
