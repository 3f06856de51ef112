use std::collections::HashMap;

use biovox_features::Matrix;

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub features: Matrix,
}

/// A method's template bank: named command templates plus noise templates
/// used for rejection. Immutable after load except during calibration,
/// where writes happen only on the recognition thread.
#[derive(Debug, Default)]
pub struct TemplateStore {
    commands: HashMap<String, Vec<Template>>,
    noise: Vec<Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&mut self, command: &str, name: String, features: Matrix) {
        self.commands
            .entry(command.to_string())
            .or_default()
            .push(Template { name, features });
    }

    /// Calibration's "freedom mode": replaces every prior template for
    /// `command` with the single captured segment.
    pub fn replace_templates(&mut self, command: &str, name: String, features: Matrix) {
        self.commands
            .insert(command.to_string(), vec![Template { name, features }]);
    }

    pub fn add_noise_template(&mut self, name: String, features: Matrix) {
        self.noise.push(Template { name, features });
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &[Template])> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn noise(&self) -> &[Template] {
        &self.noise
    }

    pub fn is_empty(&self) -> bool {
        self.commands.values().all(|v| v.is_empty()) && self.noise.is_empty()
    }

    pub fn template_count(&self) -> usize {
        self.commands.values().map(|v| v.len()).sum::<usize>() + self.noise.len()
    }
}
