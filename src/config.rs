use crate::pipeline::Step;
use crate::settings::Settings;
use anyhow::Result;
use std::fmt;

/// Cloud targets, in the order they are deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Aws, Provider::Google];

    pub fn template_file(&self) -> &'static str {
        match self {
            Provider::Aws => "aws.pkr.hcl",
            Provider::Google => "google.pkr.hcl",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Google => "Google Cloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Packer subcommands run for every template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Init,
    Validate,
    Build,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Init, Action::Validate, Action::Build];

    pub fn subcommand(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Validate => "validate",
            Action::Build => "build",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Action::Init => "plugins installed.",
            Action::Validate => "template validated.",
            Action::Build => "image built successfully.",
        }
    }
}

/// The steps for one provider.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub provider: Provider,
    pub steps: Vec<Step>,
}

impl Sequence {
    pub fn packer(provider: Provider, settings: &Settings) -> Result<Self> {
        let template = settings.template_arg(provider.template_file())?;

        let steps = Action::ALL
            .iter()
            .map(|action| {
                Step::new(
                    action.subcommand(),
                    settings.packer.clone(),
                    vec![action.subcommand().to_string(), template.clone()],
                    format!("[{}] {}", provider.label(), action.success_message()),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { provider, steps })
    }
}

/// Every sequence of a run, AWS first.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub sequences: Vec<Sequence>,
}

impl DeployPlan {
    pub fn packer(settings: &Settings) -> Result<Self> {
        let sequences = Provider::ALL
            .iter()
            .map(|provider| Sequence::packer(*provider, settings))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { sequences })
    }

    pub fn step_count(&self) -> usize {
        self.sequences.iter().map(|s| s.steps.len()).sum()
    }
}
