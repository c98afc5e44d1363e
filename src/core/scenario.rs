//! Named scenarios: fixed sequences of steps looked up in a static table.

use serde::Serialize;
use tracing::info;

use crate::actions::{self, ActionContext, Step, StepOutcome};
use crate::error::{Error, Result};
use crate::packer::PackerAction;
use crate::runner::LineObserver;
use crate::terraform::TerraformAction;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: &'static [Step],
}

impl Scenario {
    pub fn requires_approval(&self) -> bool {
        self.steps.iter().any(Step::requires_approval)
    }
}

const IMAGE: &[Step] = &[
    Step::Packer(PackerAction::Validate),
    Step::Packer(PackerAction::Inspect),
    Step::Packer(PackerAction::Build),
];

const CHECK: &[Step] = &[
    Step::Packer(PackerAction::Validate),
    Step::Packer(PackerAction::Inspect),
];

const PROVISION: &[Step] = &[
    Step::Terraform(TerraformAction::Init),
    Step::Terraform(TerraformAction::Plan),
    Step::Terraform(TerraformAction::Apply),
];

const ALL: &[Step] = &[
    Step::Packer(PackerAction::Validate),
    Step::Packer(PackerAction::Inspect),
    Step::Packer(PackerAction::Build),
    Step::Terraform(TerraformAction::Init),
    Step::Terraform(TerraformAction::Plan),
    Step::Terraform(TerraformAction::Apply),
];

const TEARDOWN: &[Step] = &[Step::Terraform(TerraformAction::Destroy)];

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "image",
        description: "Validate, inspect and build the Packer image",
        steps: IMAGE,
    },
    Scenario {
        name: "check",
        description: "Validate and inspect the Packer template",
        steps: CHECK,
    },
    Scenario {
        name: "provision",
        description: "Initialize, plan and apply Terraform",
        steps: PROVISION,
    },
    Scenario {
        name: "all",
        description: "Build the image, then provision with Terraform",
        steps: ALL,
    },
    Scenario {
        name: "teardown",
        description: "Destroy the Terraform-managed infrastructure",
        steps: TEARDOWN,
    },
];

pub fn names() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.name.to_string()).collect()
}

pub fn find(name: &str) -> Result<&'static Scenario> {
    SCENARIOS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::scenario_not_found(name, names()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub scenario: &'static str,
    pub steps: Vec<StepOutcome>,
}

/// Run every step in order. The first failure aborts the scenario.
pub fn run(
    scenario: &'static Scenario,
    ctx: &ActionContext<'_>,
    observer: &mut dyn LineObserver,
) -> Result<ScenarioOutcome> {
    info!(scenario = scenario.name, "execute scenario < {} >", scenario.name);

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in scenario.steps {
        steps.push(actions::execute(*step, ctx, observer)?);
    }

    Ok(ScenarioOutcome {
        scenario: scenario.name,
        steps,
    })
}
