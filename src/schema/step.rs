use serde::{Deserialize, Serialize};

use super::draft::fields;

/// The six wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Profile,
    Backstory,
    Traits,
    Connections,
    Goals,
    Scenes,
}

impl StepId {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Backstory => "backstory",
            Self::Traits => "traits",
            Self::Connections => "connections",
            Self::Goals => "goals",
            Self::Scenes => "scenes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        STEPS
            .iter()
            .map(|step| step.id)
            .find(|id| id.name() == s.trim().to_lowercase())
    }

    /// Position of this step in the wizard (0-based).
    pub fn index(&self) -> usize {
        match self {
            Self::Profile => 0,
            Self::Backstory => 1,
            Self::Traits => 2,
            Self::Connections => 3,
            Self::Goals => 4,
            Self::Scenes => 5,
        }
    }

    pub fn step(&self) -> &'static Step {
        &STEPS[self.index()]
    }
}

/// One page of the wizard and the draft fields it governs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    /// View the host navigates to for this step.
    pub href: &'static str,
    pub fields: &'static [&'static str],
}

pub static STEPS: [Step; 6] = [
    Step {
        id: StepId::Profile,
        href: "sheet_profile.html",
        fields: &[
            fields::NAME,
            fields::ALIAS,
            fields::DOB,
            fields::ROLE,
            fields::SET,
            fields::TAGS,
        ],
    },
    Step {
        id: StepId::Backstory,
        href: "sheet_backstory.html",
        fields: &[fields::BACKSTORY],
    },
    Step {
        id: StepId::Traits,
        href: "sheet_traits.html",
        fields: &[fields::TRAITS, fields::LIMITS],
    },
    Step {
        id: StepId::Connections,
        href: "sheet_connections.html",
        fields: &[fields::CONNECTIONS],
    },
    Step {
        id: StepId::Goals,
        href: "sheet_goals.html",
        fields: &[fields::GOALS, fields::SECRET],
    },
    Step {
        id: StepId::Scenes,
        href: "sheet_scenes.html",
        fields: &[fields::WISHES],
    },
];
