/// Completion model: which steps are done, whether a draft can be sent,
/// and the small derived indicators shown next to the form.
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::schema::draft::{fields, Draft};
use crate::schema::step::{Step, StepId, STEPS};

/// Fields that must be filled before a draft can be submitted.
pub const REQUIRED_FIELDS: [&str; 3] = [fields::NAME, fields::ROLE, fields::SET];

/// Age below which the DOB warning is shown.
pub const ADULT_AGE: i32 = 18;

/// The profile step needs every required field; any other step is done
/// once one of its fields has content.
pub fn is_step_done(draft: &Draft, step: &Step) -> bool {
    match step.id {
        StepId::Profile => REQUIRED_FIELDS.iter().all(|f| draft.filled(f)),
        _ => step.fields.iter().any(|f| draft.filled(f)),
    }
}

/// Minimum content for submission. Kept separate from the profile check
/// so the gate does not depend on how steps are wired.
pub fn is_submittable(draft: &Draft) -> bool {
    draft.filled(fields::NAME) && draft.filled(fields::ROLE) && draft.filled(fields::SET)
}

/// Done flag for every step, in wizard order.
pub fn step_states(draft: &Draft) -> Vec<(StepId, bool)> {
    STEPS
        .iter()
        .map(|step| (step.id, is_step_done(draft, step)))
        .collect()
}

/// "Step X of N" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub number: usize,
    pub total: usize,
    pub percent: u32,
}

impl Progress {
    pub fn of(step: StepId) -> Self {
        let number = step.index() + 1;
        let total = STEPS.len();
        let percent = ((number as f64 / total as f64) * 100.0).round() as u32;
        Self {
            number,
            total,
            percent,
        }
    }

    pub fn label(&self) -> String {
        format!("Шаг {} из {}", self.number, self.total)
    }
}

/// Full years between `dob` and `reference`. `None` when `dob` is not
/// an ISO `YYYY-MM-DD` date.
pub fn age_at(dob: &str, reference: NaiveDate) -> Option<i32> {
    let dob = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d").ok()?;
    let mut age = reference.year() - dob.year();
    if (reference.month(), reference.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age)
}

/// Warning text when the draft's date of birth makes the character a minor.
pub fn dob_warning(draft: &Draft, reference: NaiveDate) -> Option<String> {
    let dob = draft.field(fields::DOB);
    if dob.is_empty() {
        return None;
    }
    match age_at(dob, reference) {
        Some(age) if age < ADULT_AGE => Some(format!(
            "По дате рождения персонажу {age} (меньше {ADULT_AGE}). Проверь DOB."
        )),
        _ => None,
    }
}
