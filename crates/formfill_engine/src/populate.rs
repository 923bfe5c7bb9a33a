use formfill_core::{FieldValue, FieldValues};
use formfill_logging::{fill_debug, fill_warn};
use serde::Serialize;

use crate::form::{ControlKind, LiveForm};

const TRUTHY: [&str; 4] = ["true", "yes", "on", "1"];
const FALSY: [&str; 4] = ["false", "no", "off", "0"];

/// Which fields of one batch were written and which were skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PopulateReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

enum Outcome {
    Applied,
    Skipped(&'static str),
}

/// Apply a batch of decoded values to the live form.
///
/// May be called repeatedly during one job; applying the same batch twice
/// leaves the form in the same state as applying it once. Names that match
/// nothing are logged and skipped.
pub fn populate(form: &mut LiveForm, values: &FieldValues) -> PopulateReport {
    let mut report = PopulateReport::default();
    for (name, value) in values {
        let outcome = if let Some(group) = form.group_index(name) {
            let members = form.group_members(group);
            check_matching(form, &members, value)
        } else {
            let targets = form.top_level_named(name);
            match targets.first() {
                None => Outcome::Skipped("no control with this name"),
                Some(_) if targets.iter().all(|index| form.control(*index).kind.is_toggle()) => {
                    apply_to_toggles(form, &targets, value)
                }
                Some(first) => apply_scalar(form, *first, value),
            }
        };

        match outcome {
            Outcome::Applied => {
                fill_debug!("populated field `{}`", name);
                report.applied.push(name.clone());
            }
            Outcome::Skipped(reason) => {
                fill_warn!("skipping field `{}`: {}", name, reason);
                report.skipped.push(name.clone());
            }
        }
    }
    report
}

fn apply_scalar(form: &mut LiveForm, index: usize, value: &FieldValue) -> Outcome {
    // Lists only ever apply to groups.
    let Some(text) = value.as_single() else {
        return Outcome::Skipped("list value for a single control");
    };
    let control = form.control(index);
    if control.kind == ControlKind::Select {
        let Some(option) = control
            .options
            .iter()
            .find(|option| same_text(&option.value, text) || same_text(&option.text, text))
        else {
            return Outcome::Skipped("no matching option");
        };
        let option_value = option.value.clone();
        form.set_value(index, &option_value);
    } else {
        form.set_value(index, text);
    }
    Outcome::Applied
}

fn apply_to_toggles(form: &mut LiveForm, targets: &[usize], value: &FieldValue) -> Outcome {
    if let [single] = targets {
        if form.control(*single).kind == ControlKind::Checkbox {
            if let Some(flag) = value.as_single().and_then(boolean_like) {
                form.set_checked(*single, flag);
                return Outcome::Applied;
            }
        }
    }
    check_matching(form, targets, value)
}

/// Check every member whose value or label matches one of the candidates.
fn check_matching(form: &mut LiveForm, members: &[usize], value: &FieldValue) -> Outcome {
    let mut matched = false;
    for candidate in value.candidates() {
        let hit = members.iter().copied().find(|index| {
            let control = form.control(*index);
            control.kind.is_toggle()
                && (same_text(&control.value, candidate)
                    || control
                        .label
                        .as_deref()
                        .is_some_and(|label| same_text(label, candidate)))
        });
        if let Some(index) = hit {
            form.set_checked(index, true);
            matched = true;
        }
    }
    if matched {
        Outcome::Applied
    } else {
        Outcome::Skipped("no matching option")
    }
}

fn boolean_like(text: &str) -> Option<bool> {
    let lowered = text.trim().to_ascii_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSY.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn same_text(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
