use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{
    CodeAgreement, CodeAssignment, PairwiseAgreement, ReliabilityCounts, ReliabilityReport,
};

/// Groups assignments per rater. Raters named in `roster` that produced
/// nothing still get an (empty) entry so they show up as absent.
pub fn group_by_rater(
    assignments: &[CodeAssignment],
    roster: &[String],
) -> BTreeMap<String, Vec<CodeAssignment>> {
    let mut grouped = roster
        .iter()
        .map(|rater_id| (rater_id.clone(), Vec::new()))
        .collect::<BTreeMap<String, Vec<CodeAssignment>>>();

    for assignment in assignments {
        grouped
            .entry(assignment.rater_id.clone())
            .or_default()
            .push(assignment.clone());
    }

    grouped
}

pub fn code_space_of(assignments: &[CodeAssignment]) -> BTreeSet<String> {
    assignments
        .iter()
        .map(|assignment| assignment.code.clone())
        .collect()
}

/// What a single rater did: which utterances it looked at, and which
/// (utterance, code) pairs it marked present.
struct RaterMarks<'a> {
    touched: BTreeSet<&'a str>,
    present: HashSet<(&'a str, &'a str)>,
    codes: HashSet<&'a str>,
}

impl<'a> RaterMarks<'a> {
    fn collect(assignments: &'a [CodeAssignment], code_space: &BTreeSet<String>) -> Self {
        let mut marks = Self {
            touched: BTreeSet::new(),
            present: HashSet::new(),
            codes: HashSet::new(),
        };

        for assignment in assignments {
            marks.touched.insert(assignment.utterance_id.as_str());
            if code_space.contains(&assignment.code) {
                marks
                    .present
                    .insert((assignment.utterance_id.as_str(), assignment.code.as_str()));
                marks.codes.insert(assignment.code.as_str());
            }
        }

        marks
    }

    fn is_active(&self) -> bool {
        !self.touched.is_empty()
    }

    fn has(&self, utterance_id: &str, code: &str) -> bool {
        self.present.contains(&(utterance_id, code))
    }

    fn applies(&self, code: &str) -> bool {
        self.codes.contains(code)
    }
}

/// Running sums over binary items rated by the same `raters` raters.
#[derive(Debug, Default)]
struct BinaryTally {
    raters: usize,
    items: usize,
    present_values: usize,
    absent_values: usize,
    disagreement_sum: f64,
    fleiss_agreement_sum: f64,
}

impl BinaryTally {
    fn new(raters: usize) -> Self {
        Self {
            raters,
            ..Self::default()
        }
    }

    fn add_item(&mut self, present: usize) {
        let m = self.raters;
        if m < 2 {
            return;
        }
        let absent = m - present;

        self.items += 1;
        self.present_values += present;
        self.absent_values += absent;
        self.disagreement_sum += 2.0 * (present * absent) as f64 / (m - 1) as f64;
        self.fleiss_agreement_sum += (present * present.saturating_sub(1)
            + absent * absent.saturating_sub(1)) as f64
            / (m * (m - 1)) as f64;
    }

    fn pairable_values(&self) -> usize {
        self.present_values + self.absent_values
    }

    fn observed_disagreement(&self) -> Option<f64> {
        let n = self.pairable_values();
        if n < 2 {
            return None;
        }
        Some(self.disagreement_sum / n as f64)
    }

    fn expected_disagreement(&self) -> Option<f64> {
        let n = self.pairable_values();
        if n < 2 {
            return None;
        }
        Some(
            2.0 * (self.present_values * self.absent_values) as f64
                / (n as f64 * (n - 1) as f64),
        )
    }

    /// Krippendorff's alpha for nominal data. Undefined when the values show
    /// no variation at all (expected disagreement of zero).
    fn alpha(&self) -> Option<f64> {
        let observed = self.observed_disagreement()?;
        let expected = self.expected_disagreement()?;
        if expected <= 0.0 {
            return None;
        }
        Some(1.0 - observed / expected)
    }

    fn fleiss_kappa(&self) -> Option<f64> {
        if self.items == 0 || self.raters < 2 {
            return None;
        }
        let mean_agreement = self.fleiss_agreement_sum / self.items as f64;
        let present_share = self.present_values as f64 / self.pairable_values() as f64;
        let chance = present_share.powi(2) + (1.0 - present_share).powi(2);
        chance_corrected(mean_agreement, chance)
    }
}

fn chance_corrected(observed: f64, chance: f64) -> Option<f64> {
    let headroom = 1.0 - chance;
    if headroom.abs() < f64::EPSILON {
        return None;
    }
    Some((observed - chance) / headroom)
}

/// Per-code counts for one rater pair over the utterances either touched.
#[derive(Debug, Default, Clone, Copy)]
struct PairCodeCounts {
    agreed: usize,
    compared: usize,
    a_present: usize,
    b_present: usize,
}

fn pair_code_counts(
    left: &RaterMarks<'_>,
    right: &RaterMarks<'_>,
    touched: &BTreeSet<&str>,
    code: &str,
) -> Option<PairCodeCounts> {
    if !left.applies(code) && !right.applies(code) {
        return None;
    }

    let mut counts = PairCodeCounts {
        compared: touched.len(),
        ..PairCodeCounts::default()
    };
    for utterance_id in touched {
        let a = left.has(utterance_id, code);
        let b = right.has(utterance_id, code);
        if a == b {
            counts.agreed += 1;
        }
        if a {
            counts.a_present += 1;
        }
        if b {
            counts.b_present += 1;
        }
    }

    Some(counts)
}

/// Computes inter-rater reliability over binary (utterance, code) items.
///
/// Every code in `code_space` is an independent present/absent judgment on
/// each utterance some active rater touched. A rater is active once it
/// produced at least one assignment; fewer than two active raters leaves
/// every chance-corrected statistic undefined.
pub fn compute(
    per_rater: &BTreeMap<String, Vec<CodeAssignment>>,
    code_space: &BTreeSet<String>,
) -> ReliabilityReport {
    let marks = per_rater
        .iter()
        .map(|(rater_id, assignments)| {
            (
                rater_id.as_str(),
                RaterMarks::collect(assignments, code_space),
            )
        })
        .collect::<BTreeMap<&str, RaterMarks<'_>>>();

    let active = marks
        .iter()
        .filter(|(_, rater)| rater.is_active())
        .map(|(_, rater)| rater)
        .collect::<Vec<&RaterMarks<'_>>>();

    let item_utterances = active
        .iter()
        .flat_map(|rater| rater.touched.iter().copied())
        .collect::<BTreeSet<&str>>();

    let mut overall = BinaryTally::new(active.len());
    let mut per_code_agreement = BTreeMap::new();

    for code in code_space {
        let mut code_tally = BinaryTally::new(active.len());
        let mut utterances_applied = 0;

        for utterance_id in &item_utterances {
            let present = active
                .iter()
                .filter(|rater| rater.has(utterance_id, code))
                .count();
            if present > 0 {
                utterances_applied += 1;
            }
            overall.add_item(present);
            code_tally.add_item(present);
        }

        let contributing_raters = active.iter().filter(|rater| rater.applies(code)).count();

        let mut agreed = 0;
        let mut compared = 0;
        for (index, left) in active.iter().enumerate() {
            for right in &active[index + 1..] {
                let touched = left
                    .touched
                    .union(&right.touched)
                    .copied()
                    .collect::<BTreeSet<&str>>();
                if let Some(counts) = pair_code_counts(left, right, &touched, code) {
                    agreed += counts.agreed;
                    compared += counts.compared;
                }
            }
        }

        let defined = contributing_raters >= 2 && compared > 0;
        per_code_agreement.insert(
            code.clone(),
            CodeAgreement {
                agreement: defined.then(|| agreed as f64 / compared as f64),
                alpha: if contributing_raters >= 2 {
                    code_tally.alpha()
                } else {
                    None
                },
                contributing_raters,
                utterances_applied,
                agreed,
                compared,
            },
        );
    }

    let rater_ids = marks.keys().copied().collect::<Vec<&str>>();
    let mut pairwise = Vec::new();
    for (index, rater_a) in rater_ids.iter().enumerate() {
        for rater_b in &rater_ids[index + 1..] {
            pairwise.push(pairwise_agreement(
                rater_a,
                &marks[rater_a],
                rater_b,
                &marks[rater_b],
                code_space,
            ));
        }
    }

    ReliabilityReport {
        overall_alpha: overall.alpha(),
        fleiss_kappa: overall.fleiss_kappa(),
        pairwise,
        per_code_agreement,
        counts: ReliabilityCounts {
            rater_ids: rater_ids.iter().map(|rater_id| rater_id.to_string()).collect(),
            active_raters: active.len(),
            item_count: overall.items,
            pairable_values: overall.pairable_values(),
            observed_disagreement: overall.observed_disagreement(),
            expected_disagreement: overall.expected_disagreement(),
        },
    }
}

fn pairwise_agreement(
    rater_a: &str,
    left: &RaterMarks<'_>,
    rater_b: &str,
    right: &RaterMarks<'_>,
    code_space: &BTreeSet<String>,
) -> PairwiseAgreement {
    let mut pair = PairwiseAgreement {
        rater_a: rater_a.to_string(),
        rater_b: rater_b.to_string(),
        agreement: None,
        cohen_kappa: None,
        agreed: 0,
        compared: 0,
        per_code: code_space
            .iter()
            .map(|code| (code.clone(), None))
            .collect(),
    };

    if !left.is_active() || !right.is_active() {
        return pair;
    }

    let touched = left
        .touched
        .union(&right.touched)
        .copied()
        .collect::<BTreeSet<&str>>();

    let mut a_present = 0;
    let mut b_present = 0;
    for code in code_space {
        let Some(counts) = pair_code_counts(left, right, &touched, code) else {
            continue;
        };
        pair.per_code.insert(
            code.clone(),
            Some(counts.agreed as f64 / counts.compared as f64),
        );
        pair.agreed += counts.agreed;
        pair.compared += counts.compared;
        a_present += counts.a_present;
        b_present += counts.b_present;
    }

    if pair.compared > 0 {
        let compared = pair.compared as f64;
        let observed = pair.agreed as f64 / compared;
        let a_share = a_present as f64 / compared;
        let b_share = b_present as f64 / compared;
        let chance = a_share * b_share + (1.0 - a_share) * (1.0 - b_share);

        pair.agreement = Some(observed);
        pair.cohen_kappa = chance_corrected(observed, chance);
    }

    pair
}
