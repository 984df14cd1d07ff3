use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::config::ClassifierOptions;
use crate::error::DataContractError;
use crate::model::{DomainProfileConfig, DomainVerdict, Transcript, UNKNOWN_DOMAIN};

/// A domain profile with its keywords and patterns compiled to matchers.
#[derive(Debug, Clone)]
pub struct DomainProfile {
    pub domain_id: String,
    pub weight: f64,
    keywords: Vec<(String, Regex)>,
    patterns: Vec<Regex>,
}

impl DomainProfile {
    pub fn compile(config: &DomainProfileConfig) -> Result<Self, DataContractError> {
        let domain_id = config.domain_id.trim();
        if domain_id.is_empty() || domain_id == UNKNOWN_DOMAIN {
            return Err(DataContractError::EmptyIdentifier("domain"));
        }
        if !config.weight.is_finite() || config.weight < 0.0 {
            return Err(DataContractError::InvalidWeight {
                domain_id: domain_id.to_string(),
                weight: config.weight,
            });
        }

        let keywords = config
            .keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| {
                compile_matcher(domain_id, keyword, &keyword_expression(keyword))
                    .map(|matcher| (keyword.to_string(), matcher))
            })
            .collect::<Result<Vec<(String, Regex)>, DataContractError>>()?;

        let patterns = config
            .patterns
            .iter()
            .map(|pattern| compile_matcher(domain_id, pattern, &format!("(?i){pattern}")))
            .collect::<Result<Vec<Regex>, DataContractError>>()?;

        Ok(Self {
            domain_id: domain_id.to_string(),
            weight: config.weight,
            keywords,
            patterns,
        })
    }

    fn keyword_hits(&self, text: &str) -> (usize, Vec<String>) {
        let mut total = 0;
        let mut matched = Vec::new();
        for (keyword, matcher) in &self.keywords {
            let count = matcher.find_iter(text).count();
            if count > 0 {
                total += count;
                matched.push(keyword.clone());
            }
        }
        (total, matched)
    }

    fn pattern_hits(&self, text: &str) -> usize {
        self.patterns
            .iter()
            .map(|pattern| pattern.find_iter(text).count())
            .sum()
    }
}

pub fn compile_profiles(
    configs: &[DomainProfileConfig],
) -> Result<Vec<DomainProfile>, DataContractError> {
    if configs.is_empty() {
        return Err(DataContractError::EmptyProfileSet);
    }

    let mut seen = HashSet::new();
    let mut profiles = Vec::with_capacity(configs.len());
    for config in configs {
        let profile = DomainProfile::compile(config)?;
        if !seen.insert(profile.domain_id.clone()) {
            return Err(DataContractError::DuplicateDomain(profile.domain_id));
        }
        profiles.push(profile);
    }

    Ok(profiles)
}

fn compile_matcher(
    domain_id: &str,
    source: &str,
    expression: &str,
) -> Result<Regex, DataContractError> {
    Regex::new(expression).map_err(|error| DataContractError::InvalidPattern {
        domain_id: domain_id.to_string(),
        pattern: source.to_string(),
        message: error.to_string(),
    })
}

// Word boundaries only make sense next to word characters ("C++" has none at its end).
fn keyword_expression(keyword: &str) -> String {
    let is_word = |character: Option<char>| {
        character
            .map(|value| value.is_alphanumeric() || value == '_')
            .unwrap_or(false)
    };

    let leading = if is_word(keyword.chars().next()) {
        r"\b"
    } else {
        ""
    };
    let trailing = if is_word(keyword.chars().last()) {
        r"\b"
    } else {
        ""
    };

    format!("(?i){leading}{}{trailing}", regex::escape(keyword))
}

/// Scores `text` against every profile and picks the best-matching domain.
///
/// A profile's score is `(keyword hits * weight + pattern hits) / ln(1 + tokens)`.
/// The verdict falls back to [`UNKNOWN_DOMAIN`] when the best score is under
/// the floor or when the two best profiles tie.
pub fn classify(
    text: &str,
    profiles: &[DomainProfile],
    options: &ClassifierOptions,
) -> Result<DomainVerdict, DataContractError> {
    if profiles.is_empty() {
        return Err(DataContractError::EmptyProfileSet);
    }

    let token_count = text.split_whitespace().count();
    if token_count == 0 {
        return Ok(unknown_verdict(
            0.0,
            profiles
                .iter()
                .map(|profile| (profile.domain_id.clone(), 0.0))
                .collect(),
            profiles
                .iter()
                .map(|profile| (profile.domain_id.clone(), 0))
                .collect(),
        ));
    }

    let length_norm = (1.0 + token_count as f64).ln();
    let mut score_per_domain = BTreeMap::new();
    let mut hits_per_domain = BTreeMap::new();
    let mut matched_per_domain = BTreeMap::new();

    for profile in profiles {
        let (keyword_hits, matched) = profile.keyword_hits(text);
        let pattern_hits = profile.pattern_hits(text);
        let raw = keyword_hits as f64 * profile.weight + pattern_hits as f64;

        score_per_domain.insert(profile.domain_id.clone(), raw / length_norm);
        hits_per_domain.insert(profile.domain_id.clone(), keyword_hits + pattern_hits);
        matched_per_domain.insert(profile.domain_id.clone(), matched);
    }

    let mut ranked = score_per_domain
        .iter()
        .map(|(domain_id, score)| (domain_id.as_str(), *score))
        .collect::<Vec<(&str, f64)>>();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(right.0)));

    let top_domain = ranked[0].0.to_string();
    let top_score = ranked[0].1;
    let total: f64 = ranked.iter().map(|(_, score)| score).sum();
    let denominator = total + options.smoothing;
    let confidence = if denominator > 0.0 {
        (top_score / denominator).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let tied = ranked
        .get(1)
        .map(|(_, runner_up)| (top_score - runner_up).abs() <= options.tie_epsilon)
        .unwrap_or(false);

    if top_score < options.score_floor || tied {
        return Ok(unknown_verdict(confidence, score_per_domain, hits_per_domain));
    }

    let mut matched_keywords = matched_per_domain.remove(&top_domain).unwrap_or_default();
    matched_keywords.sort();
    matched_keywords.dedup();

    Ok(DomainVerdict {
        domain_id: top_domain,
        confidence,
        score_per_domain,
        hits_per_domain,
        matched_keywords,
    })
}

pub fn classify_transcript(
    transcript: &Transcript,
    profiles: &[DomainProfile],
    options: &ClassifierOptions,
) -> Result<DomainVerdict, DataContractError> {
    classify(&transcript.full_text(), profiles, options)
}

fn unknown_verdict(
    confidence: f64,
    score_per_domain: BTreeMap<String, f64>,
    hits_per_domain: BTreeMap<String, usize>,
) -> DomainVerdict {
    DomainVerdict {
        domain_id: UNKNOWN_DOMAIN.to_string(),
        confidence,
        score_per_domain,
        hits_per_domain,
        matched_keywords: Vec::new(),
    }
}

#[cfg(test)]
mod tests;
