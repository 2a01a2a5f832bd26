use serde::{Deserialize, Serialize};

use crate::dispatcher::EvaluationResult;
use crate::error::{ExploreError, Result};
use crate::parameters::CandidatePoint;

/// One decision criterion with its outranking thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub weight: f64,
    pub preference: f64,
    pub indifference: f64,
    /// Disadvantage beyond which the criterion vetoes outranking. `None`
    /// disables discordance on this criterion.
    pub veto: Option<f64>,
    /// Lower values are better.
    pub minimize: bool,
}

impl Criterion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 5.0,
            preference: 0.3,
            indifference: 0.1,
            veto: None,
            minimize: false,
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn thresholds(mut self, indifference: f64, preference: f64) -> Self {
        self.indifference = indifference;
        self.preference = preference;
        self
    }

    pub fn veto(mut self, veto: f64) -> Self {
        self.veto = Some(veto);
        self
    }

    pub fn minimize(mut self) -> Self {
        self.minimize = true;
        self
    }

    fn advantage(&self, a: f64, b: f64) -> f64 {
        if self.minimize {
            b - a
        } else {
            a - b
        }
    }

    /// Degree to which `a` is at least as good as `b` on this criterion.
    fn concordance(&self, a: f64, b: f64) -> f64 {
        let diff = self.advantage(a, b);
        if diff > -self.indifference {
            1.0
        } else if diff > -self.preference {
            (diff + self.preference) / (self.preference - self.indifference)
        } else {
            0.0
        }
    }

    /// Strength of this criterion's opposition to `a` outranking `b`.
    fn discordance(&self, a: f64, b: f64) -> f64 {
        let Some(veto) = self.veto else {
            return 0.0;
        };
        let diff = self.advantage(a, b);
        if diff <= -veto {
            1.0
        } else if diff < -self.preference {
            (-diff - self.preference) / (veto - self.preference)
        } else {
            0.0
        }
    }

    fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ExploreError::configuration(format!(
                "criterion '{}': {reason}",
                self.name
            )))
        };
        if self.weight.is_nan() || self.weight < 0.0 {
            return fail("weight must be non-negative");
        }
        if self.indifference < 0.0 || self.preference < self.indifference {
            return fail("thresholds must satisfy 0 <= indifference <= preference");
        }
        if matches!(self.veto, Some(veto) if veto < self.preference) {
            return fail("veto must not be below the preference threshold");
        }
        Ok(())
    }
}

/// A candidate with its criterion values, in criterion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub candidate: CandidatePoint,
    pub values: Vec<f64>,
}

impl Alternative {
    pub fn new(candidate: CandidatePoint, values: Vec<f64>) -> Self {
        Self { candidate, values }
    }
}

/// Pairwise outranking relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    /// First alternative is preferred.
    FirstPreferred,
    SecondPreferred,
    Indifferent,
    Incomparable,
}

/// Electre-style outranking decision over weighted criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electre {
    criteria: Vec<Criterion>,
    cut_threshold: f64,
}

impl Electre {
    pub fn new(criteria: Vec<Criterion>) -> Result<Self> {
        if criteria.is_empty() {
            return Err(ExploreError::configuration(
                "Electre needs at least one criterion",
            ));
        }
        for criterion in &criteria {
            criterion.validate()?;
        }
        if criteria.iter().map(|c| c.weight).sum::<f64>() <= 0.0 {
            return Err(ExploreError::configuration(
                "Electre criteria weights sum to zero",
            ));
        }
        Ok(Self {
            criteria,
            cut_threshold: 0.7,
        })
    }

    pub fn cut_threshold(mut self, cut_threshold: f64) -> Self {
        self.cut_threshold = cut_threshold;
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Alternatives built from evaluation results, each criterion reading the
    /// output of the same name. Failed results and results missing an output
    /// are left out.
    pub fn alternatives_from_results<'a, I>(&self, results: I) -> Vec<Alternative>
    where
        I: IntoIterator<Item = &'a EvaluationResult>,
    {
        results
            .into_iter()
            .filter_map(|result| {
                let values = self
                    .criteria
                    .iter()
                    .map(|criterion| result.value(&criterion.name))
                    .collect::<Option<Vec<f64>>>()?;
                Some(Alternative::new(result.candidate.clone(), values))
            })
            .collect()
    }

    /// Credibility of "`a` is at least as good as `b`".
    pub fn credibility(&self, a: &Alternative, b: &Alternative) -> f64 {
        let total_weight: f64 = self.criteria.iter().map(|c| c.weight).sum();
        let concordance = self
            .criteria
            .iter()
            .zip(a.values.iter().zip(b.values.iter()))
            .map(|(criterion, (&va, &vb))| criterion.weight * criterion.concordance(va, vb))
            .sum::<f64>()
            / total_weight;

        let mut credibility = concordance;
        for (criterion, (&va, &vb)) in self
            .criteria
            .iter()
            .zip(a.values.iter().zip(b.values.iter()))
        {
            let discordance = criterion.discordance(va, vb);
            if discordance > concordance {
                credibility *= (1.0 - discordance) / (1.0 - concordance);
            }
        }
        credibility
    }

    pub fn relation(&self, a: &Alternative, b: &Alternative) -> Relation {
        let a_over_b = self.credibility(a, b) >= self.cut_threshold;
        let b_over_a = self.credibility(b, a) >= self.cut_threshold;
        match (a_over_b, b_over_a) {
            (true, false) => Relation::FirstPreferred,
            (false, true) => Relation::SecondPreferred,
            (true, true) => Relation::Indifferent,
            (false, false) => Relation::Incomparable,
        }
    }

    /// Net outranking score of every alternative: the number of alternatives
    /// it is preferred to minus the number preferred to it.
    pub fn net_scores(&self, alternatives: &[Alternative]) -> Vec<i64> {
        let mut scores = vec![0i64; alternatives.len()];
        for i in 0..alternatives.len() {
            for j in (i + 1)..alternatives.len() {
                match self.relation(&alternatives[i], &alternatives[j]) {
                    Relation::FirstPreferred => {
                        scores[i] += 1;
                        scores[j] -= 1;
                    }
                    Relation::SecondPreferred => {
                        scores[i] -= 1;
                        scores[j] += 1;
                    }
                    Relation::Indifferent | Relation::Incomparable => {}
                }
            }
        }
        scores
    }

    /// Alternative indices ordered by decreasing net score; ties keep input order.
    pub fn ranking(&self, alternatives: &[Alternative]) -> Vec<(usize, i64)> {
        let mut ranked: Vec<(usize, i64)> =
            self.net_scores(alternatives).into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// The alternative with the highest net score; the first one on ties.
    pub fn decide<'a>(&self, alternatives: &'a [Alternative]) -> Option<&'a Alternative> {
        self.ranking(alternatives)
            .first()
            .map(|(index, _)| &alternatives[*index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::EvaluationOutcome;
    use std::collections::BTreeMap;

    fn alternative(id: i64, values: Vec<f64>) -> Alternative {
        Alternative::new(CandidatePoint::new().set("id", id), values)
    }

    fn criteria() -> Vec<Criterion> {
        vec![
            Criterion::new("profit"),
            Criterion::new("cost").minimize(),
            Criterion::new("quality").weight(2.0),
        ]
    }

    #[test]
    fn test_dominating_alternative_is_chosen() {
        let electre = Electre::new(criteria()).unwrap();
        let y = alternative(1, vec![1.0, 2.0, 1.0]);
        let x = alternative(2, vec![2.0, 1.0, 2.0]);
        let alternatives = vec![y, x.clone()];

        assert_eq!(electre.decide(&alternatives), Some(&x));
        assert_eq!(
            electre.relation(&alternatives[1], &alternatives[0]),
            Relation::FirstPreferred
        );
    }

    #[test]
    fn test_close_alternatives_are_indifferent() {
        let electre = Electre::new(criteria()).unwrap();
        let a = alternative(1, vec![1.0, 1.0, 1.0]);
        let b = alternative(2, vec![1.05, 1.0, 0.98]);
        assert_eq!(electre.relation(&a, &b), Relation::Indifferent);
        assert_eq!(electre.net_scores(&[a, b]), vec![0, 0]);
    }

    #[test]
    fn test_veto_blocks_outranking() {
        let criteria = vec![
            Criterion::new("a").weight(9.0),
            Criterion::new("b").weight(1.0).veto(1.0),
        ];
        let electre = Electre::new(criteria).unwrap();
        let strong_on_a = alternative(1, vec![10.0, 0.0]);
        let strong_on_b = alternative(2, vec![0.0, 5.0]);

        assert_eq!(electre.credibility(&strong_on_a, &strong_on_b), 0.0);
        assert_eq!(
            electre.relation(&strong_on_a, &strong_on_b),
            Relation::Incomparable
        );
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(Electre::new(vec![]).is_err());
        assert!(Electre::new(vec![Criterion::new("a").thresholds(0.5, 0.2)]).is_err());
        assert!(Electre::new(vec![Criterion::new("a").veto(0.1)]).is_err());
    }

    #[test]
    fn test_alternatives_from_results_skip_incomplete() {
        let electre = Electre::new(vec![Criterion::new("y")]).unwrap();
        let complete = EvaluationResult {
            candidate: CandidatePoint::new().set("id", 1i64),
            outcome: EvaluationOutcome::Completed(BTreeMap::from([(
                "y".to_string(),
                vec![1.0, 3.0],
            )])),
        };
        let missing = EvaluationResult {
            candidate: CandidatePoint::new().set("id", 2i64),
            outcome: EvaluationOutcome::Completed(BTreeMap::new()),
        };

        let alternatives = electre.alternatives_from_results([&complete, &missing]);

        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].values, vec![2.0]);
    }
}
