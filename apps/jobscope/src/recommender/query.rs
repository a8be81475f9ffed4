//! Query side of the recommender: ranking plus per-match explanations.
//!
//! Queries never fail. An out-of-vocabulary profile scores zero everywhere and
//! every match falls back to its own skill list as the explanation.

use serde::{Deserialize, Serialize};

use crate::models::Source;
use crate::recommender::index::RecommenderIndex;
use crate::recommender::sparse::SparseView;
use crate::recommender::vectorizer::TfidfVectorizer;

/// Maximum number of reasons attached to one match.
pub const MAX_REASONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub source: Source,
    pub source_url: Option<String>,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Terms nonzero in both vectors, ranked by the product of their weights
/// (descending, ties by column). At most `top_n` are returned.
pub fn explain_overlap(
    query: SparseView<'_>,
    doc: SparseView<'_>,
    vocabulary: &TfidfVectorizer,
    top_n: usize,
) -> Vec<String> {
    let mut shared: Vec<(usize, f64)> = query
        .intersection(doc)
        .into_iter()
        .map(|(col, q, d)| (col, q * d))
        .collect();
    shared.sort_by(|a, b| b.1.total_cmp(&a.1));
    shared
        .into_iter()
        .filter_map(|(col, _)| vocabulary.term(col).map(String::from))
        .take(top_n)
        .collect()
}

/// First `top_n` comma-separated entries of a `skills_text` value.
pub fn skill_reasons(skills_text: &str, top_n: usize) -> Vec<String> {
    skills_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(top_n)
        .map(String::from)
        .collect()
}

impl RecommenderIndex {
    /// Ranks every indexed job against `profile` and returns the best `top_k`.
    pub fn recommend(&self, profile: &str, top_k: usize) -> Vec<Recommendation> {
        let query = self.vectorizer.transform(profile);
        let query = query.view();

        let mut scored: Vec<(usize, f64)> = (0..self.matrix.n_rows())
            .map(|row| {
                let score = if query.nnz() == 0 {
                    0.0
                } else {
                    query.dot(self.matrix.row(row))
                };
                (row, score)
            })
            .collect();
        // stable: equal scores keep row order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(top_k)
            .map(|(row, score)| {
                let meta = &self.jobs[row];
                let mut reasons =
                    explain_overlap(query, self.matrix.row(row), &self.vectorizer, MAX_REASONS);
                if reasons.is_empty() {
                    reasons = skill_reasons(&meta.skills_text, MAX_REASONS);
                }
                Recommendation {
                    job_id: meta.job_id.clone(),
                    title: meta.title.clone(),
                    company: meta.company.clone(),
                    source: meta.source,
                    source_url: meta.source_url.clone(),
                    score,
                    reasons,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::index::tests::fixture_jobs;
    use crate::recommender::sparse::SparseVector;

    fn index() -> RecommenderIndex {
        RecommenderIndex::build(&fixture_jobs(), 1_000).unwrap()
    }

    #[test]
    fn test_explain_overlap_ranks_by_weight_product() {
        let vocabulary = TfidfVectorizer {
            max_features: 10,
            terms: ["airflow", "python", "spark", "sql"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            idf: vec![1.0; 4],
        };
        let q = SparseVector::from_pairs(vec![(0, 0.2), (1, 0.9), (3, 0.5)]);
        let d = SparseVector::from_pairs(vec![(0, 0.9), (1, 0.5), (2, 0.7)]);
        assert_eq!(
            explain_overlap(q.view(), d.view(), &vocabulary, 5),
            vec!["python", "airflow"]
        );
        assert_eq!(explain_overlap(q.view(), d.view(), &vocabulary, 1), vec!["python"]);
    }

    #[test]
    fn test_skill_reasons_takes_first_five() {
        assert_eq!(
            skill_reasons("A, B,, C ,D,E,F", 5),
            vec!["A", "B", "C", "D", "E"]
        );
        assert!(skill_reasons("", 5).is_empty());
    }

    #[test]
    fn test_title_query_ranks_that_job_first() {
        let recs = index().recommend("Data Engineer", 10);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].title.as_deref(), Some("Data Engineer"));
        assert!(recs[0].score > 0.0);
        assert!(recs[0].reasons.contains(&"engineer".to_string()));
        assert!(recs[0].reasons.contains(&"data".to_string()));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_out_of_vocabulary_query_falls_back_to_skills() {
        let recs = index().recommend("zzqx blorf", 10);
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.score == 0.0));
        let titles: Vec<_> = recs.iter().map(|r| r.title.as_deref().unwrap()).collect();
        assert_eq!(titles, vec!["Backend Developer", "Data Engineer", "Marketing Analyst"]);
        assert_eq!(recs[0].reasons, vec!["Go", "PostgreSQL"]);
        assert_eq!(recs[1].reasons, vec!["Python", "Spark", "Airflow"]);
    }

    #[test]
    fn test_top_k_truncates() {
        let index = index();
        assert_eq!(index.recommend("analyst excel", 1).len(), 1);
        assert_eq!(
            index.recommend("analyst excel", 1)[0].title.as_deref(),
            Some("Marketing Analyst")
        );
        assert!(index.recommend("analyst", 0).is_empty());
    }
}
