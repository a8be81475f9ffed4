//! Skill co-occurrence graph, rebuilt from scratch on every run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canonical::read_snapshot;
use crate::errors::PipelineError;
use crate::models::CanonicalJob;
use crate::storage::write_json_atomic;

pub const DEFAULT_MIN_EDGE_WEIGHT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillNode {
    pub id: String,
    pub label: String,
    /// Number of jobs listing this skill.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLink {
    /// Lexicographically smaller skill of the pair.
    pub source: String,
    pub target: String,
    /// Number of jobs listing both skills.
    pub weight: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillGraph {
    pub nodes: Vec<SkillNode>,
    pub links: Vec<SkillLink>,
}

impl SkillGraph {
    pub fn export(&self, path: &Path) -> Result<(), PipelineError> {
        write_json_atomic(path, self)?;
        info!(
            "Skill graph saved to {} (nodes={} links={})",
            path.display(),
            self.nodes.len(),
            self.links.len()
        );
        Ok(())
    }
}

/// Per-job skill lists, de-duplicated within each job. Jobs with no skills are
/// skipped; an empty `skills` list falls back to splitting `skills_text`.
pub fn skill_sets(jobs: &[CanonicalJob]) -> Vec<Vec<String>> {
    jobs.iter()
        .filter_map(|job| {
            let raw: Vec<String> = if job.skills.is_empty() {
                job.skills_text
                    .replace(';', ",")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            } else {
                job.skills.iter().map(|s| s.trim().to_string()).collect()
            };
            let mut seen = HashSet::new();
            let set: Vec<String> = raw
                .into_iter()
                .filter(|s| !s.is_empty() && seen.insert(s.clone()))
                .collect();
            (!set.is_empty()).then_some(set)
        })
        .collect()
}

/// Counts node occurrences and pairwise co-occurrences, keeping only links
/// whose weight reaches `min_edge_weight`. Nodes are never filtered.
pub fn build_graph(skill_sets: &[Vec<String>], min_edge_weight: usize) -> SkillGraph {
    let mut node_counts: HashMap<&str, usize> = HashMap::new();
    let mut edge_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();

    for skills in skill_sets {
        let mut unique: Vec<&str> = skills.iter().map(String::as_str).collect();
        unique.sort_unstable();
        unique.dedup();

        for &skill in &unique {
            *node_counts.entry(skill).or_default() += 1;
        }
        for (i, &a) in unique.iter().enumerate() {
            for &b in &unique[i + 1..] {
                *edge_counts.entry((a, b)).or_default() += 1;
            }
        }
    }

    let mut nodes: Vec<SkillNode> = node_counts
        .into_iter()
        .map(|(skill, count)| SkillNode {
            id: skill.to_string(),
            label: skill.to_string(),
            count,
        })
        .collect();
    nodes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));

    let mut links: Vec<SkillLink> = edge_counts
        .into_iter()
        .filter(|(_, weight)| *weight >= min_edge_weight)
        .map(|((a, b), weight)| SkillLink {
            source: a.to_string(),
            target: b.to_string(),
            weight,
        })
        .collect();
    links.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });

    SkillGraph { nodes, links }
}

/// Reads the canonical snapshot, builds the graph and exports it to `output`.
pub fn run_graph_stage(
    input: &Path,
    output: &Path,
    min_edge_weight: usize,
) -> Result<SkillGraph, PipelineError> {
    let jobs = read_snapshot(input)?;
    let sets = skill_sets(&jobs);
    info!(
        "Building skill graph from {} of {} jobs (min_edge_weight={min_edge_weight})",
        sets.len(),
        jobs.len()
    );
    let graph = build_graph(&sets, min_edge_weight);
    graph.export(output)?;
    Ok(graph)
}
