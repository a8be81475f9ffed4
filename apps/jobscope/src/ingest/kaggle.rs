//! LinkedIn-style Kaggle postings. Skills come from the dataset's own
//! `job_skills.csv` ⨝ `mappings/skills.csv` join when those files exist.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::ingest::columns::{ColumnResolver, LogicalField, RawJob};
use crate::ingest::parse::{normalize_native_id, split_skill_field};
use crate::ingest::raw::read_raw_table;
use crate::ingest::SourceCleaner;
use crate::models::Source;
use crate::skills::SkillNormalizer;

/// Native job id → distinct skill names, already sorted.
pub type SkillLookup = HashMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default)]
pub struct KaggleCleaner {
    lookup: Option<SkillLookup>,
}

impl KaggleCleaner {
    /// Cleaner without the auxiliary join; skills come from free text.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(lookup: SkillLookup) -> Self {
        KaggleCleaner {
            lookup: Some(lookup),
        }
    }

    /// Loads the skills join from the directory holding `input`. Missing
    /// auxiliary files are not an error.
    pub fn for_input(input: &Path) -> Result<Self, PipelineError> {
        let root = if input.is_dir() {
            input.to_path_buf()
        } else {
            input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };
        Ok(match load_skill_lookup(&root)? {
            Some(lookup) => Self::with_lookup(lookup),
            None => Self::new(),
        })
    }
}

impl SourceCleaner for KaggleCleaner {
    fn source(&self) -> Source {
        Source::Kaggle
    }

    fn resolver(&self) -> ColumnResolver {
        ColumnResolver::standard()
            .field(LogicalField::SourceJobId, &["job_id"])
            .field(LogicalField::SalaryMin, &["min_salary"])
            .field(LogicalField::SalaryMax, &["max_salary"])
    }

    fn skills(&self, raw: &RawJob<'_>, normalizer: &SkillNormalizer) -> Vec<String> {
        match &self.lookup {
            Some(lookup) => raw
                .source_job_id
                .as_deref()
                .map(normalize_native_id)
                .and_then(|id| lookup.get(&id))
                .map(|names| normalizer.normalize(names))
                .unwrap_or_default(),
            None => raw
                .skills
                .map(|v| normalizer.normalize(split_skill_field(v)))
                .unwrap_or_default(),
        }
    }
}

fn load_skill_lookup(root: &Path) -> Result<Option<SkillLookup>, PipelineError> {
    let job_skills = [root.join("jobs").join("job_skills.csv"), root.join("job_skills.csv")]
        .into_iter()
        .find(|p| p.exists());
    let mapping = root.join("mappings").join("skills.csv");

    let Some(job_skills) = job_skills.filter(|_| mapping.exists()) else {
        warn!(
            "Skills auxiliary files not found under {}; using the free-text skills column",
            root.display()
        );
        return Ok(None);
    };

    let names: HashMap<String, String> = read_raw_table(&mapping)?
        .records
        .iter()
        .filter_map(|r| {
            let abr = r.get("skill_abr")?.as_str()?.trim().to_string();
            let name = r.get("skill_name")?.as_str()?.trim().to_string();
            Some((abr, name))
        })
        .collect();

    let mut lookup = SkillLookup::new();
    for record in read_raw_table(&job_skills)?.records {
        let (Some(job_id), Some(abr)) = (
            record.get("job_id").and_then(|v| v.as_str()),
            record.get("skill_abr").and_then(|v| v.as_str()),
        ) else {
            continue;
        };
        let abr = abr.trim();
        let name = names.get(abr).cloned().unwrap_or_else(|| abr.to_string());
        lookup
            .entry(normalize_native_id(job_id))
            .or_default()
            .insert(name);
    }

    info!(
        "Loaded skills for {} jobs from {}",
        lookup.len(),
        job_skills.display()
    );
    Ok(Some(lookup))
}
