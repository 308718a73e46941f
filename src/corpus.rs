use include_dir::{include_dir, Dir};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static PASSAGE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/passages");

/// Difficulty bucket. Ordinals are 0 (easy) through 2 (hard).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    /// Out-of-range ordinals clamp to the nearest tier.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        match self {
            Tier::Easy => 0,
            Tier::Medium => 1,
            Tier::Hard => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn file_name(self) -> String {
        format!("{}.json", self.to_string().to_lowercase())
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("tier {0} has no passages")]
    EmptyTier(Tier),
    #[error("tier {tier} passage {index} is empty")]
    EmptyPassage { tier: Tier, index: usize },
    #[error("tier {tier} passage {index} spans more than one line")]
    MultiLine { tier: Tier, index: usize },
    #[error("passage file {0} not found")]
    MissingFile(String),
    #[error("unable to deserialize passage file {name}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize, Clone, Debug)]
struct PassageFile {
    #[allow(dead_code)]
    name: String,
    passages: Vec<String>,
}

/// Fixed passage lists, one per [`Tier`], all non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    tiers: [Vec<String>; 3],
}

impl Corpus {
    /// Lists are indexed by [`Tier::index`].
    ///
    /// Every list must hold at least one passage, and every passage must be a
    /// non-empty single line: the typed buffer is stripped of line breaks, so a
    /// multi-line passage could never be matched.
    pub fn new(tiers: [Vec<String>; 3]) -> Result<Self, CorpusError> {
        for tier in Tier::ALL {
            let list = &tiers[tier.index()];
            if list.is_empty() {
                return Err(CorpusError::EmptyTier(tier));
            }
            for (index, passage) in list.iter().enumerate() {
                if passage.is_empty() {
                    return Err(CorpusError::EmptyPassage { tier, index });
                }
                if passage.contains(['\n', '\r']) {
                    return Err(CorpusError::MultiLine { tier, index });
                }
            }
        }
        Ok(Self { tiers })
    }

    /// The passages shipped with the binary.
    pub fn builtin() -> Result<Self, CorpusError> {
        let mut tiers: [Vec<String>; 3] = Default::default();
        for tier in Tier::ALL {
            tiers[tier.index()] = read_passage_file(&tier.file_name())?;
        }
        Self::new(tiers)
    }

    /// A corpus where every tier resolves to the same custom passage.
    pub fn single(passage: impl Into<String>) -> Result<Self, CorpusError> {
        let passage = passage.into();
        Self::new([vec![passage.clone()], vec![passage.clone()], vec![passage]])
    }

    pub fn passages(&self, tier: Tier) -> &[String] {
        &self.tiers[tier.index()]
    }

    /// Uniformly random passage from `tier`.
    pub fn pick_passage(&self, tier: Tier) -> &str {
        self.pick_passage_with(tier, &mut rand::thread_rng())
    }

    pub fn pick_passage_with<R: Rng + ?Sized>(&self, tier: Tier, rng: &mut R) -> &str {
        let list = self.passages(tier);
        &list[rng.gen_range(0..list.len())]
    }
}

fn read_passage_file(file_name: &str) -> Result<Vec<String>, CorpusError> {
    let contents = PASSAGE_DIR
        .get_file(file_name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| CorpusError::MissingFile(file_name.to_string()))?;

    let file: PassageFile =
        serde_json::from_str(contents).map_err(|source| CorpusError::Parse {
            name: file_name.to_string(),
            source,
        })?;

    Ok(file.passages)
}
