//! Greedy read aligner against a counting engine's graph.

use serde::Serialize;

use seqbind_core::constants::DEFAULT_TRUSTED_CUTOFF;
use seqbind_core::errors::{EngineError, EngineResult};

use crate::counting::CountingEngine;
use crate::kmer::{all_bases, base_char, encode_base, Kmer};
use crate::table::KmerTable;

/// Result of aligning one read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub score: f64,
    /// Bases of the graph path; substitutions are lowercase.
    pub graph_alignment: String,
    pub read_alignment: String,
    /// The graph path ended before the read did.
    pub truncated: bool,
}

/// Walks a read through the trusted k-mers of a counting engine, allowing a
/// substitution wherever the read leaves the graph.
pub struct ReadAligner<'a> {
    counting: &'a CountingEngine,
    trusted_cutoff: u32,
    bits_theta: f64,
}

impl<'a> ReadAligner<'a> {
    pub fn new(counting: &'a CountingEngine, trusted_cutoff: u32, bits_theta: f64) -> Self {
        Self {
            counting,
            trusted_cutoff,
            bits_theta,
        }
    }

    pub fn with_defaults(counting: &'a CountingEngine) -> Self {
        Self::new(counting, DEFAULT_TRUSTED_CUTOFF, 1.0)
    }

    fn trusted(&self, kmer: Kmer) -> bool {
        self.counting.table().get(kmer.canonical()) >= self.trusted_cutoff
    }

    /// Best trusted right extension of `kmer`.
    fn best_extension(&self, kmer: Kmer, k: u32) -> Option<(u64, Kmer)> {
        all_bases()
            .map(|base| (base, kmer.extend_right(base, k)))
            .filter(|&(_, next)| self.trusted(next))
            .max_by_key(|&(_, next)| self.counting.table().get(next.canonical()))
    }

    pub fn align(&self, seq: &str) -> EngineResult<Alignment> {
        let k = self.counting.ksize();
        let bytes = seq.as_bytes();
        if bytes.len() < k as usize {
            return Err(EngineError::InvalidArgument(format!(
                "read of length {} is shorter than k-mer size {k}",
                bytes.len()
            )));
        }

        let seed = std::str::from_utf8(&bytes[..k as usize])
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))
            .and_then(|s| Kmer::parse(s, k));
        let mut current = match seed {
            Ok(kmer) if self.trusted(kmer) => kmer,
            _ => {
                return Ok(Alignment {
                    score: 0.0,
                    graph_alignment: String::new(),
                    read_alignment: String::new(),
                    truncated: true,
                })
            }
        };

        let prefix = String::from_utf8_lossy(&bytes[..k as usize]).to_uppercase();
        let mut graph = prefix.clone();
        let mut read = prefix;
        let mut score = f64::from(k);
        let mut truncated = false;

        for &b in &bytes[k as usize..] {
            let read_char = (b as char).to_ascii_uppercase();
            let direct = encode_base(b)
                .map(|code| (code, current.extend_right(code, k)))
                .filter(|&(_, next)| self.trusted(next));

            match direct {
                Some((_, next)) => {
                    graph.push(read_char);
                    score += 1.0;
                    current = next;
                }
                None => match self.best_extension(current, k) {
                    Some((base, next)) => {
                        graph.push(base_char(base).to_ascii_lowercase());
                        score -= self.bits_theta;
                        current = next;
                    }
                    None => {
                        truncated = true;
                        break;
                    }
                },
            }
            read.push(read_char);
        }

        Ok(Alignment {
            score,
            graph_alignment: graph,
            read_alignment: read,
            truncated,
        })
    }
}
