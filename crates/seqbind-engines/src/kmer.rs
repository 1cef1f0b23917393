//! 2-bit k-mer encoding and canonical hashing.

use seqbind_core::constants::MAX_KSIZE;
use seqbind_core::errors::{EngineError, EngineResult};
use seqbind_core::types::KmerHash;

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

#[inline]
pub fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

#[inline]
fn mask(k: u32) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}

pub fn check_ksize(k: u32) -> EngineResult<()> {
    if k == 0 || k > MAX_KSIZE {
        return Err(EngineError::InvalidArgument(format!(
            "k-mer size {k} is outside 1..={MAX_KSIZE}"
        )));
    }
    Ok(())
}

/// Reverse complement of a packed k-mer.
pub fn revcomp(mut packed: u64, k: u32) -> u64 {
    let mut rc = 0u64;
    for _ in 0..k {
        rc = (rc << 2) | (3 - (packed & 3));
        packed >>= 2;
    }
    rc
}

/// One k-mer in both orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kmer {
    pub fwd: u64,
    pub rc: u64,
}

impl Kmer {
    pub fn canonical(self) -> KmerHash {
        self.fwd.min(self.rc)
    }

    /// Rebuild from a canonical hash.
    pub fn from_hash(hash: KmerHash, k: u32) -> Self {
        Self {
            fwd: hash,
            rc: revcomp(hash, k),
        }
    }

    /// Parse a k-mer of exactly `k` ACGT bases.
    pub fn parse(kmer: &str, k: u32) -> EngineResult<Self> {
        check_ksize(k)?;
        if kmer.len() != k as usize {
            return Err(EngineError::InvalidArgument(format!(
                "k-mer length {} does not match k-mer size {k}",
                kmer.len()
            )));
        }
        let mut fwd = 0u64;
        for &b in kmer.as_bytes() {
            let code = encode_base(b).ok_or_else(|| {
                EngineError::InvalidArgument(format!("invalid base {:?} in k-mer", b as char))
            })?;
            fwd = (fwd << 2) | code;
        }
        Ok(Self {
            fwd,
            rc: revcomp(fwd, k),
        })
    }

    /// Shift `base` in on the right.
    pub fn extend_right(self, base: u64, k: u32) -> Self {
        Self {
            fwd: ((self.fwd << 2) | base) & mask(k),
            rc: (self.rc >> 2) | ((3 - base) << (2 * (k - 1))),
        }
    }

    /// Shift `base` in on the left.
    pub fn extend_left(self, base: u64, k: u32) -> Self {
        Self {
            fwd: (self.fwd >> 2) | (base << (2 * (k - 1))),
            rc: ((self.rc << 2) | (3 - base)) & mask(k),
        }
    }
}

/// Canonical hash of `kmer` (minimum of both strands).
pub fn forward_hash(kmer: &str, k: u32) -> EngineResult<KmerHash> {
    Kmer::parse(kmer, k).map(Kmer::canonical)
}

/// Forward-strand hash of `kmer`, without canonicalisation.
pub fn forward_hash_no_rc(kmer: &str, k: u32) -> EngineResult<KmerHash> {
    Kmer::parse(kmer, k).map(|kmer| kmer.fwd)
}

/// Decode a packed hash back into bases.
pub fn reverse_hash(hash: KmerHash, k: u32) -> EngineResult<String> {
    check_ksize(k)?;
    let mut out = vec![b'A'; k as usize];
    let mut packed = hash;
    for slot in out.iter_mut().rev() {
        *slot = BASES[(packed & 3) as usize];
        packed >>= 2;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Every complete k-mer in a sequence. Windows containing a non-ACGT base
/// are skipped.
pub struct KmerIterator<'a> {
    seq: &'a [u8],
    k: u32,
    pos: usize,
    filled: u32,
    current: Kmer,
}

impl<'a> KmerIterator<'a> {
    pub fn new(seq: &'a str, k: u32) -> Self {
        Self {
            seq: seq.as_bytes(),
            k,
            pos: 0,
            filled: 0,
            current: Kmer { fwd: 0, rc: 0 },
        }
    }
}

impl Iterator for KmerIterator<'_> {
    type Item = Kmer;

    fn next(&mut self) -> Option<Kmer> {
        while self.pos < self.seq.len() {
            let base = self.seq[self.pos];
            self.pos += 1;
            match encode_base(base) {
                Some(code) => {
                    self.current = self.current.extend_right(code, self.k);
                    self.filled = (self.filled + 1).min(self.k);
                    if self.filled == self.k {
                        return Some(self.current);
                    }
                }
                None => {
                    self.filled = 0;
                    self.current = Kmer { fwd: 0, rc: 0 };
                }
            }
        }
        None
    }
}

/// Neighbouring bases in encoding order.
pub fn all_bases() -> impl Iterator<Item = u64> {
    0..4u64
}

pub fn base_char(code: u64) -> char {
    BASES[(code & 3) as usize] as char
}
