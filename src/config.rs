use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Which per-node id is fed to the pattern miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Tag name only.
    Tag,
    /// Tag plus the sorted set of attribute keys.
    Signature,
    /// Tag path from the root down to the node.
    Htp,
    /// Canonical subtree structure.
    #[default]
    Structure,
}

impl Encoding {
    /// All schemes, in the order they are documented.
    pub const ALL: [Encoding; 4] = [
        Encoding::Tag,
        Encoding::Signature,
        Encoding::Htp,
        Encoding::Structure,
    ];

    /// The name accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Tag => "tag",
            Encoding::Signature => "signature",
            Encoding::Htp => "htp",
            Encoding::Structure => "structure",
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tag" => Ok(Encoding::Tag),
            "signature" => Ok(Encoding::Signature),
            "htp" => Ok(Encoding::Htp),
            "structure" => Ok(Encoding::Structure),
            other => Err(Error::InvalidEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds and tuning constants for [`detect_records`](crate::detect_records).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectConfig {
    /// Encoding scheme used to build the symbol sequence.
    pub encoding: Encoding,
    /// Minimum pattern length, in symbols.
    pub len_thresh: usize,
    /// Minimum number of occurrences of a pattern.
    pub freq_thresh: usize,
    /// Minimum subtree height of a record node.
    pub record_height_thresh: usize,
    /// Minimum subtree size of a record node.
    pub record_size_thresh: usize,
    /// Report every frequent pattern instead of only the most specific one
    /// per recurrence family.
    pub greedy: bool,
    /// A parent repeating more often than this among the indexes reaching a
    /// path-trie node stops alignment there.
    pub max_merge: usize,
    /// Minimum ratio of distinct parent records to nested members before
    /// nested members are stripped from a group.
    pub nesting_ratio: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Structure,
            len_thresh: 3,
            freq_thresh: 3,
            record_height_thresh: 2,
            record_size_thresh: 2,
            greedy: false,
            max_merge: 2,
            nesting_ratio: 0.9,
        }
    }
}

impl DetectConfig {
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_len_thresh(mut self, len_thresh: usize) -> Self {
        self.len_thresh = len_thresh;
        self
    }

    pub fn with_freq_thresh(mut self, freq_thresh: usize) -> Self {
        self.freq_thresh = freq_thresh;
        self
    }

    pub fn with_record_height_thresh(mut self, height: usize) -> Self {
        self.record_height_thresh = height;
        self
    }

    pub fn with_record_size_thresh(mut self, size: usize) -> Self {
        self.record_size_thresh = size;
        self
    }

    pub fn with_greedy(mut self, greedy: bool) -> Self {
        self.greedy = greedy;
        self
    }

    pub fn with_max_merge(mut self, max_merge: usize) -> Self {
        self.max_merge = max_merge;
        self
    }

    pub fn with_nesting_ratio(mut self, nesting_ratio: f64) -> Self {
        self.nesting_ratio = nesting_ratio;
        self
    }

    /// Rejects thresholds that would make every substring frequent.
    pub fn validate(&self) -> Result<()> {
        if self.len_thresh == 0 {
            return Err(Error::InvalidThreshold {
                name: "len_thresh",
                value: self.len_thresh,
            });
        }
        if self.freq_thresh == 0 {
            return Err(Error::InvalidThreshold {
                name: "freq_thresh",
                value: self.freq_thresh,
            });
        }
        Ok(())
    }
}
