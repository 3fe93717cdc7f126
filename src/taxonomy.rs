use std;
use std::collections::{BTreeMap, BTreeSet};

/// The seven canonical ranks of a GTDB-style taxonomy string, in order from
/// least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Domain,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

pub const RANK_ORDER: [Rank; 7] = [
    Rank::Domain,
    Rank::Phylum,
    Rank::Class,
    Rank::Order,
    Rank::Family,
    Rank::Genus,
    Rank::Species,
];

lazy_static! {
    static ref PREFIX_TO_RANK: BTreeMap<&'static str, Rank> = {
        let mut m = BTreeMap::new();
        for rank in RANK_ORDER.iter() {
            m.insert(rank.prefix(), *rank);
        }
        m
    };
}

impl Rank {
    /// Three character prefix carried by every taxon at this rank e.g. "p__"
    /// for phylum.
    pub fn prefix(&self) -> &'static str {
        match self {
            Rank::Domain => "d__",
            Rank::Phylum => "p__",
            Rank::Class => "c__",
            Rank::Order => "o__",
            Rank::Family => "f__",
            Rank::Genus => "g__",
            Rank::Species => "s__",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_prefix(prefix: &str) -> Option<Rank> {
        PREFIX_TO_RANK.get(prefix).copied()
    }
}

/// Parse a semicolon separated 7 rank taxonomy string into one value per
/// rank, checking each value carries the prefix of its position.
pub fn parse_taxonomy_string(taxonomy: &str) -> Result<Vec<String>, String> {
    let values: Vec<String> = taxonomy.split(';').map(|t| t.trim().to_string()).collect();
    if values.len() != RANK_ORDER.len() {
        return Err(format!(
            "Expected {} rank values in taxonomy string, found {}: '{}'",
            RANK_ORDER.len(),
            values.len(),
            taxonomy
        ));
    }
    for (rank, value) in RANK_ORDER.iter().zip(values.iter()) {
        if !value.starts_with(rank.prefix()) {
            return Err(format!(
                "Taxonomy value '{}' does not carry the expected rank prefix '{}'",
                value,
                rank.prefix()
            ));
        }
    }
    Ok(values)
}

/// A set of requested taxa, grouped by rank. A genome is in scope iff for
/// every rank with at least one requested taxon, the genome's classification
/// at that rank is one of the requested taxa. So rank groups are intersected,
/// and taxa within one rank group form a union.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxaFilter {
    taxa_at_rank: Vec<BTreeSet<String>>,
}

impl TaxaFilter {
    /// Parse a comma separated taxon list e.g.
    /// "p__Proteobacteria,g__Bacillus". An unrecognized rank prefix is a
    /// caller mistake, reported as Err for the caller to abort on.
    pub fn parse(taxa_filter: &str) -> Result<TaxaFilter, String> {
        let mut taxa_at_rank: Vec<BTreeSet<String>> =
            vec![BTreeSet::new(); RANK_ORDER.len()];
        for taxon in taxa_filter.split(',').map(|t| t.trim()) {
            if taxon.len() < 3 {
                return Err(format!("Invalid taxon specified in taxa filter: '{}'", taxon));
            }
            match Rank::from_prefix(&taxon[0..3]) {
                Some(rank) => {
                    taxa_at_rank[rank.index()].insert(taxon.to_string());
                }
                None => {
                    return Err(format!("Invalid taxon prefix: '{}'", taxon));
                }
            }
        }
        Ok(TaxaFilter { taxa_at_rank })
    }

    pub fn matches(&self, taxonomy: &[String]) -> bool {
        for (taxa, value) in self.taxa_at_rank.iter().zip(taxonomy.iter()) {
            if !taxa.is_empty() && !taxa.contains(value) {
                return false;
            }
        }
        true
    }
}

/// Parse a taxa filter or abort, for use at the CLI boundary where an
/// unrecognized prefix indicates a configuration error.
pub fn parse_taxa_filter_or_exit(taxa_filter: &str) -> TaxaFilter {
    match TaxaFilter::parse(taxa_filter) {
        Ok(f) => f,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
