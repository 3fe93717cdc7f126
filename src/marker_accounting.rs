use std::collections::{BTreeMap, BTreeSet};

use crate::metadata_tables::MetadataTables;

/// Classification of one marker slot for one genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStatus {
    /// A resolved, unambiguous sequence contributes to the alignment.
    Single,
    /// More than one candidate homolog was found; the slot is gap padded.
    Multiple,
    /// No resolved sequence; the slot is gap padded.
    Missing,
}

impl MarkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerStatus::Single => "Single",
            MarkerStatus::Multiple => "Multiple",
            MarkerStatus::Missing => "Missing",
        }
    }
}

/// Per-marker tallies accumulated while concatenating sequences. Consumed
/// only by reporting; no filtering decision depends on these.
#[derive(Debug, Default, PartialEq)]
pub struct MarkerAccounting {
    /// Genomes with any usable sequence for the marker.
    pub ubiquity: BTreeMap<String, usize>,
    /// Genomes where the marker was found exactly once.
    pub single_copy: BTreeMap<String, usize>,
    /// Per-genome accession, one status per marker in display order.
    pub statuses: BTreeMap<String, Vec<MarkerStatus>>,
}

/// Concatenated marker gene alignment for the retained genome set, keyed by
/// external accession. Every sequence has length equal to the total
/// alignment length.
#[derive(Debug)]
pub struct ConcatenatedAlignment {
    pub sequences: BTreeMap<String, String>,
    pub accounting: MarkerAccounting,
    /// Untrimmed per-marker alignments, gap padded for unusable slots, for
    /// the optional individual output files.
    pub individual: BTreeMap<String, Vec<(String, String)>>,
}

/// Materialize each retained genome's concatenated sequence, iterating
/// markers in their fixed display order. Missing and ambiguous slots are
/// padded with gap characters of the marker's expected length so all
/// concatenated sequences have identical length.
pub fn concatenate_marker_alignments(
    retained: &BTreeSet<String>,
    metadata: &MetadataTables,
) -> ConcatenatedAlignment {
    info!("Concatenating marker genes for {} genomes.", retained.len());

    let mut sequences = BTreeMap::new();
    let mut accounting = MarkerAccounting::default();
    let mut individual: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();

    for genome_id in retained {
        let accession = metadata.accession(genome_id).to_string();
        let mut aligned_seq = String::new();
        let mut statuses = vec![];

        for marker_id in &metadata.marker_order {
            let marker = &metadata.markers[marker_id];
            let record = metadata.aligned_marker(genome_id, marker_id);

            // A sequence without an evalue was never actually resolved.
            let usable_sequence = record.and_then(|r| {
                if r.has_evalue {
                    r.sequence.as_ref()
                } else {
                    None
                }
            });
            let multiple_hits = record.map(|r| r.multiple_hits).unwrap_or(false);

            match usable_sequence {
                Some(_) => {
                    *accounting.ubiquity.entry(marker_id.clone()).or_insert(0) += 1;
                    if multiple_hits {
                        statuses.push(MarkerStatus::Multiple);
                    } else {
                        *accounting.single_copy.entry(marker_id.clone()).or_insert(0) += 1;
                        statuses.push(MarkerStatus::Single);
                    }
                }
                None => statuses.push(MarkerStatus::Missing),
            }

            let slot_sequence = match usable_sequence {
                Some(seq) if !multiple_hits => seq.clone(),
                _ => "-".repeat(marker.size),
            };
            individual
                .entry(marker_id.clone())
                .or_insert_with(Vec::new)
                .push((accession.clone(), slot_sequence.clone()));
            aligned_seq.push_str(&slot_sequence);
        }

        if statuses.iter().all(|s| *s == MarkerStatus::Missing) {
            warn!(
                "Genome {} has no markers for this marker set and will be gap padded across the full alignment.",
                accession
            );
        }
        accounting.statuses.insert(accession.clone(), statuses);
        sequences.insert(accession, aligned_seq);
    }

    ConcatenatedAlignment {
        sequences,
        accounting,
        individual,
    }
}
