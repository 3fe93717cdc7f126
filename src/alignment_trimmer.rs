use std::collections::BTreeMap;

/// Both '-' and '.' mark absent residues in aligned sequences.
pub fn is_gap(ch: u8) -> bool {
    ch == b'-' || ch == b'.'
}

/// Result of trimming a concatenated alignment. Pruned sequences are still
/// emitted in output files but are not part of the accepted alignment.
#[derive(Debug, Default, PartialEq)]
pub struct TrimmedAlignment {
    pub accepted: BTreeMap<String, String>,
    pub pruned: BTreeMap<String, String>,
    /// One entry per input column, true when the column was retained.
    pub mask: Vec<bool>,
    pub count_failed_occupancy: usize,
    pub count_failed_consensus: usize,
}

/// Trim a multiple sequence alignment by column occupancy and consensus
/// agreement, then prune sequences left with too few valid residues.
///
/// A column is retained when at least min_taxa_fraction of sequences have a
/// non-gap residue there, and the most frequent of those residues makes up at
/// least consensus_fraction of them. After masking, a sequence whose valid
/// residue fraction falls below min_residue_fraction is pruned. Ties for the
/// most frequent residue resolve to the residue first encountered iterating
/// sequences in key order; the tie never changes the ratio itself.
///
/// All fractions are in [0, 1]. All sequences must have equal length.
pub fn trim_alignment(
    seqs: &BTreeMap<String, String>,
    min_taxa_fraction: f32,
    consensus_fraction: f32,
    min_residue_fraction: f32,
) -> TrimmedAlignment {
    if seqs.is_empty() {
        return TrimmedAlignment::default();
    }

    let alignment_length = seqs.values().next().unwrap().len();
    for (seq_id, seq) in seqs {
        if seq.len() != alignment_length {
            panic!(
                "Programming error: aligned sequence for {} has length {}, expected {}",
                seq_id,
                seq.len(),
                alignment_length
            );
        }
    }

    // Count taxa and collect residues per column, iterating sequences in key
    // order so consensus tie-breaking is stable.
    let mut column_count = vec![0usize; alignment_length];
    let mut column_chars: Vec<Vec<u8>> = vec![Vec::new(); alignment_length];
    for seq in seqs.values() {
        for (i, ch) in seq.bytes().enumerate() {
            if !is_gap(ch) {
                column_count[i] += 1;
                column_chars[i].push(ch);
            }
        }
    }

    let mut mask = vec![false; alignment_length];
    let mut count_failed_occupancy = 0;
    let mut count_failed_consensus = 0;
    for (i, count) in column_count.iter().enumerate() {
        if (*count as f32) < min_taxa_fraction * seqs.len() as f32 {
            count_failed_occupancy += 1;
            continue;
        }
        let ratio = consensus_ratio(&column_chars[i]);
        if ratio >= consensus_fraction {
            mask[i] = true;
        } else {
            count_failed_consensus += 1;
        }
    }

    let mut accepted = BTreeMap::new();
    let mut pruned = BTreeMap::new();
    for (seq_id, seq) in seqs {
        let masked: String = seq
            .bytes()
            .zip(mask.iter())
            .filter(|(_, m)| **m)
            .map(|(ch, _)| ch as char)
            .collect();

        let valid_residues = masked.bytes().filter(|ch| !is_gap(*ch)).count();
        // A zero-column alignment leaves the valid fraction undefined, so
        // every sequence is pruned rather than dividing by zero.
        if masked.is_empty()
            || (valid_residues as f32) < masked.len() as f32 * min_residue_fraction
        {
            pruned.insert(seq_id.clone(), masked);
        } else {
            accepted.insert(seq_id.clone(), masked);
        }
    }

    TrimmedAlignment {
        accepted,
        pruned,
        mask,
        count_failed_occupancy,
        count_failed_consensus,
    }
}

/// Fraction of residues matching the most frequent residue at one column.
/// The input holds only non-gap residues.
fn consensus_ratio(column_chars: &[u8]) -> f32 {
    if column_chars.is_empty() {
        return 0.;
    }
    let mut counts: Vec<(u8, usize)> = vec![];
    for ch in column_chars {
        match counts.iter_mut().find(|(c, _)| c == ch) {
            Some((_, n)) => *n += 1,
            None => counts.push((*ch, 1)),
        }
    }
    // Strict comparison keeps the first encountered residue on ties.
    let mut best = 0usize;
    for (_, n) in &counts {
        if *n > best {
            best = *n;
        }
    }
    best as f32 / column_chars.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn msa(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(id, seq)| (id.to_string(), seq.to_string()))
            .collect()
    }

    #[test]
    fn test_column_masking_scenario() {
        init();
        let seqs = msa(&[("a", "AC-AT"), ("b", "AC-TT"), ("c", "-CGAT")]);
        let trimmed = trim_alignment(&seqs, 0.6, 0.5, 0.5);

        assert_eq!(vec![true, true, false, true, true], trimmed.mask);
        assert_eq!(1, trimmed.count_failed_occupancy);
        assert_eq!(0, trimmed.count_failed_consensus);
        assert_eq!(
            msa(&[("a", "ACAT"), ("b", "ACTT"), ("c", "-CAT")]),
            trimmed.accepted
        );
        assert!(trimmed.pruned.is_empty());
    }

    #[test]
    fn test_taxon_pruning_scenario() {
        init();
        let seqs = msa(&[
            ("a", "AC-AT"),
            ("b", "AC-TT"),
            ("c", "-CGAT"),
            ("d", "-----"),
        ]);
        let trimmed = trim_alignment(&seqs, 0.6, 0.5, 0.5);

        // The all-gap genome does not change the retained columns here.
        assert_eq!(vec![true, true, false, true, true], trimmed.mask);
        assert_eq!(
            msa(&[("a", "ACAT"), ("b", "ACTT"), ("c", "-CAT")]),
            trimmed.accepted
        );
        // validFraction = 0 < 0.5, so the all-gap genome is pruned but its
        // trimmed sequence is still emitted.
        assert_eq!(msa(&[("d", "----")]), trimmed.pruned);
    }

    #[test]
    fn test_mask_length_invariant() {
        init();
        let seqs = msa(&[("a", "AC-AT"), ("b", "AC-TT"), ("c", "-CGAT")]);
        let trimmed = trim_alignment(&seqs, 0.6, 0.9, 0.5);
        assert_eq!(5, trimmed.mask.len());
        let retained = trimmed.mask.iter().filter(|m| **m).count();
        assert_eq!(
            trimmed.mask.len(),
            retained + trimmed.count_failed_occupancy + trimmed.count_failed_consensus
        );
    }

    #[test]
    fn test_consensus_failure_counted() {
        init();
        // Column 0 is fully occupied but maximally disagrees.
        let seqs = msa(&[("a", "AA"), ("b", "CA"), ("c", "GA"), ("d", "TA")]);
        let trimmed = trim_alignment(&seqs, 0.5, 0.5, 0.0);
        assert_eq!(vec![false, true], trimmed.mask);
        assert_eq!(0, trimmed.count_failed_occupancy);
        assert_eq!(1, trimmed.count_failed_consensus);
    }

    #[test]
    fn test_trimming_is_idempotent() {
        init();
        let seqs = msa(&[("a", "AC-AT"), ("b", "AC-TT"), ("c", "-CGAT")]);
        let first = trim_alignment(&seqs, 0.6, 0.5, 0.5);

        let second = trim_alignment(&first.accepted, 0.6, 0.5, 0.5);

        assert!(second.mask.iter().all(|m| *m));
        assert_eq!(first.accepted, second.accepted);
        assert!(second.pruned.is_empty());
        assert_eq!(0, second.count_failed_occupancy);
        assert_eq!(0, second.count_failed_consensus);
    }

    #[test]
    fn test_degenerate_no_genomes() {
        init();
        let trimmed = trim_alignment(&BTreeMap::new(), 0.5, 0.5, 0.5);
        assert_eq!(TrimmedAlignment::default(), trimmed);
    }

    #[test]
    fn test_degenerate_all_columns_masked() {
        init();
        // No column reaches 100% occupancy, so everything is masked and every
        // genome is pruned with an empty sequence.
        let seqs = msa(&[("a", "A-"), ("b", "-C")]);
        let trimmed = trim_alignment(&seqs, 1.0, 0.5, 0.5);
        assert!(trimmed.accepted.is_empty());
        assert_eq!(msa(&[("a", ""), ("b", "")]), trimmed.pruned);
        assert_eq!(2, trimmed.count_failed_occupancy);
    }

    #[test]
    fn test_gap_characters() {
        init();
        assert!(is_gap(b'-'));
        assert!(is_gap(b'.'));
        assert!(!is_gap(b'A'));
    }
}
