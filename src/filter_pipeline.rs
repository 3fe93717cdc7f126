use std::collections::BTreeSet;

use crate::alignment_trimmer::is_gap;
use crate::genome_quality::QualityThresholds;
use crate::metadata_tables::MetadataTables;
use crate::taxonomy::TaxaFilter;

/// Why a genome left the retained set, or why it was kept despite failing a
/// filter. Warning variants never remove a genome; guaranteed or
/// representative status can only rescue, never cause removal.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterReason {
    TaxonomicAffiliation,
    GuaranteedTaxonomicAffiliation,
    PoorQuality {
        completeness: f32,
        contamination: f32,
    },
    RetainedDespitePoorQuality {
        completeness: f32,
        contamination: f32,
    },
    ExplicitExclusion,
    InsufficientAlignedResidues {
        total_aa: usize,
        perc_alignment: f32,
    },
    RetainedDespiteInsufficientAlignedResidues {
        total_aa: usize,
        perc_alignment: f32,
    },
    GuaranteedWithoutAlignedResidues,
}

impl FilterReason {
    /// Warning decisions record a rescue; the genome stays in the retained
    /// set.
    pub fn is_removal(&self) -> bool {
        !matches!(
            self,
            FilterReason::RetainedDespitePoorQuality { .. }
                | FilterReason::RetainedDespiteInsufficientAlignedResidues { .. }
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            FilterReason::TaxonomicAffiliation => "Filtered on taxonomic affiliation.",
            FilterReason::GuaranteedTaxonomicAffiliation => {
                "Filtered on guaranteed taxonomic affiliation."
            }
            FilterReason::PoorQuality { .. } => {
                "Filtered on quality (completeness, contamination)."
            }
            FilterReason::RetainedDespitePoorQuality { .. } => {
                "Retained representative despite poor quality (completeness, contamination)."
            }
            FilterReason::ExplicitExclusion => "Explicitly marked for exclusion.",
            FilterReason::InsufficientAlignedResidues { .. } => {
                "Insufficient number of amino acids in MSA (total AA, % alignment length)"
            }
            FilterReason::RetainedDespiteInsufficientAlignedResidues { .. } => {
                "Retained representative despite insufficient amino acids in MSA (total AA, % alignment length)"
            }
            FilterReason::GuaranteedWithoutAlignedResidues => {
                "Guaranteed genome with zero amino acids in MSA."
            }
        }
    }

    /// Numeric detail columns for the filtered genome report.
    pub fn numeric_detail(&self) -> Option<String> {
        match self {
            FilterReason::PoorQuality {
                completeness,
                contamination,
            }
            | FilterReason::RetainedDespitePoorQuality {
                completeness,
                contamination,
            } => Some(format!("{:.2}\t{:.2}", completeness, contamination)),
            FilterReason::InsufficientAlignedResidues {
                total_aa,
                perc_alignment,
            }
            | FilterReason::RetainedDespiteInsufficientAlignedResidues {
                total_aa,
                perc_alignment,
            } => Some(format!("{}\t{:.1}", total_aa, perc_alignment)),
            _ => None,
        }
    }
}

/// Append-only audit record explaining a removal or rescue.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDecision {
    pub genome_id: String,
    pub reason: FilterReason,
}

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub taxa_filter: Option<TaxaFilter>,
    pub guaranteed_taxa_filter: Option<TaxaFilter>,
    pub quality: QualityThresholds,
    pub min_perc_aa: f32,
    pub min_rep_perc_aa: f32,
}

#[derive(Debug)]
pub struct FilterOutcome {
    pub retained: BTreeSet<String>,
    pub decisions: Vec<FilterDecision>,
}

/// Restrict a genome set to the requested taxonomic scope. Guaranteed genomes
/// are added back when retain_guaranteed is set, otherwise they are filtered
/// like any other genome.
pub fn taxa_scope_stage(
    genomes: &BTreeSet<String>,
    metadata: &MetadataTables,
    taxa_filter: &TaxaFilter,
    guaranteed_ids: &BTreeSet<String>,
    retain_guaranteed: bool,
) -> (BTreeSet<String>, Vec<FilterDecision>) {
    let in_scope: BTreeSet<String> = genomes
        .iter()
        .filter(|id| taxa_filter.matches(&metadata.genomes[*id].taxonomy))
        .cloned()
        .collect();

    let out_of_scope_guaranteed: BTreeSet<String> = guaranteed_ids
        .intersection(genomes)
        .filter(|id| !in_scope.contains(*id))
        .cloned()
        .collect();

    let retained: BTreeSet<String> = if retain_guaranteed {
        if !out_of_scope_guaranteed.is_empty() {
            warn!(
                "Retaining {} guaranteed genomes from taxa not specified by the taxa filter.",
                out_of_scope_guaranteed.len()
            );
            warn!("You can use the --guaranteed-taxa-filter flag to filter these genomes.");
        }
        in_scope.union(&out_of_scope_guaranteed).cloned().collect()
    } else {
        info!(
            "Filtered {} 'guaranteed' genomes based on taxonomic affiliations.",
            out_of_scope_guaranteed.len()
        );
        in_scope
    };

    let reason = if retain_guaranteed {
        FilterReason::TaxonomicAffiliation
    } else {
        FilterReason::GuaranteedTaxonomicAffiliation
    };
    let decisions = genomes
        .difference(&retained)
        .map(|id| FilterDecision {
            genome_id: id.clone(),
            reason: reason.clone(),
        })
        .collect();

    (retained, decisions)
}

/// Remove genomes failing the completeness/contamination/weighted-quality
/// thresholds. Representatives are rescued with a warning decision;
/// guaranteed genomes are never removed here.
pub fn quality_stage(
    genomes: &BTreeSet<String>,
    metadata: &MetadataTables,
    thresholds: &QualityThresholds,
    guaranteed_ids: &BTreeSet<String>,
) -> (BTreeSet<String>, Vec<FilterDecision>) {
    let mut retained = BTreeSet::new();
    let mut decisions = vec![];

    for genome_id in genomes {
        let genome = &metadata.genomes[genome_id];
        if thresholds.passes(genome.completeness, genome.contamination) {
            retained.insert(genome_id.clone());
            continue;
        }

        if guaranteed_ids.contains(genome_id) {
            debug!(
                "Retaining guaranteed genome {} despite poor estimated quality.",
                genome.accession
            );
            retained.insert(genome_id.clone());
        } else if genome.is_representative {
            warn!(
                "Retaining representative genome {} despite poor estimated quality (comp={:.1}%, cont={:.1}%).",
                genome.accession, genome.completeness, genome.contamination
            );
            retained.insert(genome_id.clone());
            decisions.push(FilterDecision {
                genome_id: genome_id.clone(),
                reason: FilterReason::RetainedDespitePoorQuality {
                    completeness: genome.completeness,
                    contamination: genome.contamination,
                },
            });
        } else {
            decisions.push(FilterDecision {
                genome_id: genome_id.clone(),
                reason: FilterReason::PoorQuality {
                    completeness: genome.completeness,
                    contamination: genome.contamination,
                },
            });
        }
    }

    (retained, decisions)
}

/// Subtract the explicit exclusion list. A genome appearing in both the
/// exclusion and guaranteed lists is a caller mistake, raised before any
/// exclusion is applied.
pub fn exclusion_stage(
    genomes: &BTreeSet<String>,
    exclude_ids: &BTreeSet<String>,
    guaranteed_ids: &BTreeSet<String>,
) -> Result<(BTreeSet<String>, Vec<FilterDecision>), String> {
    if let Some(conflict) = exclude_ids.intersection(guaranteed_ids).next() {
        return Err(format!(
            "Genomes marked for both retention and exclusion, e.g. {}",
            conflict
        ));
    }

    let retained: BTreeSet<String> = genomes.difference(exclude_ids).cloned().collect();
    let decisions = genomes
        .intersection(exclude_ids)
        .map(|id| FilterDecision {
            genome_id: id.clone(),
            reason: FilterReason::ExplicitExclusion,
        })
        .collect();
    Ok((retained, decisions))
}

/// Aligned residues for one genome, summed over markers with a sequence and
/// no multiple-hit ambiguity. Gap characters do not count.
pub fn count_aligned_residues(
    genome_id: &str,
    metadata: &MetadataTables,
) -> usize {
    let mut total_aa = 0;
    for marker_id in &metadata.marker_order {
        if let Some(record) = metadata.aligned_marker(genome_id, marker_id) {
            if !record.multiple_hits {
                if let Some(seq) = &record.sequence {
                    total_aa += seq.bytes().filter(|b| !is_gap(*b)).count();
                }
            }
        }
    }
    total_aa
}

/// Remove genomes with insufficient aligned amino acids relative to the total
/// marker set length. Representatives get the stricter min_rep_perc_aa bar;
/// guaranteed genomes are kept unless they have no aligned residues at all.
pub fn coverage_stage(
    genomes: &BTreeSet<String>,
    metadata: &MetadataTables,
    min_perc_aa: f32,
    min_rep_perc_aa: f32,
    guaranteed_ids: &BTreeSet<String>,
) -> (BTreeSet<String>, Vec<FilterDecision>) {
    let total_alignment_len = metadata.total_alignment_length();
    let mut retained = BTreeSet::new();
    let mut decisions = vec![];

    for genome_id in genomes {
        let genome = &metadata.genomes[genome_id];
        let total_aa = count_aligned_residues(genome_id, metadata);

        if guaranteed_ids.contains(genome_id) {
            if total_aa != 0 {
                retained.insert(genome_id.clone());
            } else {
                warn!(
                    "Filtered guaranteed genome {} with zero amino acids in MSA.",
                    genome.accession
                );
                decisions.push(FilterDecision {
                    genome_id: genome_id.clone(),
                    reason: FilterReason::GuaranteedWithoutAlignedResidues,
                });
            }
            continue;
        }

        let perc_alignment = if total_alignment_len == 0 {
            0.
        } else {
            total_aa as f32 * 100. / total_alignment_len as f32
        };

        if perc_alignment >= min_perc_aa {
            retained.insert(genome_id.clone());
        } else if genome.is_representative && perc_alignment >= min_rep_perc_aa {
            warn!(
                "Retaining representative genome {} despite small numbers of aligned amino acids ({:.1}%).",
                genome.accession, perc_alignment
            );
            retained.insert(genome_id.clone());
            decisions.push(FilterDecision {
                genome_id: genome_id.clone(),
                reason: FilterReason::RetainedDespiteInsufficientAlignedResidues {
                    total_aa,
                    perc_alignment,
                },
            });
        } else {
            if genome.is_representative {
                warn!(
                    "Filtered representative genome {} due to lack of aligned amino acids ({:.1}%).",
                    genome.accession, perc_alignment
                );
            }
            decisions.push(FilterDecision {
                genome_id: genome_id.clone(),
                reason: FilterReason::InsufficientAlignedResidues {
                    total_aa,
                    perc_alignment,
                },
            });
        }
    }

    (retained, decisions)
}

/// Run the four filter stages in their fixed sequence over a shrinking
/// genome set, collecting every decision along the way.
pub fn run_filter_pipeline(
    metadata: &MetadataTables,
    settings: &FilterSettings,
    guaranteed_ids: &BTreeSet<String>,
    exclude_ids: &BTreeSet<String>,
) -> Result<FilterOutcome, String> {
    let input_set: BTreeSet<String> = metadata.genomes.keys().cloned().collect();
    info!("Filtering initial set of {} genomes.", input_set.len());

    // Guaranteed genomes absent from the input cannot be synthesized.
    let absent_guaranteed: Vec<&String> = guaranteed_ids.difference(&input_set).collect();
    if !absent_guaranteed.is_empty() {
        warn!(
            "Identified {} guaranteed genomes absent from the input genome set. Those genomes will not appear in the output alignment.",
            absent_guaranteed.len()
        );
    }
    let guaranteed: BTreeSet<String> = guaranteed_ids.intersection(&input_set).cloned().collect();
    info!(
        "Identified {} genomes to be excluded from filtering.",
        guaranteed.len()
    );

    let mut retained = input_set;
    let mut decisions: Vec<FilterDecision> = vec![];

    if let Some(taxa_filter) = &settings.taxa_filter {
        let (kept, mut stage_decisions) =
            taxa_scope_stage(&retained, metadata, taxa_filter, &guaranteed, true);
        info!(
            "Filtered {} genomes based on taxonomic affiliations.",
            retained.len() - kept.len()
        );
        retained = kept;
        decisions.append(&mut stage_decisions);
    }

    if let Some(taxa_filter) = &settings.guaranteed_taxa_filter {
        let (kept, mut stage_decisions) =
            taxa_scope_stage(&retained, metadata, taxa_filter, &guaranteed, false);
        retained = kept;
        decisions.append(&mut stage_decisions);
    }

    info!(
        "Filtering genomes with completeness <{:.1}%, contamination >{:.1}%, or quality <{:.1}% (weight = {:.1}).",
        settings.quality.min_completeness,
        settings.quality.max_contamination,
        settings.quality.quality_threshold,
        settings.quality.quality_weight
    );
    let (kept, mut stage_decisions) =
        quality_stage(&retained, metadata, &settings.quality, &guaranteed);
    info!(
        "Filtered {} genomes based on completeness, contamination, and quality.",
        retained.len() - kept.len()
    );
    retained = kept;
    decisions.append(&mut stage_decisions);

    // The conflict check runs against the lists as supplied, so a conflict is
    // reported even when the offending genome was already filtered.
    let (kept, mut stage_decisions) = exclusion_stage(&retained, exclude_ids, guaranteed_ids)?;
    info!(
        "Filtered {} genomes explicitly indicated for exclusion.",
        retained.len() - kept.len()
    );
    retained = kept;
    decisions.append(&mut stage_decisions);

    info!("Filtering genomes with insufficient amino acids in the MSA.");
    let (kept, mut stage_decisions) = coverage_stage(
        &retained,
        metadata,
        settings.min_perc_aa,
        settings.min_rep_perc_aa,
        &guaranteed,
    );
    info!(
        "Filtered {} genomes with insufficient amino acids in the MSA.",
        retained.len() - kept.len()
    );
    retained = kept;
    decisions.append(&mut stage_decisions);

    info!("Producing tree data for {} genomes.", retained.len());
    Ok(FilterOutcome {
        retained,
        decisions,
    })
}
