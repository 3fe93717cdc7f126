use std;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::alignment_trimmer::TrimmedAlignment;
use crate::filter_pipeline::FilterDecision;
use crate::marker_accounting::ConcatenatedAlignment;
use crate::metadata_tables::MetadataTables;

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub prefix: String,
    /// Write the concatenated trimmed alignment FASTA.
    pub alignment: bool,
    /// Write one untrimmed FASTA per marker.
    pub individual: bool,
}

impl OutputOptions {
    pub fn path(&self, suffix: &str) -> PathBuf {
        self.directory.join(format!("{}_{}", self.prefix, suffix))
    }
}

fn create_file(path: &Path) -> Result<std::io::BufWriter<std::fs::File>, String> {
    std::fs::File::create(path)
        .map(std::io::BufWriter::new)
        .map_err(|e| format!("Failed to create output file {:?}: {}", path, e))
}

fn io_err(path: &Path, e: std::io::Error) -> String {
    format!("Failed to write output file {:?}: {}", path, e)
}

/// One line per removed or rescued genome: accession, reason, optional
/// numeric detail, and a representative marker.
pub fn write_filtered_genomes_report(
    decisions: &[FilterDecision],
    metadata: &MetadataTables,
    path: &Path,
) -> Result<(), String> {
    let mut out = create_file(path)?;
    for decision in decisions {
        let accession = metadata.accession(&decision.genome_id);
        let rep_str = match metadata.genomes.get(&decision.genome_id) {
            Some(g) if g.is_representative => "Representative",
            _ => "",
        };
        match decision.reason.numeric_detail() {
            Some(detail) => writeln!(
                out,
                "{}\t{}\t{}\t{}",
                accession,
                decision.reason.description(),
                detail,
                rep_str
            ),
            None => writeln!(
                out,
                "{}\t{}\t{}",
                accession,
                decision.reason.description(),
                rep_str
            ),
        }
        .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Accessions of genomes surviving all filters, one per line.
pub fn write_good_genomes(
    retained: &BTreeSet<String>,
    metadata: &MetadataTables,
    path: &Path,
) -> Result<(), String> {
    let mut out = create_file(path)?;
    for genome_id in retained {
        writeln!(out, "{}", metadata.accession(genome_id)).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Concatenated trimmed FASTA, accepted genomes first and pruned genomes
/// appended after them.
pub fn write_concatenated_alignment(
    trimmed: &TrimmedAlignment,
    path: &Path,
) -> Result<(), String> {
    let mut out = create_file(path)?;
    for (accession, seq) in trimmed.accepted.iter().chain(trimmed.pruned.iter()) {
        writeln!(out, ">{}\n{}", accession, seq).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Column mask as a bitstring, '1' for retained columns.
pub fn write_mask(mask: &[bool], path: &Path) -> Result<(), String> {
    let mut out = create_file(path)?;
    let bitstring: String = mask.iter().map(|m| if *m { '1' } else { '0' }).collect();
    write!(out, "{}", bitstring).map_err(|e| io_err(path, e))
}

/// Per-marker summary: external id, name, description, length, single copy
/// and ubiquity percentages over the retained genome set.
pub fn write_marker_summary(
    msa: &ConcatenatedAlignment,
    metadata: &MetadataTables,
    path: &Path,
) -> Result<(), String> {
    let mut out = create_file(path)?;
    writeln!(
        out,
        "Marker Id\tName\tDescription\tLength (bp)\tSingle copy (%)\tUbiquity (%)"
    )
    .map_err(|e| io_err(path, e))?;

    let num_genomes = msa.sequences.len();
    for marker_id in &metadata.marker_order {
        let marker = &metadata.markers[marker_id];
        let single_copy = msa.accounting.single_copy.get(marker_id).unwrap_or(&0);
        let ubiquity = msa.accounting.ubiquity.get(marker_id).unwrap_or(&0);
        let (sc_perc, u_perc) = if num_genomes == 0 {
            (0., 0.)
        } else {
            (
                *single_copy as f32 * 100. / num_genomes as f32,
                *ubiquity as f32 * 100. / num_genomes as f32,
            )
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{:.2}\t{:.2}",
            marker.external_id(),
            marker.name,
            marker.description,
            marker.size,
            sc_perc,
            u_perc
        )
        .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// Per-genome Single/Multiple/Missing classification across the marker
/// order.
pub fn write_multi_hits(
    msa: &ConcatenatedAlignment,
    metadata: &MetadataTables,
    path: &Path,
) -> Result<(), String> {
    let mut out = create_file(path)?;
    let mut header = vec!["Genome_ID".to_string()];
    for marker_id in &metadata.marker_order {
        header.push(metadata.markers[marker_id].external_id());
    }
    writeln!(out, "{}", header.join("\t")).map_err(|e| io_err(path, e))?;

    for (accession, statuses) in &msa.accounting.statuses {
        let fields: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        writeln!(out, "{}\t{}", accession, fields.join("\t")).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

/// One untrimmed FASTA per marker, named by the marker's in-database id.
pub fn write_individual_alignments(
    msa: &ConcatenatedAlignment,
    metadata: &MetadataTables,
    options: &OutputOptions,
) -> Result<(), String> {
    for marker_id in &metadata.marker_order {
        let marker = &metadata.markers[marker_id];
        let path = options.path(&format!("{}.faa", marker.id_in_database));
        let mut out = create_file(&path)?;
        if let Some(records) = msa.individual.get(marker_id) {
            for (accession, seq) in records {
                writeln!(out, ">{}\n{}", accession, seq).map_err(|e| io_err(&path, e))?;
            }
        }
    }
    Ok(())
}

/// Write every output file for one curation run.
pub fn write_outputs(
    options: &OutputOptions,
    metadata: &MetadataTables,
    retained: &BTreeSet<String>,
    decisions: &[FilterDecision],
    msa: &ConcatenatedAlignment,
    trimmed: &TrimmedAlignment,
) -> Result<(), String> {
    std::fs::create_dir_all(&options.directory).map_err(|e| {
        format!(
            "Failed to create output directory {:?}: {}",
            options.directory, e
        )
    })?;

    write_filtered_genomes_report(decisions, metadata, &options.path("filtered_genomes.tsv"))?;
    write_good_genomes(retained, metadata, &options.path("good_genomes.tsv"))?;
    write_mask(&trimmed.mask, &options.path("mask.txt"))?;
    write_marker_summary(msa, metadata, &options.path("markers_info.tsv"))?;
    write_multi_hits(msa, metadata, &options.path("multi_hits.tsv"))?;
    if options.alignment {
        write_concatenated_alignment(trimmed, &options.path("concatenated.faa"))?;
    }
    if options.individual {
        info!("Writing individual marker alignments.");
        write_individual_alignments(msa, metadata, options)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_trimmer::trim_alignment;
    use crate::marker_accounting::concatenate_marker_alignments;
    use crate::metadata_tables::load_metadata;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn metadata() -> MetadataTables {
        load_metadata(
            "tests/data/set1/genomes.tsv",
            "tests/data/set1/markers.tsv",
            "tests/data/set1/aligned_markers.tsv",
        )
        .unwrap()
    }

    #[test]
    fn test_concatenated_alignment_appends_pruned() {
        init();
        let td = tempfile::TempDir::new().unwrap();
        let metadata = metadata();
        let retained = vec!["g1", "g3", "g4", "g5"]
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let msa = concatenate_marker_alignments(&retained, &metadata);
        let trimmed = trim_alignment(&msa.sequences, 0.6, 0.5, 0.5);

        let path = td.path().join("concatenated.faa");
        write_concatenated_alignment(&trimmed, &path).unwrap();
        assert_eq!(
            ">G001\nACAT\n>G003\n-CAT\n>G005\nACTT\n>G004\nA---\n",
            std::fs::read_to_string(&path).unwrap()
        );
    }

    #[test]
    fn test_mask_bitstring() {
        init();
        let td = tempfile::TempDir::new().unwrap();
        let path = td.path().join("mask.txt");
        write_mask(&[true, true, false, true, true], &path).unwrap();
        assert_eq!("11011", std::fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_marker_summary_percentages() {
        init();
        let td = tempfile::TempDir::new().unwrap();
        let metadata = metadata();
        let retained = vec!["g1", "g2", "g4", "g5"]
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let msa = concatenate_marker_alignments(&retained, &metadata);
        let path = td.path().join("markers_info.tsv");
        write_marker_summary(&msa, &metadata, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[1].starts_with("PF_00001\tMarker one\t"));
        assert!(lines[1].ends_with("3\t75.00\t100.00"));
        assert!(lines[2].ends_with("2\t50.00\t50.00"));
    }
}
