use std;
use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::*;

use crate::alignment_trimmer::trim_alignment;
use crate::filter_pipeline::{run_filter_pipeline, FilterSettings};
use crate::genome_quality::QualityThresholds;
use crate::marker_accounting::concatenate_marker_alignments;
use crate::metadata_tables::{load_metadata, read_genome_list};
use crate::output_writer::{write_outputs, OutputOptions};
use crate::taxonomy::parse_taxa_filter_or_exit;

/// Everything needed for one curation run, parsed from the command line.
#[derive(Debug)]
pub struct CurateSettings {
    pub genome_table_path: String,
    pub marker_table_path: String,
    pub aligned_marker_table_path: String,
    pub guaranteed_list_path: Option<String>,
    pub exclude_list_path: Option<String>,
    pub filter: FilterSettings,
    pub min_perc_taxa: f32,
    pub consensus: f32,
    pub output: OutputOptions,
}

pub fn run_curate_subcommand(m: &ArgMatches) {
    let settings = generate_curate_settings(m);
    match run_curation(&settings) {
        Ok(()) => {}
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

pub fn generate_curate_settings(m: &ArgMatches) -> CurateSettings {
    let taxa_filter = m
        .get_one::<String>("taxa-filter")
        .map(|t| parse_taxa_filter_or_exit(t));
    let guaranteed_taxa_filter = m
        .get_one::<String>("guaranteed-taxa-filter")
        .map(|t| parse_taxa_filter_or_exit(t));

    CurateSettings {
        genome_table_path: m.get_one::<String>("genome-metadata").unwrap().clone(),
        marker_table_path: m.get_one::<String>("marker-metadata").unwrap().clone(),
        aligned_marker_table_path: m.get_one::<String>("aligned-markers").unwrap().clone(),
        guaranteed_list_path: m.get_one::<String>("guaranteed-list").cloned(),
        exclude_list_path: m.get_one::<String>("exclude-list").cloned(),
        filter: FilterSettings {
            taxa_filter,
            guaranteed_taxa_filter,
            quality: QualityThresholds {
                quality_threshold: *m.get_one::<f32>("quality-threshold").unwrap(),
                quality_weight: *m.get_one::<f32>("quality-weight").unwrap(),
                min_completeness: *m.get_one::<f32>("min-completeness").unwrap(),
                max_contamination: *m.get_one::<f32>("max-contamination").unwrap(),
            },
            min_perc_aa: *m.get_one::<f32>("min-perc-aa").unwrap(),
            min_rep_perc_aa: *m.get_one::<f32>("min-rep-perc-aa").unwrap(),
        },
        min_perc_taxa: *m.get_one::<f32>("min-perc-taxa").unwrap(),
        consensus: *m.get_one::<f32>("consensus").unwrap(),
        output: OutputOptions {
            directory: PathBuf::from(m.get_one::<String>("output-directory").unwrap()),
            prefix: m.get_one::<String>("output-prefix").unwrap().clone(),
            alignment: !m.get_flag("no-alignment"),
            individual: m.get_flag("individual"),
        },
    }
}

/// Run the full filter-and-trim pipeline and write all output files.
pub fn run_curation(settings: &CurateSettings) -> Result<(), String> {
    let metadata = load_metadata(
        &settings.genome_table_path,
        &settings.marker_table_path,
        &settings.aligned_marker_table_path,
    )?;

    let guaranteed_ids = match &settings.guaranteed_list_path {
        Some(path) => read_genome_list(path)?,
        None => BTreeSet::new(),
    };
    let exclude_ids = match &settings.exclude_list_path {
        Some(path) => read_genome_list(path)?,
        None => BTreeSet::new(),
    };

    let outcome = run_filter_pipeline(&metadata, &settings.filter, &guaranteed_ids, &exclude_ids)?;

    let msa = concatenate_marker_alignments(&outcome.retained, &metadata);

    info!("Trimming columns with insufficient taxa or poor consensus.");
    let trimmed = trim_alignment(
        &msa.sequences,
        settings.min_perc_taxa / 100.,
        settings.consensus / 100.,
        settings.filter.min_perc_aa / 100.,
    );
    info!(
        "Trimmed alignment from {} to {} AA ({} columns by minimum taxa percent, {} by consensus).",
        trimmed.mask.len(),
        trimmed.mask.iter().filter(|m| **m).count(),
        trimmed.count_failed_occupancy,
        trimmed.count_failed_consensus
    );
    info!(
        "After trimming, {} taxa have amino acids in <{:.1}% of columns.",
        trimmed.pruned.len(),
        settings.filter.min_perc_aa
    );

    write_outputs(
        &settings.output,
        &metadata,
        &outcome.retained,
        &outcome.decisions,
        &msa,
        &trimmed,
    )
}

pub fn add_curate_subcommand(app: Command) -> Command {
    let curate_subcommand = bird_tool_utils::clap_utils::add_clap_verbosity_flags(
        Command::new("curate")
            .about("Filter genomes and trim their concatenated marker alignment"),
    )
    .arg(
        Arg::new("genome-metadata")
            .long("genome-metadata")
            .help("Genome metadata table (genome_id, accession, completeness, contamination, taxonomy, representative)")
            .required(true),
    )
    .arg(
        Arg::new("marker-metadata")
            .long("marker-metadata")
            .help("Marker metadata table (marker_id, prefix, id_in_database, name, description, size)")
            .required(true),
    )
    .arg(
        Arg::new("aligned-markers")
            .long("aligned-markers")
            .help("Aligned marker table (genome_id, marker_id, sequence, multiple_hits, evalue)")
            .required(true),
    )
    .arg(
        Arg::new("guaranteed-list")
            .long("guaranteed-list")
            .help("File of genome ids to retain regardless of most filters, one per line"),
    )
    .arg(
        Arg::new("exclude-list")
            .long("exclude-list")
            .help("File of genome ids to exclude, one per line"),
    )
    .arg(
        Arg::new("taxa-filter")
            .long("taxa-filter")
            .help("Comma separated taxa to retain e.g. 'p__Proteobacteria,g__Bacillus'; guaranteed genomes are retained even when outside this scope"),
    )
    .arg(
        Arg::new("guaranteed-taxa-filter")
            .long("guaranteed-taxa-filter")
            .help("Comma separated taxa to retain, applied to guaranteed genomes too"),
    )
    .arg(
        Arg::new("quality-threshold")
            .long("quality-threshold")
            .help("Minimum weighted quality (completeness - weight*contamination)")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_QUALITY_THRESHOLD),
    )
    .arg(
        Arg::new("quality-weight")
            .long("quality-weight")
            .help("Weight of contamination in the quality formula")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_QUALITY_WEIGHT),
    )
    .arg(
        Arg::new("min-completeness")
            .long("min-completeness")
            .help("Genomes with less than this percentage of completeness are excluded")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_MIN_COMPLETENESS),
    )
    .arg(
        Arg::new("max-contamination")
            .long("max-contamination")
            .help("Genomes with greater than this percentage of contamination are excluded")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_MAX_CONTAMINATION),
    )
    .arg(
        Arg::new("min-perc-aa")
            .long("min-perc-aa")
            .help("Minimum percentage of aligned amino acids relative to the total alignment length")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_MIN_PERC_AA),
    )
    .arg(
        Arg::new("min-rep-perc-aa")
            .long("min-rep-perc-aa")
            .help("Stricter minimum aligned amino acid percentage applied to representative genomes")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_MIN_REP_PERC_AA),
    )
    .arg(
        Arg::new("min-perc-taxa")
            .long("min-perc-taxa")
            .help("Minimum percentage of taxa with a residue required to retain an alignment column")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_MIN_PERC_TAXA),
    )
    .arg(
        Arg::new("consensus")
            .long("consensus")
            .help("Minimum percentage of residues matching the most common residue required to retain a column")
            .value_parser(value_parser!(f32))
            .default_value(crate::DEFAULT_CONSENSUS),
    )
    .arg(
        Arg::new("output-directory")
            .long("output-directory")
            .help("Directory to write output files to")
            .required(true),
    )
    .arg(
        Arg::new("output-prefix")
            .long("output-prefix")
            .help("Prefix for output file names")
            .default_value(crate::DEFAULT_OUTPUT_PREFIX),
    )
    .arg(
        Arg::new("no-alignment")
            .long("no-alignment")
            .help("Do not write the concatenated trimmed alignment FASTA")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("individual")
            .long("individual")
            .help("Write one untrimmed FASTA per marker")
            .action(ArgAction::SetTrue),
    );

    app.subcommand(curate_subcommand)
}
