extern crate assert_cli;

#[cfg(test)]
mod tests {
    use assert_cli::Assert;

    fn curate_args(output_dir: &str) -> Vec<String> {
        vec![
            "curate",
            "--genome-metadata",
            "tests/data/set1/genomes.tsv",
            "--marker-metadata",
            "tests/data/set1/markers.tsv",
            "--aligned-markers",
            "tests/data/set1/aligned_markers.tsv",
            "--quality-threshold",
            "25",
            "--quality-weight",
            "1",
            "--min-perc-aa",
            "50",
            "--min-rep-perc-aa",
            "10",
            "--min-perc-taxa",
            "60",
            "--consensus",
            "50",
            "--output-directory",
            output_dir,
        ]
        .into_iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_curate_end_to_end() {
        let td = tempfile::TempDir::new().unwrap();
        let tdp = td.path().to_str().unwrap();
        let args = curate_args(tdp);
        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Assert::main_binary()
            .with_args(&arg_refs)
            .succeeds()
            .unwrap();

        // g2 is removed on quality; the representative g4 survives filtering
        // but is pruned after trimming.
        assert_eq!(
            "G001\nG003\nG004\nG005\n",
            std::fs::read_to_string(td.path().join("corella_good_genomes.tsv")).unwrap()
        );
        assert_eq!(
            "11011",
            std::fs::read_to_string(td.path().join("corella_mask.txt")).unwrap()
        );
        assert_eq!(
            ">G001\nACAT\n>G003\n-CAT\n>G005\nACTT\n>G004\nA---\n",
            std::fs::read_to_string(td.path().join("corella_concatenated.faa")).unwrap()
        );

        let report =
            std::fs::read_to_string(td.path().join("corella_filtered_genomes.tsv")).unwrap();
        assert!(report
            .contains("G002\tFiltered on quality (completeness, contamination).\t60.00\t12.00\t"));
        assert!(report.contains("G004\tRetained representative despite poor quality"));

        let markers_info =
            std::fs::read_to_string(td.path().join("corella_markers_info.tsv")).unwrap();
        assert!(markers_info.contains("PF_00001\tMarker one\tFirst test marker\t3\t100.00\t100.00"));
        assert!(markers_info.contains("TIGR_00002\tMarker two\tSecond test marker\t2\t75.00\t75.00"));

        let multi_hits =
            std::fs::read_to_string(td.path().join("corella_multi_hits.tsv")).unwrap();
        assert!(multi_hits.starts_with("Genome_ID\tPF_00001\tTIGR_00002\n"));
        assert!(multi_hits.contains("G004\tSingle\tMissing\n"));
    }

    #[test]
    fn test_curate_taxa_filter_with_guaranteed() {
        let td = tempfile::TempDir::new().unwrap();
        let tdp = td.path().to_str().unwrap();
        let mut args = curate_args(tdp);
        args.extend(
            vec![
                "--taxa-filter",
                "p__Firmicutes",
                "--guaranteed-list",
                "tests/data/set1/guaranteed.txt",
            ]
            .into_iter()
            .map(|s| s.to_string()),
        );
        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Assert::main_binary()
            .with_args(&arg_refs)
            .succeeds()
            .unwrap();

        // Only the Firmicutes genome matches, and the guaranteed g1 is
        // retained despite falling outside the taxonomic scope.
        assert_eq!(
            "G001\nG003\n",
            std::fs::read_to_string(td.path().join("corella_good_genomes.tsv")).unwrap()
        );
    }

    #[test]
    fn test_curate_exclusion_guarantee_conflict_is_fatal() {
        let td = tempfile::TempDir::new().unwrap();
        let tdp = td.path().to_str().unwrap();
        let mut args = curate_args(tdp);
        args.extend(
            vec![
                "--guaranteed-list",
                "tests/data/set1/guaranteed.txt",
                "--exclude-list",
                "tests/data/set1/exclude_conflict.txt",
            ]
            .into_iter()
            .map(|s| s.to_string()),
        );
        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Assert::main_binary().with_args(&arg_refs).fails().unwrap();
    }

    #[test]
    fn test_curate_invalid_taxon_prefix_is_fatal() {
        let td = tempfile::TempDir::new().unwrap();
        let tdp = td.path().to_str().unwrap();
        let mut args = curate_args(tdp);
        args.push("--taxa-filter".to_string());
        args.push("x__Nonsense".to_string());
        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Assert::main_binary().with_args(&arg_refs).fails().unwrap();
    }
}
