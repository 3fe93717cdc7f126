use std;
use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use crate::taxonomy::parse_taxonomy_string;

/// One row of the genome metadata table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeRecord {
    pub accession: String,
    pub completeness: f32,
    pub contamination: f32,
    /// One prefixed value per rank, domain through species.
    pub taxonomy: Vec<String>,
    pub is_representative: bool,
}

/// One row of the marker metadata table.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRecord {
    pub external_id_prefix: String,
    pub id_in_database: String,
    pub name: String,
    pub description: String,
    /// Expected aligned length in residues.
    pub size: usize,
}

impl MarkerRecord {
    pub fn external_id(&self) -> String {
        format!("{}_{}", self.external_id_prefix, self.id_in_database)
    }
}

/// One row of the aligned marker table. A row without an evalue was not
/// actually resolved, even when a sequence string is present.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedMarkerRecord {
    pub sequence: Option<String>,
    pub multiple_hits: bool,
    pub has_evalue: bool,
}

/// In-memory copy of the metadata tables the pipeline queries. Read-only
/// after loading.
#[derive(Debug)]
pub struct MetadataTables {
    pub genomes: BTreeMap<String, GenomeRecord>,
    pub markers: BTreeMap<String, MarkerRecord>,
    /// Marker ids sorted by (external_id_prefix, id_in_database), the fixed
    /// concatenation order.
    pub marker_order: Vec<String>,
    aligned: BTreeMap<(String, String), AlignedMarkerRecord>,
}

impl MetadataTables {
    pub fn total_alignment_length(&self) -> usize {
        self.markers.values().map(|m| m.size).sum()
    }

    pub fn aligned_marker(&self, genome_id: &str, marker_id: &str) -> Option<&AlignedMarkerRecord> {
        self.aligned
            .get(&(genome_id.to_string(), marker_id.to_string()))
    }

    pub fn accession<'a>(&'a self, genome_id: &'a str) -> &'a str {
        match self.genomes.get(genome_id) {
            Some(g) => &g.accession,
            None => genome_id,
        }
    }
}

fn tab_reader(file_path: &str) -> Result<csv::Reader<std::fs::File>, String> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(std::path::Path::new(file_path))
        .map_err(|e| format!("Failed to open metadata table {}: {}", file_path, e))
}

fn check_headers(
    rdr: &mut csv::Reader<std::fs::File>,
    expected: Vec<&str>,
    file_path: &str,
) -> Result<(), String> {
    let headers = rdr
        .headers()
        .map_err(|e| format!("Failed to read headers from {}: {}", file_path, e))?;
    if headers != expected {
        return Err(format!(
            "Incorrect headers found in {}: expected {:?}, found {:?}",
            file_path, expected, headers
        ));
    }
    Ok(())
}

fn parse_bool(field: &str, file_path: &str) -> Result<bool, String> {
    match field {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!(
            "Failed to parse boolean field '{}' in {}",
            field, file_path
        )),
    }
}

/// Read the genome metadata table: genome_id, accession, completeness,
/// contamination, taxonomy, representative.
pub fn read_genome_table(file_path: &str) -> Result<BTreeMap<String, GenomeRecord>, String> {
    let mut rdr = tab_reader(file_path)?;
    check_headers(
        &mut rdr,
        vec![
            "genome_id",
            "accession",
            "completeness",
            "contamination",
            "taxonomy",
            "representative",
        ],
        file_path,
    )?;

    let mut genomes = BTreeMap::new();
    for result in rdr.records() {
        let res = result.map_err(|e| format!("Parsing error in genome table: {}", e))?;
        if res.len() != 6 {
            return Err(format!(
                "Parsing error in genome table - didn't find 6 columns in line {:?}",
                res
            ));
        }
        let completeness: f32 = res[2]
            .parse()
            .map_err(|_| format!("Error parsing completeness '{}' in genome table", &res[2]))?;
        let contamination: f32 = res[3]
            .parse()
            .map_err(|_| format!("Error parsing contamination '{}' in genome table", &res[3]))?;
        let record = GenomeRecord {
            accession: res[1].to_string(),
            completeness,
            contamination,
            taxonomy: parse_taxonomy_string(&res[4])?,
            is_representative: parse_bool(&res[5], file_path)?,
        };
        trace!("For {}, read genome record {:?}", &res[0], record);
        if genomes.insert(res[0].to_string(), record).is_some() {
            return Err(format!(
                "The genome {} was found multiple times in the genome table {}",
                &res[0], file_path
            ));
        }
    }
    debug!("Read in {} genomes from {}", genomes.len(), file_path);
    Ok(genomes)
}

/// Read the marker metadata table: marker_id, prefix, id_in_database, name,
/// description, size. Returns the markers keyed by id plus their display
/// order (prefix ASC, id_in_database ASC).
pub fn read_marker_table(
    file_path: &str,
) -> Result<(BTreeMap<String, MarkerRecord>, Vec<String>), String> {
    let mut rdr = tab_reader(file_path)?;
    check_headers(
        &mut rdr,
        vec![
            "marker_id",
            "prefix",
            "id_in_database",
            "name",
            "description",
            "size",
        ],
        file_path,
    )?;

    let mut markers = BTreeMap::new();
    for result in rdr.records() {
        let res = result.map_err(|e| format!("Parsing error in marker table: {}", e))?;
        if res.len() != 6 {
            return Err(format!(
                "Parsing error in marker table - didn't find 6 columns in line {:?}",
                res
            ));
        }
        let size: usize = res[5]
            .parse()
            .map_err(|_| format!("Error parsing marker size '{}' in marker table", &res[5]))?;
        let record = MarkerRecord {
            external_id_prefix: res[1].to_string(),
            id_in_database: res[2].to_string(),
            name: res[3].to_string(),
            description: res[4].to_string(),
            size,
        };
        if markers.insert(res[0].to_string(), record).is_some() {
            return Err(format!(
                "The marker {} was found multiple times in the marker table {}",
                &res[0], file_path
            ));
        }
    }

    let mut marker_order: Vec<String> = markers.keys().cloned().collect();
    marker_order.sort_by(|a, b| {
        let ma = &markers[a];
        let mb = &markers[b];
        (&ma.external_id_prefix, &ma.id_in_database)
            .cmp(&(&mb.external_id_prefix, &mb.id_in_database))
    });
    debug!("Read in {} markers from {}", markers.len(), file_path);
    Ok((markers, marker_order))
}

/// Read the aligned marker table: genome_id, marker_id, sequence,
/// multiple_hits, evalue. An empty evalue field marks an unresolved hit.
pub fn read_aligned_marker_table(
    file_path: &str,
) -> Result<BTreeMap<(String, String), AlignedMarkerRecord>, String> {
    let mut rdr = tab_reader(file_path)?;
    check_headers(
        &mut rdr,
        vec!["genome_id", "marker_id", "sequence", "multiple_hits", "evalue"],
        file_path,
    )?;

    let mut aligned = BTreeMap::new();
    for result in rdr.records() {
        let res = result.map_err(|e| format!("Parsing error in aligned marker table: {}", e))?;
        if res.len() != 5 {
            return Err(format!(
                "Parsing error in aligned marker table - didn't find 5 columns in line {:?}",
                res
            ));
        }
        let record = AlignedMarkerRecord {
            sequence: match &res[2] {
                "" => None,
                s => Some(s.to_string()),
            },
            multiple_hits: parse_bool(&res[3], file_path)?,
            has_evalue: !res[4].is_empty(),
        };
        let key = (res[0].to_string(), res[1].to_string());
        if aligned.insert(key, record).is_some() {
            return Err(format!(
                "The genome/marker pair {}/{} was found multiple times in {}",
                &res[0], &res[1], file_path
            ));
        }
    }
    debug!(
        "Read in {} aligned marker records from {}",
        aligned.len(),
        file_path
    );
    Ok(aligned)
}

/// Read a one-genome-id-per-line list file e.g. guaranteed or excluded
/// genomes. Blank lines are ignored.
pub fn read_genome_list(file_path: &str) -> Result<BTreeSet<String>, String> {
    let file = std::fs::File::open(file_path)
        .map_err(|e| format!("Failed to open genome list {}: {}", file_path, e))?;
    let mut ids = BTreeSet::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(|e| format!("Failed to read genome list {}: {}", file_path, e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            ids.insert(trimmed.to_string());
        }
    }
    debug!("Read in {} genome ids from {}", ids.len(), file_path);
    Ok(ids)
}

/// Load all three metadata tables.
pub fn load_metadata(
    genome_table_path: &str,
    marker_table_path: &str,
    aligned_marker_table_path: &str,
) -> Result<MetadataTables, String> {
    let genomes = read_genome_table(genome_table_path)?;
    let (markers, marker_order) = read_marker_table(marker_table_path)?;
    let aligned = read_aligned_marker_table(aligned_marker_table_path)?;

    for ((genome_id, marker_id), _) in aligned.iter() {
        if !markers.contains_key(marker_id) {
            return Err(format!(
                "Aligned marker table references unknown marker {}",
                marker_id
            ));
        }
        if !genomes.contains_key(genome_id) {
            return Err(format!(
                "Aligned marker table references unknown genome {}",
                genome_id
            ));
        }
    }

    Ok(MetadataTables {
        genomes,
        markers,
        marker_order,
        aligned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_read_genome_table() {
        init();
        let genomes = read_genome_table("tests/data/set1/genomes.tsv").unwrap();
        assert_eq!(5, genomes.len());
        let g1 = &genomes["g1"];
        assert_eq!("G001", g1.accession);
        assert_eq!(95., g1.completeness);
        assert_eq!(1., g1.contamination);
        assert_eq!("p__Proteobacteria", g1.taxonomy[1]);
        assert!(!g1.is_representative);
        assert!(genomes["g4"].is_representative);
    }

    #[test]
    fn test_read_marker_table_ordering() {
        init();
        let (markers, order) = read_marker_table("tests/data/set1/markers.tsv").unwrap();
        assert_eq!(2, markers.len());
        // PF sorts before TIGR regardless of row order in the file.
        assert_eq!(vec!["m1".to_string(), "m2".to_string()], order);
        assert_eq!("PF_00001", markers["m1"].external_id());
        assert_eq!(3, markers["m1"].size);
    }

    #[test]
    fn test_read_aligned_marker_table() {
        init();
        let aligned = read_aligned_marker_table("tests/data/set1/aligned_markers.tsv").unwrap();
        let rec = &aligned[&("g1".to_string(), "m1".to_string())];
        assert_eq!(Some("AC-".to_string()), rec.sequence);
        assert!(!rec.multiple_hits);
        assert!(rec.has_evalue);
        assert!(!aligned.contains_key(&("g4".to_string(), "m2".to_string())));
    }

    #[test]
    fn test_total_alignment_length() {
        init();
        let metadata = load_metadata(
            "tests/data/set1/genomes.tsv",
            "tests/data/set1/markers.tsv",
            "tests/data/set1/aligned_markers.tsv",
        )
        .unwrap();
        assert_eq!(5, metadata.total_alignment_length());
    }

    #[test]
    fn test_fail_on_wrong_headers() {
        init();
        assert!(read_genome_table("tests/data/set1/markers.tsv").is_err());
    }
}
