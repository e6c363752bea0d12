use bio::alphabets::dna;

use linkasm::align::{write_summary, SequenceAligner};
use linkasm::fileformat::{NamedSequence, Read, FLAG_PAIRED};
use linkasm::runtime::{AlignerParams, Error};

const GENOME: &str = "GCTAAAGACAATTACATAACATACACGTCAGCACGAAACTTGTTGGCCCAGTGTGAATCGCTTAAGGGTTAAGTAAGTGTGATGCATACGCCTTTACTTGCTGTGTCCACCCCATCGGAC";
const LEFT_FLANK: &str = "TTTCCTCATGCAATTCAAAACCATGTCCGTAATGTAGGCGAAATAGTAAACCATTTTACGGAGGATACCAAATTCCTCCTTATTCAGGACCTAACCTGAGGTAAACCAGGTCTCTCCGCCCCCTTATAAAAGCTGTTGCACCTAGCCAA";
const RIGHT_FLANK: &str = "GTTCAACGGCAGCTGCAATGGAAATAGGCAATGACGGATATATATTAAAAAGTGTTTTAAGATACATTGAGGCCCGTTCGTGCTCCTCGCCCTGAAGCATTGCTTTGTGAAGAGGGACTTCAGCCAATAGA";

fn two_copy_aligner() -> SequenceAligner {
    let targets = vec![
        NamedSequence::new("t1", format!("{}{}", LEFT_FLANK, GENOME).into_bytes()),
        NamedSequence::new("t2", format!("{}{}", GENOME, RIGHT_FLANK).into_bytes()),
    ];
    SequenceAligner::build_index(targets, &AlignerParams::default()).unwrap()
}

#[test]
fn test_repeated_hits_are_ranked_and_ambiguous() {
    let aligner = two_copy_aligner();
    let query = NamedSequence::new("q", GENOME.as_bytes()[10..110].to_vec());
    let hits = aligner.align(&[query]);

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].target_name, "t1");
    assert_eq!((hits[0].target_start, hits[0].target_end), (159, 259));
    assert_eq!(hits[1].target_name, "t2");
    assert_eq!((hits[1].target_start, hits[1].target_end), (10, 110));
    assert_eq!((hits[0].rank, hits[1].rank), (0, 1));
    assert_eq!(hits[0].score, hits[1].score);
    assert_eq!((hits[0].mapq, hits[1].mapq), (0, 0));
}

#[test]
fn test_unique_hit_on_reverse_strand() {
    let aligner = SequenceAligner::single_target(
        NamedSequence::new("w", format!("{}{}{}", LEFT_FLANK, GENOME, RIGHT_FLANK).into_bytes()),
        &AlignerParams::default(),
    )
    .unwrap();
    let query = NamedSequence::new("rc", dna::revcomp(GENOME.as_bytes()));
    let hits = aligner.align(&[query]);

    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert!(hit.reverse);
    assert_eq!((hit.target_start, hit.target_end), (149, 269));
    assert_eq!((hit.query_start, hit.query_end), (0, 120));
    assert_eq!(hit.cigar.to_string(), "120M");
    assert_eq!(hit.mapq, 60);

    let mut out = Vec::new();
    write_summary(&mut out, &hits).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "w 400 149 269 rc 120 0 120 0 - 120M\n"
    );
}

#[test]
fn test_repeated_reads_keep_all_hits() {
    let aligner = two_copy_aligner();
    let reads = vec![
        Read::new("pair1", &GENOME.as_bytes()[0..100]).with_flags(FLAG_PAIRED),
        Read::new("pair1", &GENOME.as_bytes()[0..100]).with_flags(FLAG_PAIRED),
    ];
    let hits = aligner.align_reads(&reads);
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|h| h.query_name == "pair1"));
    assert_eq!(hits[0..2], hits[2..4]);
}

#[test]
fn test_repeated_queries_aligned_once() {
    let aligner = two_copy_aligner();
    let query = NamedSequence::new("q", GENOME.as_bytes()[0..100].to_vec());
    let hits = aligner.align(&[query.clone(), query]);
    assert_eq!(hits.len(), 2);
}

#[test]
fn test_empty_targets_rejected() {
    let params = AlignerParams::default();
    let result = SequenceAligner::build_index(vec![NamedSequence::new("x", Vec::new())], &params);
    assert!(matches!(result, Err(Error::AlignmentIndex { .. })));
    assert!(SequenceAligner::build_index(Vec::new(), &params).is_err());
}
