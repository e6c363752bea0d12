use std::fs;
use std::path::{Path, PathBuf};

use rust_htslib::bam::{
    self,
    header::HeaderRecord,
    record::{Aux, Cigar, CigarString},
};

use linkasm::barcode::{Barcode, BarcodeReadStore};
use linkasm::command::Assemble;
use linkasm::fileformat::{AlignmentStore, HtsAlignmentStore, FLAG_PAIRED, FLAG_UNMAPPED};
use linkasm::runtime::{Config, StoreParams};

const GENOME: &str = "GCTAAAGACAATTACATAACATACACGTCAGCACGAAACTTGTTGGCCCAGTGTGAATCGCTTAAGGGTTAAGTAAGTGTGATGCATACGCCTTTACTTGCTGTGTCCACCCCATCGGAC";
const LEFT_FLANK: &str = "TTTCCTCATGCAATTCAAAACCATGTCCGTAATGTAGGCGAAATAGTAAACCATTTTACGGAGGATACCAAATTCCTCCTTATTCAGGACCTAACCTGAGGTAAACCAGGTCTCTCCGCCCCCTTATAAAAGCTGTTGCACCTAGCCAA";
const RIGHT_FLANK: &str = "GTTCAACGGCAGCTGCAATGGAAATAGGCAATGACGGATATATATTAAAAAGTGTTTTAAGATACATTGAGGCCCGTTCGTGCTCCTCGCCCTGAAGCATTGCTTTGTGAAGAGGGACTTCAGCCAATAGA";

struct TestRead {
    name: &'static str,
    tid: i32,
    pos: i64,
    offset: usize,
    flags: u16,
}

/// Write a sorted BAM over `contigs` and index it
fn write_indexed_bam(path: &Path, contigs: &[(&str, u64)], reads: &[TestRead]) {
    let mut header = bam::Header::new();
    let mut hd = HeaderRecord::new(b"HD");
    hd.push_tag(b"VN", "1.6");
    hd.push_tag(b"SO", "coordinate");
    header.push_record(&hd);
    for (name, len) in contigs {
        let mut sq = HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", name);
        sq.push_tag(b"LN", len);
        header.push_record(&sq);
    }

    {
        let mut writer = bam::Writer::from_path(path, &header, bam::Format::Bam).unwrap();
        for r in reads {
            let seq = &GENOME.as_bytes()[r.offset..r.offset + 60];
            let qual = vec![30u8; seq.len()];
            let cigar = CigarString(vec![Cigar::Match(seq.len() as u32)]);
            let mut record = bam::Record::new();
            record.set(r.name.as_bytes(), Some(&cigar), seq, &qual);
            record.set_tid(r.tid);
            record.set_pos(r.pos);
            record.set_mtid(r.tid);
            record.set_mpos(r.pos);
            record.set_mapq(60);
            record.set_flags(r.flags);
            record.push_aux(b"BX", Aux::String("AAAA-1")).unwrap();
            writer.write(&record).unwrap();
        }
    }
    bam::index::build(path, None, bam::index::Type::Bai, 1).unwrap();
}

fn tiles() -> Vec<(&'static str, usize)> {
    vec![("r0", 0), ("r1", 20), ("r2", 40), ("r3", 60)]
}

/// Coordinate-sorted file: three tiles inside chr1:100-300, the fourth on chr5.
/// Barcode-sorted file: all four in the AAAA_1 block
fn write_stores(dir: &Path) -> (PathBuf, PathBuf) {
    let by_coord = dir.join("reads.bam");
    let mut reads: Vec<TestRead> = tiles()
        .into_iter()
        .take(3)
        .map(|(name, offset)| TestRead {
            name,
            tid: 0,
            pos: 149 + offset as i64,
            offset,
            flags: FLAG_PAIRED,
        })
        .collect();
    reads.push(TestRead {
        name: "r3",
        tid: 1,
        pos: 88_000,
        offset: 60,
        flags: FLAG_PAIRED,
    });
    write_indexed_bam(&by_coord, &[("chr1", 10_000), ("chr5", 100_000)], &reads);

    let by_barcode = dir.join("reads.bx.bam");
    let mut reads: Vec<TestRead> = tiles()
        .into_iter()
        .enumerate()
        .map(|(i, (name, offset))| TestRead {
            name,
            tid: 0,
            pos: i as i64,
            offset,
            flags: FLAG_PAIRED,
        })
        .collect();
    reads.push(TestRead {
        name: "u0",
        tid: 1,
        pos: 0,
        offset: 5,
        flags: FLAG_PAIRED | FLAG_UNMAPPED,
    });
    write_indexed_bam(&by_barcode, &[("AAAA_1", 1_000), ("CCCC_1", 1_000)], &reads);

    (by_coord, by_barcode)
}

#[test]
fn test_region_and_block_queries() {
    let dir = tempfile::tempdir().unwrap();
    let (by_coord, by_barcode) = write_stores(dir.path());

    let mut store = HtsAlignmentStore::open(&by_coord).unwrap();
    let local = store.fetch_region("chr1", 100, 300).unwrap();
    assert_eq!(local.len(), 3);
    assert!(local.iter().all(|r| r.barcode.as_deref() == Some("AAAA-1")));
    assert_eq!(local[0].pos, 149);
    assert_eq!(local[0].end, 209);
    assert!(store.fetch_region("chrUn", 1, 100).unwrap().is_empty());

    let params = StoreParams {
        weird_reads_only: false,
        ..StoreParams::default()
    };
    let mut barcodes = BarcodeReadStore::open(&by_barcode, &params).unwrap();
    let block = barcodes.fetch_by_barcode(&Barcode::new("AAAA-1")).unwrap();
    assert_eq!(block.len(), 4);
    assert_eq!(block, barcodes.fetch_by_barcode(&Barcode::new("AAAA_1")).unwrap());
    assert!(barcodes.fetch_by_barcode(&Barcode::new("GGGG-1")).unwrap().is_empty());

    let mut weird_only = BarcodeReadStore::open(&by_barcode, &StoreParams::default()).unwrap();
    let weird = weird_only.fetch_by_barcode(&Barcode::new("CCCC-1")).unwrap();
    assert_eq!(weird.len(), 1);
    assert_eq!(weird[0].qname, "u0");
}

#[test]
fn test_assemble_command_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (by_coord, by_barcode) = write_stores(dir.path());

    let reference = dir.path().join("ref.fa");
    fs::write(
        &reference,
        format!(">chr1\n{}{}{}\n", LEFT_FLANK, GENOME, RIGHT_FLANK),
    )
    .unwrap();

    let outdir = dir.path().join("out");
    let config = Config {
        store: StoreParams {
            weird_reads_only: false,
            ..StoreParams::default()
        },
        ..Config::default()
    };
    Assemble {
        path_in: by_coord,
        path_bx: by_barcode,
        windows: vec!["chr1:100-300".parse().unwrap()],
        path_out: outdir.clone(),
        path_reference: Some(reference),
        align_reads: true,
        num_threads: 2,
        config,
    }
    .run()
    .unwrap();

    let contigs = fs::read_to_string(outdir.join("chr1_100_300_contigs.fa")).unwrap();
    assert_eq!(contigs, format!(">chr1_100_300_1 sources=4\n{}\n", GENOME));

    let alignments = fs::read_to_string(outdir.join("chr1_100_300_alignments.txt")).unwrap();
    assert_eq!(
        alignments,
        "chr1_100_300 201 50 170 chr1_100_300_1 120 0 120 0 + 120M\n"
    );

    assert!(outdir.join("chr1_100_300_read_alignments.txt").exists());
    assert!(outdir.join("chr1_100_300_graph.asqg").exists());
    assert!(outdir.join("chr1_100_300_pruned_graph.asqg").exists());
}

#[test]
fn test_missing_store_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let result = Assemble {
        path_in: dir.path().join("missing.bam"),
        path_bx: dir.path().join("missing.bx.bam"),
        windows: vec!["chr1:100-300".parse().unwrap()],
        path_out: dir.path().join("out"),
        path_reference: None,
        align_reads: false,
        num_threads: 1,
        config: Config::default(),
    }
    .run();
    assert!(result.is_err());
}
