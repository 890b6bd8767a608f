pub mod editor;
pub mod fasta;
pub mod fns;
pub mod seq;

pub use editor::*;
pub use fasta::*;
pub use fns::*;
pub use seq::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const MIN_THREADS: usize = 1;
pub const REFFLAT_FIELDS: usize = 11;
pub const GTF_FIELDS: usize = 9;
pub const GUIDE_LENGTH: usize = 20;
pub const DEFAULT_HALF_WIDTH: u64 = 25;
pub const MAX_BED_SCORE: u64 = 100;

// fixed offsets inside a 50bp splice window
pub const ACCEPTOR_CDS_BOUNDARY: usize = 25; // first coding base
pub const DONOR_CDS_BOUNDARY: usize = 24; // last coding base
pub const ACCEPTOR_DINUCLEOTIDE: (usize, &str) = (23, "AG");
pub const DONOR_DINUCLEOTIDE: (usize, &str) = (25, "GT");

// file names
pub const CLASSIFIED_EXONS: &str = "classified_exons.tsv";
pub const DESIGNED_GUIDES: &str = "designed_sgrnas.tsv";
pub const OFFTARGET_COUNTS: &str = "offtarget_counts.tsv";
pub const TABLE_SUFFIX: &str = "table.tsv";
pub const TRACK_SUFFIX: &str = "ucsc_custom_track.bed";
pub const SUMMARY_SUFFIX: &str = "summary.json";
pub const RUN_PREFIX: &str = "sgrnas_designed_by_altex";

// track colors
pub const ABE_RGB: &str = "255,0,0"; // red
pub const CBE_RGB: &str = "0,0,255"; // blue

// accepted extensions
pub const REFFLAT_EXTENSIONS: [&str; 4] = ["txt", "refflat", "tsv", "gz"];
pub const GTF_EXTENSIONS: [&str; 2] = ["gtf", "gz"];
pub const FASTA_EXTENSIONS: [&str; 5] = ["fa", "fasta", "fna", "fas", "gz"];
