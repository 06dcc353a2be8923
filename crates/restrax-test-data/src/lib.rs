//! restrax-test-data
//!
//! A module to provide test files embedded in the crate for use in testing.
//! Coordinate and restraint fixtures are included in the crate distribution.
//!
//! The test files are represented as `TestFile` objects which package the raw
//! binary data and create temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use restrax_test_data::TestFile;
/// let (cif_file, _temp) = TestFile::peptide_cif().create_temp().unwrap();
/// let (mr_file, _temp) = TestFile::distance_auth().create_temp().unwrap();
///
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Five-residue peptide (MET-ALA-GLY-LEU-VAL, auth numbering 101..105)
    /// plus a zinc ion, solution NMR.
    pub fn peptide_cif() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/peptide.cif"),
            suffix: "cif",
        }
    }

    /// Distance restraints referencing the peptide by author numbering.
    pub fn distance_auth() -> Self {
        Self {
            filebinary: include_bytes!("../data/restraints/distance_auth.txt"),
            suffix: "txt",
        }
    }

    /// The same restraints written against label numbering 1..5; needs the
    /// reparse-reason round trip to resolve fully.
    pub fn distance_offset() -> Self {
        Self {
            filebinary: include_bytes!("../data/restraints/distance_offset.txt"),
            suffix: "txt",
        }
    }

    /// Backbone dihedral restraints, one row with out-of-convention angles.
    pub fn dihedral() -> Self {
        Self {
            filebinary: include_bytes!("../data/restraints/dihedral.txt"),
            suffix: "txt",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
