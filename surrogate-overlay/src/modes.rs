/*
This code is part of the SurrogateTools spatial allocation library.
Authors: Ana Torres
Created: 02/04/2024
Last Modified: 05/06/2024
License: MIT
*/

//! The allocation mode file: one `ATTRIBUTE=<name>:<mode>` line per
//! attribute to carry into an allocation output. In place of a file path,
//! the sentinels `ALL_AGGREGATE`, `ALL_AVERAGE`, `ALL_DISCRETEOVERLAP`,
//! `ALL_DISCRETECENTROID`, and `ALL_AREAPERCENT` apply one mode to every
//! attribute.

use std::fs::File;
use std::io::{BufRead, BufReader, Error, ErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationMode {
    NotFound,
    Aggregate,
    Average,
    DiscreteOverlap,
    DiscreteCentroid,
    AreaPercent,
}

/// The parsed mode selections, looked up per attribute name.
pub struct ModeTable {
    entries: Vec<(String, AllocationMode)>,
    all: Option<AllocationMode>,
}

impl ModeTable {
    /// Reads a mode file, or recognizes an ALL sentinel in place of a
    /// path. Lines are case-insensitive; empty lines and `#` comments are
    /// skipped, as is any line without the ATTRIBUTE keyword. A repeated
    /// attribute name or an unknown mode is an error.
    pub fn read(name: &str) -> Result<ModeTable, Error> {
        let all = match name {
            "ALL_AGGREGATE" => Some(AllocationMode::Aggregate),
            "ALL_AVERAGE" => Some(AllocationMode::Average),
            "ALL_DISCRETEOVERLAP" => Some(AllocationMode::DiscreteOverlap),
            "ALL_DISCRETECENTROID" => Some(AllocationMode::DiscreteCentroid),
            "ALL_AREAPERCENT" => Some(AllocationMode::AreaPercent),
            _ => None,
        };
        if all.is_some() {
            return Ok(ModeTable {
                entries: vec![],
                all,
            });
        }

        let file = File::open(name).map_err(|e| {
            Error::new(
                e.kind(),
                format!("Unable to open the allocation mode file {}: {}", name, e),
            )
        })?;
        let mut entries: Vec<(String, AllocationMode)> = vec![];
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let upper = trimmed.to_uppercase();
            if !upper.contains("ATTRIBUTE") {
                continue;
            }
            let rhs = match upper.split_once('=') {
                Some((_, rhs)) => rhs.trim(),
                None => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Syntax error in {}, line {}", name, trimmed),
                    ));
                }
            };
            let (attr, mode_name) = match rhs.split_once(':') {
                Some((a, m)) => (a.trim().to_string(), m.trim()),
                None => {
                    return Err(Error::new(
                        ErrorKind::InvalidData,
                        format!("Syntax error in {}, line {}", name, trimmed),
                    ));
                }
            };
            let mode = parse_mode(mode_name).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("Unknown processing mode ({}) detected in {}.", mode_name, name),
                )
            })?;
            if entries.iter().any(|(n, _)| *n == attr) {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "ATTRIBUTE={} appears more than once in the allocation mode file.",
                        attr
                    ),
                ));
            }
            entries.push((attr, mode));
        }
        Ok(ModeTable { entries, all: None })
    }

    /// The mode for an attribute: the ALL mode when one is in force,
    /// otherwise the file entry, otherwise NotFound.
    pub fn mode_for(&self, name: &str) -> AllocationMode {
        if let Some(mode) = self.all {
            return mode;
        }
        let upper = name.to_uppercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, m)| *m)
            .unwrap_or(AllocationMode::NotFound)
    }
}

fn parse_mode(name: &str) -> Option<AllocationMode> {
    match name.replace('_', "").as_str() {
        "AGGREGATE" => Some(AllocationMode::Aggregate),
        "AVERAGE" => Some(AllocationMode::Average),
        "DISCRETEOVERLAP" => Some(AllocationMode::DiscreteOverlap),
        "DISCRETECENTROID" => Some(AllocationMode::DiscreteCentroid),
        "AREAPERCENT" => Some(AllocationMode::AreaPercent),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::{AllocationMode, ModeTable};
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_mode_file_parse() {
        let path = temp_file(
            "srgt_modes_test.txt",
            "# allocation modes\n\
             ATTRIBUTE=POP2000:AGGREGATE\n\
             ATTRIBUTE=AvgInc:Average\n\
             ATTRIBUTE=FIPS:discrete_overlap\n\
             ATTRIBUTE=NEAR:DiscreteCentroid\n\
             stray line without the keyword\n",
        );
        let table = ModeTable::read(path.to_str().unwrap()).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(table.mode_for("POP2000"), AllocationMode::Aggregate);
        assert_eq!(table.mode_for("AVGINC"), AllocationMode::Average);
        assert_eq!(table.mode_for("avginc"), AllocationMode::Average);
        assert_eq!(table.mode_for("FIPS"), AllocationMode::DiscreteOverlap);
        assert_eq!(table.mode_for("NEAR"), AllocationMode::DiscreteCentroid);
        assert_eq!(table.mode_for("ELSE"), AllocationMode::NotFound);
    }

    #[test]
    fn test_all_sentinels_apply_everywhere() {
        let table = ModeTable::read("ALL_AGGREGATE").unwrap();
        assert_eq!(table.mode_for("ANYTHING"), AllocationMode::Aggregate);
        let table = ModeTable::read("ALL_AREAPERCENT").unwrap();
        assert_eq!(table.mode_for("LU_TYPE"), AllocationMode::AreaPercent);
    }

    #[test]
    fn test_duplicate_attribute_is_an_error() {
        let path = temp_file(
            "srgt_modes_dup.txt",
            "ATTRIBUTE=POP:AGGREGATE\nATTRIBUTE=POP:AVERAGE\n",
        );
        let result = ModeTable::read(path.to_str().unwrap());
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let path = temp_file("srgt_modes_bad.txt", "ATTRIBUTE=POP:MEDIAN\n");
        let result = ModeTable::read(path.to_str().unwrap());
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_colon_is_an_error() {
        let path = temp_file("srgt_modes_colon.txt", "ATTRIBUTE=POP AGGREGATE\n");
        let result = ModeTable::read(path.to_str().unwrap());
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }
}
