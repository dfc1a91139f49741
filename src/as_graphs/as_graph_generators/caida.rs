use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::as_graphs::as_graph::ASN;
use crate::as_graphs::links::{ASGraphInfo, CustomerProviderLink, PeerLink};
use crate::shared::CaidaParseError;

const INPUT_CLIQUE_HEADER: &str = "# input clique:";
const IXP_HEADER: &str = "# IXP ASes:";

/// Reads an already downloaded CAIDA serial-2 relationship file
pub struct CAIDAASGraphReader {
    file_path: PathBuf,
}

impl CAIDAASGraphReader {
    pub fn new(file_path: &Path) -> Self {
        CAIDAASGraphReader {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<ASGraphInfo, CaidaParseError> {
        debug!("reading CAIDA relationships from {:?}", self.file_path);
        let file = File::open(&self.file_path)?;
        parse_serial_2(BufReader::new(file))
    }
}

/// Parses CAIDA serial-2 text.
///
/// Data lines are `asn1|asn2|rel[|source]` where `-1` means asn1 is the
/// provider of asn2 and `0` means they peer. The input clique and the IXPs
/// come from their comment headers; other comments are skipped.
pub fn parse_serial_2<R: BufRead>(reader: R) -> Result<ASGraphInfo, CaidaParseError> {
    let mut info = ASGraphInfo::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(INPUT_CLIQUE_HEADER) {
            info.input_clique_asns.extend(parse_asn_list(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix(IXP_HEADER) {
            info.ixp_asns.extend(parse_asn_list(rest, line_no)?);
        } else if !line.starts_with('#') && !line.is_empty() {
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return Err(CaidaParseError::Malformed {
                    line: line_no,
                    reason: format!("expected at least 3 fields, found {}", parts.len()),
                });
            }
            let asn1 = parse_asn(parts[0], line_no)?;
            let asn2 = parse_asn(parts[1], line_no)?;
            match parts[2].trim() {
                "-1" => {
                    info.customer_provider_links
                        .insert(CustomerProviderLink::new(asn2, asn1));
                }
                "0" => {
                    info.peer_links.insert(PeerLink::new(asn1, asn2));
                }
                other => warn!("line {}: unknown relationship type {:?}, skipped", line_no, other),
            }
        }
    }
    Ok(info)
}

fn parse_asn(field: &str, line: usize) -> Result<ASN, CaidaParseError> {
    field.trim().parse::<ASN>().map_err(|e| CaidaParseError::Malformed {
        line,
        reason: format!("bad ASN {:?}: {}", field, e),
    })
}

fn parse_asn_list(list: &str, line: usize) -> Result<Vec<ASN>, CaidaParseError> {
    list.split_whitespace()
        .map(|field| parse_asn(field, line))
        .collect()
}
