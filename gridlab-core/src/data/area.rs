//! Bidding zones known to the pipeline and their ENTSO-E EIC codes.

use super::provider::DataError;

/// A bidding zone: short region code plus its Energy Identification Code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub code: &'static str,
    pub eic: &'static str,
    pub name: &'static str,
}

pub const AREAS: &[Area] = &[
    Area {
        code: "DE_LU",
        eic: "10Y1001A1001A82H",
        name: "Germany-Luxembourg",
    },
    Area {
        code: "FR",
        eic: "10YFR-RTE------C",
        name: "France",
    },
    Area {
        code: "NL",
        eic: "10YNL----------L",
        name: "Netherlands",
    },
    Area {
        code: "BE",
        eic: "10YBE----------2",
        name: "Belgium",
    },
    Area {
        code: "AT",
        eic: "10YAT-APG------L",
        name: "Austria",
    },
    Area {
        code: "ES",
        eic: "10YES-REE------0",
        name: "Spain",
    },
    Area {
        code: "PL",
        eic: "10YPL-AREA-----S",
        name: "Poland",
    },
    Area {
        code: "DK_1",
        eic: "10YDK-1--------W",
        name: "Denmark West",
    },
    Area {
        code: "DK_2",
        eic: "10YDK-2--------M",
        name: "Denmark East",
    },
    Area {
        code: "IT_NORD",
        eic: "10Y1001A1001A73I",
        name: "Italy North",
    },
    Area {
        code: "CH",
        eic: "10YCH-SWISSGRIDZ",
        name: "Switzerland",
    },
    Area {
        code: "CZ",
        eic: "10YCZ-CEPS-----N",
        name: "Czech Republic",
    },
];

impl Area {
    /// Look up a zone by region code (case-insensitive).
    pub fn lookup(code: &str) -> Result<&'static Area, DataError> {
        AREAS
            .iter()
            .find(|a| a.code.eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| DataError::UnknownRegion(code.to_string()))
    }
}
