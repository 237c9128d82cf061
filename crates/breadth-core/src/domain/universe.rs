use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{SectorId, Symbol, ValidationError};

/// Fixed list of symbols assigned to one sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRoster")]
pub struct SectorRoster {
    pub sector: SectorId,
    pub symbols: Vec<Symbol>,
}

#[derive(Deserialize)]
struct RawRoster {
    sector: SectorId,
    symbols: Vec<Symbol>,
}

impl From<RawRoster> for SectorRoster {
    fn from(raw: RawRoster) -> Self {
        Self::new(raw.sector, raw.symbols)
    }
}

impl SectorRoster {
    /// Builds a roster; repeated symbols are kept once, first occurrence wins.
    pub fn new(sector: SectorId, symbols: Vec<Symbol>) -> Self {
        let mut seen = HashSet::with_capacity(symbols.len());
        let symbols = symbols
            .into_iter()
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect();
        Self { sector, symbols }
    }

    pub fn parse(sector: &str, symbols: &[&str]) -> Result<Self, ValidationError> {
        let sector = SectorId::parse(sector)?;
        let symbols = symbols
            .iter()
            .map(|symbol| Symbol::parse(symbol))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(sector, symbols))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }
}

/// Ordered set of sector rosters that make up the breadth universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SectorRoster>", into = "Vec<SectorRoster>")]
pub struct Universe {
    rosters: Vec<SectorRoster>,
}

impl Universe {
    pub fn new(rosters: Vec<SectorRoster>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(rosters.len());
        for roster in &rosters {
            if !seen.insert(roster.sector.clone()) {
                return Err(ValidationError::DuplicateSector {
                    sector: roster.sector.to_string(),
                });
            }
        }
        Ok(Self { rosters })
    }

    pub fn rosters(&self) -> &[SectorRoster] {
        &self.rosters
    }

    pub fn sector_count(&self) -> usize {
        self.rosters.len()
    }

    pub fn roster(&self, sector: &SectorId) -> Option<&SectorRoster> {
        self.rosters.iter().find(|roster| &roster.sector == sector)
    }

    /// Distinct symbols across all rosters, in first-seen order.
    pub fn distinct_symbols(&self) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        self.rosters
            .iter()
            .flat_map(|roster| roster.symbols.iter())
            .filter(|symbol| seen.insert((*symbol).clone()))
            .cloned()
            .collect()
    }

    /// Restricts the universe to the given sectors, keeping configured order.
    pub fn select(&self, sectors: &[SectorId]) -> Result<Self, ValidationError> {
        for sector in sectors {
            if self.roster(sector).is_none() {
                return Err(ValidationError::InvalidSectorId {
                    value: sector.to_string(),
                });
            }
        }

        Ok(Self {
            rosters: self
                .rosters
                .iter()
                .filter(|roster| sectors.contains(&roster.sector))
                .cloned()
                .collect(),
        })
    }
}

impl TryFrom<Vec<SectorRoster>> for Universe {
    type Error = ValidationError;

    fn try_from(value: Vec<SectorRoster>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Universe> for Vec<SectorRoster> {
    fn from(value: Universe) -> Self {
        value.rosters
    }
}

impl Default for Universe {
    fn default() -> Self {
        let rosters = SPDR_SECTORS
            .iter()
            .map(|(sector, symbols)| {
                SectorRoster::parse(sector, symbols).expect("built-in rosters are valid")
            })
            .collect();
        Self::new(rosters).expect("built-in sectors are distinct")
    }
}

/// Built-in universe: the largest holdings of each SPDR sector ETF.
const SPDR_SECTORS: &[(&str, &[&str])] = &[
    (
        "XLV",
        &[
            "LLY", "UNH", "JNJ", "ABBV", "MRK", "TMO", "ABT", "DHR", "AMGN", "ISRG", "PFE",
            "REGN", "ELV", "VRTX", "BSX", "SYK", "MDT", "BMY", "CI", "GILD", "ZTS", "CVS", "HCA",
            "MCK", "BDX", "IQV", "HUM", "CNC", "A", "EW",
        ],
    ),
    (
        "XLI",
        &[
            "GE", "CAT", "RTX", "UBER", "UNP", "HON", "LMT", "ETN", "ADP", "BA", "DE", "UPS",
            "TT", "WM", "PH", "TDG", "MMM", "NOC", "GD", "CTAS", "ITW", "CSX", "FDX", "EMR",
            "CARR", "NSC", "GEV", "PCAR", "URI", "JCI",
        ],
    ),
    (
        "XLY",
        &[
            "AMZN", "TSLA", "HD", "MCD", "LOW", "TJX", "BKNG", "SBUX", "NKE", "CMG", "ORLY",
            "AZO", "MAR", "DHI", "HLT", "ABNB", "GM", "ROST", "LEN", "F", "YUM", "RCL", "LULU",
            "EBAY", "TSCO", "NVR", "GRMN", "PHM", "DECK", "GPC",
        ],
    ),
    (
        "XLU",
        &[
            "NEE", "SO", "DUK", "CEG", "AEP", "SRE", "D", "PEG", "PCG", "EXC", "ED", "XEL",
            "EIX", "WEC", "AWK", "VST", "DTE", "ETR", "ES", "PPL", "FE", "AEE", "CMS", "ATO",
            "NRG", "CNP", "LNT", "NI", "EVRG", "AES",
        ],
    ),
    (
        "XLB",
        &[
            "LIN", "SHW", "FCX", "ECL", "APD", "NEM", "CTVA", "DOW", "NUE", "DD", "MLM", "VMC",
            "PPG", "IFF", "LYB", "SW", "BALL", "PKG", "AVY", "STLD", "IP", "AMCR", "CF", "CE",
            "EMN", "ALB", "MOS", "FMC",
        ],
    ),
    (
        "XLE",
        &[
            "XOM", "CVX", "EOG", "SLB", "MPC", "COP", "PSX", "WMB", "OKE", "VLO", "KMI", "OXY",
            "HES", "BKR", "FANG", "TRGP", "DVN", "HAL", "EQT", "CTRA", "MRO", "APA",
        ],
    ),
    (
        "XLF",
        &[
            "JPM", "V", "MA", "BAC", "WFC", "GS", "SPGI", "AXP", "PGR", "MS", "BLK", "C", "CB",
            "MMC", "FI", "SCHW", "BX", "ICE", "KKR", "CME", "MCO", "AON", "PYPL", "PNC", "USB",
            "AJG", "TFC", "COF", "AFL",
        ],
    ),
    (
        "XLK",
        &[
            "NVDA", "MSFT", "AAPL", "AVGO", "CRM", "ADBE", "AMD", "ORCL", "ACN", "CSCO", "QCOM",
            "INTU", "TXN", "IBM", "AMAT", "NOW", "MU", "LRCX", "ADI", "PANW", "KLAC", "INTC",
            "ANET", "SNPS", "APH", "CDNS", "MSI", "NXPI", "CRWD", "ROP",
        ],
    ),
    (
        "XLP",
        &[
            "PG", "COST", "WMT", "KO", "PM", "PEP", "MDLZ", "MO", "CL", "TGT", "KMB", "KVUE",
            "GIS", "STZ", "SYY", "KDP", "KR", "MNST", "ADM", "HSY", "KHC", "DG", "CHD", "EL",
            "K", "DLTR", "MKC", "CLX", "TSN", "CAG",
        ],
    ),
    (
        "XLRE",
        &[
            "PLD", "AMT", "EQIX", "WELL", "O", "SPG", "PSA", "DLR", "CCI", "EXR", "CBRE", "VICI",
            "IRM", "AVB", "CSGP", "EQR", "VTR", "SBAC", "WY", "INVH", "ESS", "ARE", "MAA", "DOC",
            "KIM", "CPT", "UDR", "HST", "REG", "BXP",
        ],
    ),
    (
        "XLC",
        &[
            "META", "GOOGL", "GOOG", "CHTR", "TMUS", "T", "EA", "CMCSA", "NFLX", "VZ", "DIS",
            "TTWO", "OMC", "WBD", "LYV", "IPG", "NWSA", "MTCH", "FOXA", "PARA", "FOX", "NWS",
        ],
    ),
];
