//! Built-in safemap datasets and their CSV layouts.

use crate::error::ExportError;

/// Describes one exportable dataset of the safemap service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    /// Short name used on the command line and in step names.
    pub name: &'static str,
    /// Service path appended to the base URL.
    pub service: &'static str,
    /// Name of the CSV file written in the output directory.
    pub file_name: &'static str,
    /// Ordered child elements of each `item`; also the CSV header.
    pub fields: &'static [&'static str],
}

/// Fall accident status reported by the fire service.
pub const CRASH_ACCIDENT: Dataset = Dataset {
    name: "crash",
    service: "getCrashAcdntSttusData.do",
    file_name: "crash_acdnt_data.csv",
    fields: &[
        "OBJT_ID",
        "STTE_YEAR",
        "STTE_MT",
        "STTE_DT",
        "STTE_LC",
        "X",
        "Y",
        "YEAR",
    ],
};

/// Traffic accident hotspots from the road traffic authority.
pub const TRAFFIC_HOTSPOT: Dataset = Dataset {
    name: "hotspot",
    service: "getTfcacdHspotData.do",
    file_name: "tfcacd_hspot_data.csv",
    fields: &[
        "OBJT_ID",
        "OCCU_YEAR",
        "OCCU_MT",
        "OCCU_DE",
        "OCCU_TM",
        "OCCU_DAY",
        "OCCU_DATE",
        "LCLAS",
        "SCLAS",
        "DEATH",
        "SWPSN",
        "SINJPSN",
        "INJPSN",
        "BIG",
        "DRNKG",
        "KID",
        "ODSN",
        "WLKG",
        "VIOLT_CN",
        "CTPRVN_CD",
        "SGG_CD",
        "EMD_CD",
        "X",
        "Y",
    ],
};

/// Every dataset known to the exporter, in export order.
pub const ALL_DATASETS: [Dataset; 2] = [CRASH_ACCIDENT, TRAFFIC_HOTSPOT];

impl Dataset {
    /// Looks a dataset up by its short name, case-insensitively.
    pub fn by_name(name: &str) -> Result<Dataset, ExportError> {
        ALL_DATASETS
            .iter()
            .find(|dataset| dataset.name.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| ExportError::UnknownDataset(name.to_string()))
    }

    /// Parses command line selectors. `all` or no selector at all means every dataset.
    pub fn select<S: AsRef<str>>(selectors: &[S]) -> Result<Vec<Dataset>, ExportError> {
        if selectors.is_empty()
            || selectors
                .iter()
                .any(|s| s.as_ref().eq_ignore_ascii_case("all"))
        {
            return Ok(ALL_DATASETS.to_vec());
        }

        let mut datasets = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let dataset = Self::by_name(selector.as_ref())?;
            if !datasets.contains(&dataset) {
                datasets.push(dataset);
            }
        }
        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_accident_header() {
        assert_eq!(
            CRASH_ACCIDENT.fields,
            ["OBJT_ID", "STTE_YEAR", "STTE_MT", "STTE_DT", "STTE_LC", "X", "Y", "YEAR"]
        );
    }

    #[test]
    fn traffic_hotspot_header() {
        assert_eq!(TRAFFIC_HOTSPOT.fields.len(), 24);
        assert_eq!(TRAFFIC_HOTSPOT.fields[0], "OBJT_ID");
        assert_eq!(TRAFFIC_HOTSPOT.fields[18], "VIOLT_CN");
        assert_eq!(TRAFFIC_HOTSPOT.fields[23], "Y");
    }

    #[test]
    fn select_defaults_to_all() {
        let none: [&str; 0] = [];
        assert_eq!(Dataset::select(&none).unwrap(), ALL_DATASETS.to_vec());
        assert_eq!(Dataset::select(&["ALL"]).unwrap(), ALL_DATASETS.to_vec());
    }

    #[test]
    fn select_deduplicates_and_keeps_order() {
        let selected = Dataset::select(&["hotspot", "crash", "hotspot"]).unwrap();
        assert_eq!(selected, vec![TRAFFIC_HOTSPOT, CRASH_ACCIDENT]);
    }

    #[test]
    fn unknown_dataset_is_rejected() {
        let result = Dataset::select(&["weather"]);
        assert!(matches!(result, Err(ExportError::UnknownDataset(name)) if name == "weather"));
    }
}
