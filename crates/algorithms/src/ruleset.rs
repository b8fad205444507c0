//! Ruleset CSV loading and class-label expansion
//!
//! A ruleset row is `DIST_code, original_FM40_code, new_FM40_code` where
//! the FM40 columns carry either a numeric code or a class label. Labels
//! expand through the Scott & Burgan FM40 class map: a family label (`GR`,
//! `TL`, ...) denotes every model in the family, a model label (`GR2`,
//! `TL9`, ...) denotes its single code. Expansion produces one numeric
//! rule per (DIST code, original code) pair.

use firefuel_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// FM40 class families: (label, numeric codes)
const CLASS_MAP: [(&str, &[i32]); 7] = [
    // Non-burnable: urban, snow/ice, agriculture, water, bare ground
    ("NB", &[91, 92, 93, 98, 99]),
    ("GR", &[101, 102, 103, 104, 105, 106, 107, 108, 109]),
    ("GS", &[121, 122, 123, 124]),
    ("SH", &[141, 142, 143, 144, 145, 146, 147, 148, 149]),
    ("TU", &[161, 162, 163, 164, 165]),
    ("TL", &[181, 182, 183, 184, 185, 186, 187, 188, 189]),
    ("SB", &[201, 202, 203, 204]),
];

/// Expand a class label (or numeric code) into its list of numeric codes
fn class_codes(label: &str) -> Option<Vec<i32>> {
    let label = label.trim();

    if let Ok(code) = label.parse::<i32>() {
        return Some(vec![code]);
    }

    let upper = label.to_uppercase();
    let (family, codes) = CLASS_MAP
        .iter()
        .find(|(name, _)| upper.starts_with(name))?;

    let suffix = &upper[family.len()..];
    if suffix.is_empty() {
        return Some(codes.to_vec());
    }

    // Model labels carry the final digit of their code: GR2 → 102, NB8 → 98
    if suffix.len() != 1 {
        return None;
    }
    let digit: i32 = suffix.parse().ok()?;
    codes.iter().copied().find(|c| c % 10 == digit).map(|c| vec![c])
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    #[serde(rename = "DIST_code")]
    dist_code: i32,
    #[serde(rename = "original_FM40_code")]
    original: String,
    #[serde(rename = "new_FM40_code")]
    new: Option<String>,
}

/// Immutable reclassification rule table keyed by
/// (DIST code, original FM40 code).
///
/// A value of `None` is an explicit "no change" marker; an absent key also
/// means "no change" at lookup time, which is why partially-expanded
/// rulesets are acceptable.
#[derive(Debug, Default, Clone)]
pub struct RuleTable {
    rules: HashMap<(i32, i32), Option<i32>>,
}

impl RuleTable {
    /// Load and expand a ruleset CSV.
    ///
    /// Rows whose original label is unknown are skipped with a warning;
    /// an unknown new label downgrades the row to "no change". Unreadable
    /// files and unparseable rows are fatal.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = csv::Reader::from_reader(file);

        let mut rules = HashMap::new();
        let mut row_count = 0usize;

        for record in reader.deserialize::<RuleRow>() {
            let row = record.map_err(|e| Error::Ruleset(e.to_string()))?;
            row_count += 1;

            let Some(original_codes) = class_codes(&row.original) else {
                warn!(
                    label = %row.original,
                    dist_code = row.dist_code,
                    "original FM40 class not in class map; skipping rule"
                );
                continue;
            };

            let new_label = row
                .new
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());

            // Per convention the replacement is the first code of the new
            // class's list; within-group specificity is not modeled.
            let new_code = match new_label {
                Some(label) => match class_codes(label) {
                    Some(codes) => codes.first().copied(),
                    None => {
                        warn!(
                            label,
                            dist_code = row.dist_code,
                            "new FM40 class not in class map; treating as no change"
                        );
                        None
                    }
                },
                None => None,
            };

            for code in original_codes {
                rules.insert((row.dist_code, code), new_code);
            }
        }

        info!(
            path = %path.as_ref().display(),
            rows = row_count,
            rules = rules.len(),
            "loaded and expanded ruleset"
        );

        Ok(Self { rules })
    }

    /// Add a single numeric rule; `None` marks explicit "no change"
    pub fn insert(&mut self, dist_code: i32, original: i32, new: Option<i32>) {
        self.rules.insert((dist_code, original), new);
    }

    /// Look up a rule: outer `None` means no rule for this pair
    pub fn lookup(&self, dist_code: i32, original: i32) -> Option<Option<i32>> {
        self.rules.get(&(dist_code, original)).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_class_codes_numeric_passthrough() {
        assert_eq!(class_codes("165"), Some(vec![165]));
        assert_eq!(class_codes(" 182 "), Some(vec![182]));
    }

    #[test]
    fn test_class_codes_model_labels() {
        assert_eq!(class_codes("GR2"), Some(vec![102]));
        assert_eq!(class_codes("TL9"), Some(vec![189]));
        assert_eq!(class_codes("tu5"), Some(vec![165]));
        assert_eq!(class_codes("NB8"), Some(vec![98]));
    }

    #[test]
    fn test_class_codes_family_labels() {
        assert_eq!(class_codes("GS"), Some(vec![121, 122, 123, 124]));
        assert_eq!(class_codes("SB"), Some(vec![201, 202, 203, 204]));
    }

    #[test]
    fn test_class_codes_unknown() {
        assert_eq!(class_codes("XX"), None);
        assert_eq!(class_codes("GR0"), None);
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_family_rule_expansion() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             131,TU,TL2\n",
        );
        let table = RuleTable::from_csv(file.path()).unwrap();

        // One rule per TU model, all mapping to the first (only) TL2 code
        assert_eq!(table.len(), 5);
        assert_eq!(table.lookup(131, 165), Some(Some(182)));
        assert_eq!(table.lookup(131, 161), Some(Some(182)));
        assert_eq!(table.lookup(121, 165), None);
    }

    #[test]
    fn test_new_class_first_code_wins() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             131,165,GR\n",
        );
        let table = RuleTable::from_csv(file.path()).unwrap();
        assert_eq!(table.lookup(131, 165), Some(Some(101)));
    }

    #[test]
    fn test_blank_new_label_is_no_change() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             111,GR1,\n",
        );
        let table = RuleTable::from_csv(file.path()).unwrap();
        assert_eq!(table.lookup(111, 101), Some(None));
    }

    #[test]
    fn test_unknown_original_label_skipped() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             131,BOGUS,GR1\n\
             131,165,182\n",
        );
        let table = RuleTable::from_csv(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(131, 165), Some(Some(182)));
    }

    #[test]
    fn test_unknown_new_label_downgrades_to_no_change() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             131,165,BOGUS\n",
        );
        let table = RuleTable::from_csv(file.path()).unwrap();
        assert_eq!(table.lookup(131, 165), Some(None));
    }

    #[test]
    fn test_malformed_row_is_fatal() {
        let file = write_csv(
            "DIST_code,original_FM40_code,new_FM40_code\n\
             not_a_number,165,182\n",
        );
        assert!(matches!(
            RuleTable::from_csv(file.path()),
            Err(Error::Ruleset(_))
        ));
    }
}
