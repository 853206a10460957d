//! 페어별 시작 피벗 시드.
//!
//! 무한한 과거의 "진짜" 첫 피벗은 알 수 없으므로, 페어마다 시작 피벗 유형과
//! 시간을 외부에서 지정합니다. 문자열 형식은 첫 글자가 `L`(저점) 또는
//! `H`(고점)이고 뒤에 UTC 시간이 붙습니다.
//!
//! ```
//! use signal_core::{PairSeed, PivotType};
//!
//! let seed: PairSeed = "L2024-03-01 00:00".parse().unwrap();
//! assert_eq!(seed.pivot_type, PivotType::Valley);
//! ```

use crate::domain::PivotType;
use crate::error::SignalError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 시드 시간에 허용되는 형식.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// 페어 시작 시드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSeed {
    /// 시작 캔들을 어떤 피벗으로 간주할지
    pub pivot_type: PivotType,
    /// 시작 캔들 시간 (캔들 조회 시작 시간으로도 사용)
    pub start_time: DateTime<Utc>,
}

impl PairSeed {
    pub fn new(pivot_type: PivotType, start_time: DateTime<Utc>) -> Self {
        Self {
            pivot_type,
            start_time,
        }
    }
}

fn parse_seed_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(t.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

impl FromStr for PairSeed {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();

        let pivot_type = match chars.next() {
            Some('L') | Some('l') => PivotType::Valley,
            Some('H') | Some('h') => PivotType::Peak,
            _ => {
                return Err(SignalError::SeedInvalid(format!(
                    "시드는 L 또는 H로 시작해야 합니다: {:?}",
                    s
                )))
            }
        };

        let rest = chars.as_str().trim();
        let start_time = parse_seed_time(rest).ok_or_else(|| {
            SignalError::SeedInvalid(format!("시드 시간을 파싱할 수 없습니다: {:?}", rest))
        })?;

        Ok(Self::new(pivot_type, start_time))
    }
}

impl fmt::Display for PairSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.pivot_type {
            PivotType::Valley => 'L',
            PivotType::Peak => 'H',
        };
        write!(f, "{}{}", prefix, self.start_time.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_valley_seed() {
        let seed: PairSeed = "L2024-03-01 04:15".parse().unwrap();
        assert_eq!(seed.pivot_type, PivotType::Valley);
        assert_eq!(
            seed.start_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 4, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_peak_seed_rfc3339() {
        let seed: PairSeed = "h2024-03-01T04:15:00Z".parse().unwrap();
        assert_eq!(seed.pivot_type, PivotType::Peak);
        assert_eq!(
            seed.start_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 4, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_date_only() {
        let seed: PairSeed = "L2024-03-01".parse().unwrap();
        assert_eq!(
            seed.start_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_seed() {
        assert!(matches!(
            "X2024-03-01".parse::<PairSeed>(),
            Err(SignalError::SeedInvalid(_))
        ));
        assert!(matches!(
            "Lyesterday".parse::<PairSeed>(),
            Err(SignalError::SeedInvalid(_))
        ));
        assert!("".parse::<PairSeed>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let seed: PairSeed = "H2024-05-02 10:30:00".parse().unwrap();
        assert_eq!(seed.to_string(), "H2024-05-02 10:30:00");
    }
}
