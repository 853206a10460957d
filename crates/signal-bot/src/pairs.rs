//! 페어 목록 로드.
//!
//! 설정의 `pairs.list_file`이 있으면 `pairs` 헤더를 가진 CSV에서, 없으면
//! `pairs.symbols`에서 페어를 읽습니다. 순서는 유지하고 중복은 제거합니다.

use signal_core::{AppConfig, SignalError, SignalResult};
use std::io::Read;
use std::path::Path;

const PAIRS_COLUMN: &str = "pairs";

/// 설정에서 처리할 페어 목록을 결정합니다.
///
/// # Errors
/// 파일을 읽을 수 없거나 결과 목록이 비어 있으면 `SignalError::Config`.
pub fn resolve_pairs(config: &AppConfig) -> SignalResult<Vec<String>> {
    let raw = match &config.pairs.list_file {
        Some(path) => load_pair_list(path)?,
        None => config.pairs.symbols.clone(),
    };

    let pairs = normalize(raw);
    if pairs.is_empty() {
        return Err(SignalError::Config("페어 목록이 비어 있습니다".to_string()));
    }
    Ok(pairs)
}

/// CSV 파일에서 페어 목록을 읽습니다.
pub fn load_pair_list<P: AsRef<Path>>(path: P) -> SignalResult<Vec<String>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        SignalError::Config(format!("페어 목록 파일 열기 실패 {}: {}", path.display(), e))
    })?;
    read_pairs(file)
}

/// `pairs` 컬럼을 가진 CSV에서 페어 목록을 읽습니다.
pub fn read_pairs<R: Read>(reader: R) -> SignalResult<Vec<String>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let column = csv_reader
        .headers()
        .map_err(|e| SignalError::Config(format!("페어 목록 헤더 읽기 실패: {}", e)))?
        .iter()
        .position(|h| h.eq_ignore_ascii_case(PAIRS_COLUMN))
        .ok_or_else(|| {
            SignalError::Config(format!("페어 목록에 '{}' 컬럼이 없습니다", PAIRS_COLUMN))
        })?;

    let mut pairs = Vec::new();
    for record in csv_reader.records() {
        let record =
            record.map_err(|e| SignalError::Config(format!("페어 목록 파싱 실패: {}", e)))?;
        if let Some(pair) = record.get(column) {
            pairs.push(pair.to_string());
        }
    }
    Ok(pairs)
}

fn normalize(raw: Vec<String>) -> Vec<String> {
    let mut pairs: Vec<String> = Vec::with_capacity(raw.len());
    for pair in raw {
        let pair = pair.trim().to_uppercase();
        if !pair.is_empty() && !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_pairs_column() {
        let csv = "pairs\nBTCUSDT\nethusdt\n\nBTCUSDT\n";
        let pairs = normalize(read_pairs(csv.as_bytes()).unwrap());
        assert_eq!(pairs, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_read_pairs_with_extra_columns() {
        let csv = "note,pairs\nmajor,BTCUSDT\nalt,SOLUSDT\n";
        assert_eq!(read_pairs(csv.as_bytes()).unwrap(), vec!["BTCUSDT", "SOLUSDT"]);
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let csv = "symbol\nBTCUSDT\n";
        assert!(matches!(
            read_pairs(csv.as_bytes()),
            Err(SignalError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_list_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pairs\nXRPUSDT\nADAUSDT").unwrap();

        let mut config = AppConfig::default();
        config.pairs.symbols = vec!["BTCUSDT".to_string()];
        config.pairs.list_file = Some(file.path().to_path_buf());

        assert_eq!(resolve_pairs(&config).unwrap(), vec!["XRPUSDT", "ADAUSDT"]);
    }

    #[test]
    fn test_resolve_rejects_empty_list() {
        let config = AppConfig::default();
        assert!(matches!(resolve_pairs(&config), Err(SignalError::Config(_))));
    }
}
