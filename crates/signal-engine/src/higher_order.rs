//! 상위 피벗 집계.
//!
//! 하위 피벗 시퀀스에서 구조적 기준점이 되는 부분 시퀀스를 고릅니다.
//! 마지막으로 확정된 상위 피벗 `h`(유형 T) 이후로 다음 두 값을 추적합니다.
//!
//! - 후보 `c`: `h` 이후 가장 극단적인 반대 유형 피벗
//! - 되돌림 `m`: `c` 이후 가장 극단적인 T 유형 피벗
//!
//! 시간이 지나는 것만으로는 확정되지 않고, 돌파가 일어나야 확정됩니다.
//! - T 유형 피벗이 `h`를 넘어서면(반전) `c`를 확정하고, 그 피벗이 새 후보가 됩니다.
//! - 반대 유형 피벗이 `c`를 넘어서고 `m`이 있으면(추세 지속) `c`와 `m`을 확정합니다.
//! - 반대 유형 피벗이 `c`를 넘어서지만 `m`이 없으면 후보만 갱신합니다.
//!
//! 동일한 값은 넘어선 것으로 보지 않으므로 가장 이른 피벗이 유지됩니다.

use signal_core::Pivot;

/// 상위 피벗에 해당하는 `pivots` 인덱스 목록을 반환합니다.
///
/// 결과는 엄격히 증가하며 기반 시퀀스처럼 유형이 교대합니다.
pub fn aggregate(pivots: &[Pivot]) -> Vec<usize> {
    if pivots.is_empty() {
        return Vec::new();
    }

    let mut committed = vec![0];
    let mut h = 0;
    let mut candidate: Option<usize> = None;
    let mut pullback: Option<usize> = None;

    for (j, pivot) in pivots.iter().enumerate().skip(1) {
        if pivot.pivot_type != pivots[h].pivot_type {
            match candidate {
                None => candidate = Some(j),
                Some(c) if pivot.is_beyond(&pivots[c]) => {
                    if let Some(m) = pullback {
                        committed.push(c);
                        committed.push(m);
                        h = m;
                        pullback = None;
                    }
                    candidate = Some(j);
                }
                Some(_) => {}
            }
            continue;
        }

        let Some(c) = candidate else {
            continue;
        };

        if pivot.is_beyond(&pivots[h]) {
            committed.push(c);
            h = c;
            candidate = Some(j);
            pullback = None;
        } else {
            pullback = match pullback {
                Some(m) if !pivot.is_beyond(&pivots[m]) => Some(m),
                _ => Some(j),
            };
        }
    }

    committed
}
