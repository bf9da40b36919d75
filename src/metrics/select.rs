//! Order statistic selection (quickselect)
//!
//! Three-way partitioning keeps the expected running time linear even when
//! the input is dominated by repeated values, which is common for latency
//! samples quantized by the clock.

use std::cmp::Ordering;

/// Return the `k`-th smallest element (0-based) of `values`.
///
/// The slice is reordered in place. On return every element before index
/// `k` is `<=` the selected value and every element after it is `>=`.
/// Returns `None` when `k` is out of bounds.
pub fn select_nth<T: Ord + Copy>(values: &mut [T], k: usize) -> Option<T> {
    if k >= values.len() {
        return None;
    }

    let mut lo = 0;
    let mut hi = values.len();

    loop {
        if hi - lo == 1 {
            return Some(values[lo]);
        }

        let pivot = values[lo + (hi - lo) / 2];
        let (lt, gt) = partition3(&mut values[lo..hi], pivot);

        // [lo, lo+lt) < pivot, [lo+lt, lo+gt) == pivot, [lo+gt, hi) > pivot
        if k < lo + lt {
            hi = lo + lt;
        } else if k < lo + gt {
            return Some(pivot);
        } else {
            lo += gt;
        }
    }
}

/// Dutch national flag partition around `pivot`.
///
/// Returns `(lt, gt)`: `slice[..lt] < pivot`, `slice[lt..gt] == pivot`,
/// `slice[gt..] > pivot`.
fn partition3<T: Ord + Copy>(slice: &mut [T], pivot: T) -> (usize, usize) {
    let mut lt = 0;
    let mut i = 0;
    let mut gt = slice.len();

    while i < gt {
        match slice[i].cmp(&pivot) {
            Ordering::Less => {
                slice.swap(lt, i);
                lt += 1;
                i += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                slice.swap(i, gt);
            }
            Ordering::Equal => i += 1,
        }
    }

    (lt, gt)
}
