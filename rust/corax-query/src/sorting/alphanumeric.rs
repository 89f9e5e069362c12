use std::cmp::Ordering;

/// Natural ("alphanumeric") order of two byte strings.
///
/// Runs of ASCII digits compare by numeric value regardless of leading zeros,
/// other bytes compare case-insensitively. Strings equal under those rules fall
/// back to plain byte order, so the order is total.
pub fn compare_alphanumeric(x: &[u8], y: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);
    while i < x.len() && j < y.len() {
        let (a, b) = (x[i], y[j]);
        if a.is_ascii_digit() && b.is_ascii_digit() {
            let end_x = digit_run_end(x, i);
            let end_y = digit_run_end(y, j);
            let ordering = compare_digit_runs(&x[i..end_x], &y[j..end_y]);
            if ordering != Ordering::Equal {
                return ordering;
            }
            i = end_x;
            j = end_y;
            continue;
        }
        let ordering = a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase());
        if ordering != Ordering::Equal {
            return ordering;
        }
        i += 1;
        j += 1;
    }
    (x.len() - i)
        .cmp(&(y.len() - j))
        .then_with(|| x.cmp(y))
}

fn digit_run_end(s: &[u8], start: usize) -> usize {
    start + s[start..].iter().take_while(|b| b.is_ascii_digit()).count()
}

fn compare_digit_runs(x: &[u8], y: &[u8]) -> Ordering {
    let x = trim_zeros(x);
    let y = trim_zeros(y);
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let zeros = digits.iter().take_while(|&&b| b == b'0').count();
    &digits[zeros..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut values = vec![
            &b"file10"[..],
            b"file2",
            b"File1",
            b"file02",
            b"file",
            b"a100b",
            b"a100a",
            b"10",
            b"9",
        ];
        values.sort_by(|x, y| compare_alphanumeric(x, y));
        assert_eq!(
            values,
            vec![
                &b"9"[..],
                b"10",
                b"a100a",
                b"a100b",
                b"file",
                b"File1",
                b"file02",
                b"file2",
                b"file10",
            ]
        );
    }

    #[test]
    fn test_order_is_total() {
        assert_eq!(compare_alphanumeric(b"abc", b"abc"), Ordering::Equal);
        assert_ne!(compare_alphanumeric(b"ABC", b"abc"), Ordering::Equal);
        assert_ne!(compare_alphanumeric(b"x01", b"x1"), Ordering::Equal);
    }
}
