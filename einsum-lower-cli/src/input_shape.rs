/// Size used for dynamic dimensions when the requested size is not positive.
pub const FALLBACK_SIZE: usize = 256;

/// Minimum rank of generated inputs.
const MIN_RANK: usize = 4;

/// Choose a concrete shape for a model input.
///
/// `dims` contains the declared size of each dimension, or `None` for
/// dimensions whose size is symbolic or unknown. Fixed sizes are kept.
/// Dynamic dimensions are resolved as a batch size of 1 at index 0, 3
/// channels at index 1 and `size` elsewhere. Shapes with fewer than 4
/// dimensions are padded with trailing dimensions of size `size`.
///
/// If `size` is not positive, [`FALLBACK_SIZE`] is used instead.
pub fn resolve_input_shape(dims: &[Option<usize>], size: i64) -> Vec<usize> {
    let size = if size > 0 {
        size as usize
    } else {
        FALLBACK_SIZE
    };

    let mut shape: Vec<usize> = dims
        .iter()
        .enumerate()
        .map(|(i, dim)| match (i, dim) {
            (_, Some(fixed)) => *fixed,
            (0, None) => 1,
            (1, None) => 3,
            (_, None) => size,
        })
        .collect();

    if shape.len() < MIN_RANK {
        shape.resize(MIN_RANK, size);
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::{FALLBACK_SIZE, resolve_input_shape};

    #[test]
    fn test_resolve_input_shape() {
        #[derive(Debug)]
        struct Case<'a> {
            dims: &'a [Option<usize>],
            size: i64,
            expected: &'a [usize],
        }

        let cases = [
            Case {
                dims: &[None, Some(3), None, None],
                size: 64,
                expected: &[1, 3, 64, 64],
            },
            Case {
                dims: &[None, None, None, None],
                size: 32,
                expected: &[1, 3, 32, 32],
            },
            Case {
                dims: &[Some(2), Some(4), Some(8), Some(16)],
                size: 64,
                expected: &[2, 4, 8, 16],
            },
            Case {
                dims: &[None, Some(3), None, None],
                size: 0,
                expected: &[1, 3, FALLBACK_SIZE, FALLBACK_SIZE],
            },
            Case {
                dims: &[None, Some(3), None, None],
                size: -5,
                expected: &[1, 3, FALLBACK_SIZE, FALLBACK_SIZE],
            },
            // Padding to rank 4.
            Case {
                dims: &[None, Some(10)],
                size: 16,
                expected: &[1, 10, 16, 16],
            },
            Case {
                dims: &[],
                size: 8,
                expected: &[8, 8, 8, 8],
            },
            // Higher ranks are not truncated.
            Case {
                dims: &[None, None, None, Some(3), None],
                size: 5,
                expected: &[1, 3, 5, 3, 5],
            },
        ];

        for case in cases {
            assert_eq!(
                resolve_input_shape(case.dims, case.size),
                case.expected,
                "{:?}",
                case
            );
        }
    }
}
