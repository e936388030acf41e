//! Internal testing utilities for the ndstride crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Utility for creating table-driven tests.
///
/// Define a `Case` struct deriving `Debug`, build a collection of cases and
/// call `cases.test_each(|case| ...)`. Every case is run, even if earlier
/// ones fail, and the failing cases are reported together.
///
/// ```
/// use ndstride_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     size: usize,
///     expected_max: usize,
/// }
///
/// let cases = [Case { size: 3, expected_max: 2 }];
/// cases.test_each(|case| assert_eq!(case.size - 1, case.expected_max));
/// ```
///
/// Test cases and values captured by the test closure must be
/// [unwind safe](std::panic::UnwindSafe), since panics are caught with
/// [`catch_unwind`](std::panic::catch_unwind).
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Call `test` with a reference to each case, then panic with details
    /// of the failing cases, if any.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Variant of [`test_each`](TestCases::test_each) which passes cases by
    /// value. The debug representation of each case is captured before it
    /// is moved into the test function.
    fn test_each_value(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe;
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let failures: Vec<String> = self
            .into_iter()
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .map(|case| format!("{:?}", case))
            .collect();
        report_failures(&failures);
    }

    fn test_each_value(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + UnwindSafe,
    {
        let test = &test;
        let failures: Vec<String> = self
            .into_iter()
            .filter_map(|case| {
                let desc = format!("{:?}", case);
                std::panic::catch_unwind(move || test(case))
                    .is_err()
                    .then_some(desc)
            })
            .collect();
        report_failures(&failures);
    }
}

fn report_failures(failures: &[String]) {
    assert!(
        failures.is_empty(),
        "{} test cases failed: {:?}",
        failures.len(),
        failures
    );
}

/// Return the buffer offsets of every element of a strided view, in logical
/// row-major order.
///
/// This is a deliberately naive nested-loop traversal which serves as the
/// reference that optimized traversals are compared against.
pub fn reference_offsets(shape: &[usize], strides: &[isize], offset: usize) -> Vec<usize> {
    assert_eq!(
        shape.len(),
        strides.len(),
        "shape and strides differ in length"
    );

    let len: usize = shape.iter().product();
    let mut offsets = Vec::with_capacity(len);
    if len == 0 {
        return offsets;
    }

    let mut index = vec![0usize; shape.len()];
    for _ in 0..len {
        let delta: isize = index
            .iter()
            .zip(strides)
            .map(|(&i, &stride)| i as isize * stride)
            .sum();
        offsets.push((offset as isize + delta) as usize);

        for dim in (0..shape.len()).rev() {
            index[dim] += 1;
            if index[dim] < shape[dim] {
                break;
            }
            index[dim] = 0;
        }
    }
    offsets
}

/// Return `values` sorted in ascending order.
///
/// Useful for comparing the multiset of offsets visited by traversals whose
/// visiting order is unspecified.
pub fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values
}
