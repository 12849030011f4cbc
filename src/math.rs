use itertools::izip;
use multiversion::multiversion;

#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "arm+neon"))]
pub(crate) fn vector_dot(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len();
    assert!(a.len() == b.len());

    let head_length = n - n % 4;

    let (x, x_tail) = a.split_at(head_length);
    let (y, y_tail) = b.split_at(head_length);

    let sum = izip!(x.chunks_exact(4), y.chunks_exact(4)).fold([0f64; 4], |mut acc, (x, y)| {
        acc[0] += x[0] * y[0];
        acc[1] += x[1] * y[1];
        acc[2] += x[2] * y[2];
        acc[3] += x[3] * y[3];
        acc
    });

    let mut result = (sum[0] + sum[1]) + (sum[2] + sum[3]);
    for (val1, val2) in x_tail.iter().zip(y_tail) {
        result += *val1 * *val2;
    }
    result
}

#[multiversion(targets("x86_64+avx+avx2", "x86+sse", "arm+neon"))]
pub(crate) fn axpy(x: &[f64], y: &mut [f64], a: f64) {
    let n = x.len();
    assert!(y.len() == n);

    izip!(x, y).for_each(|(x, y)| {
        *y += a * x;
    });
}

#[inline]
pub(crate) fn norm(x: &[f64]) -> f64 {
    vector_dot(x, x).sqrt()
}

/// Euclidean distance between two points of equal length.
#[cfg(test)]
pub(crate) fn distance(a: &[f64], b: &[f64]) -> f64 {
    assert!(a.len() == b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
