use super::bracketing::Bracket;
use super::{best_of, Line, LineSearch};
use crate::ObjectiveFunctional;

/// (3 - sqrt(5)) / 2
pub(crate) const TAU: f64 = 0.381_966_011_250_105_1;

const MAX_ITERATIONS: usize = 500;

/// Golden section search on `[0, bracket.right]`.
pub(super) fn step<P: ObjectiveFunctional + ?Sized>(
    ls: &LineSearch,
    line: &Line<P>,
    evaluation: f64,
    bracket: &Bracket,
) -> (f64, f64) {
    let (mut a, mut fa) = (0.0, evaluation);
    let (mut b, mut fb) = bracket.right;

    let mut c = a + TAU * (b - a);
    let mut fc = line.at(c);
    let mut d = b - TAU * (b - a);
    let mut fd = line.at(d);

    let mut iterations = 0;
    while b - a > ls.training_rate_tolerance && iterations < MAX_ITERATIONS {
        if fa.min(fc) < fd.min(fb) {
            // minimum in [a, d]
            b = d;
            fb = fd;
            d = c;
            fd = fc;
            c = a + TAU * (b - a);
            fc = line.at(c);
        } else {
            // minimum in [c, b]
            a = c;
            fa = fc;
            c = d;
            fc = fd;
            d = b - TAU * (b - a);
            fd = line.at(d);
        }
        iterations += 1;
    }

    best_of(&[(a, fa), (b, fb), (c, fc), (d, fd), bracket.interior])
}
