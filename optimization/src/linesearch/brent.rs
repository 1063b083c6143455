use super::bracketing::Bracket;
use super::golden::TAU;
use super::{best_of, Line, LineSearch};
use crate::ObjectiveFunctional;

const MAX_ITERATIONS: usize = 500;

/// Brent's method on `[0, bracket.right]`: parabolic interpolation through the three best
/// points, golden section steps when the parabola is not usable.
pub(super) fn step<P: ObjectiveFunctional + ?Sized>(
    ls: &LineSearch,
    line: &Line<P>,
    evaluation: f64,
    bracket: &Bracket,
) -> (f64, f64) {
    let tolerance = ls.training_rate_tolerance;
    let mut a = 0.0;
    let mut b = bracket.right.0;

    // x best, w second best, v third best
    let (mut x, mut fx) = bracket.interior;
    let (mut w, mut fw) = (x, fx);
    let (mut v, mut fv) = (x, fx);

    let mut iterations = 0;
    while b - a > tolerance && iterations < MAX_ITERATIONS {
        let u = match parabola_minimum(v, fv, w, fw, x, fx) {
            Some(u) if a < u && u < b && (u - x).abs() >= 0.5 * tolerance => u,
            _ => {
                if x < 0.5 * (a + b) {
                    x + TAU * (b - x)
                } else {
                    x - TAU * (x - a)
                }
            }
        };
        let fu = line.at(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
        iterations += 1;
    }

    best_of(&[(x, fx), bracket.interior, (0.0, evaluation)])
}

/// Abscissa of the vertex of the parabola through three points, if they define one.
#[allow(clippy::many_single_char_names)]
fn parabola_minimum(v: f64, fv: f64, w: f64, fw: f64, x: f64, fx: f64) -> Option<f64> {
    let r = (x - w) * (fx - fv);
    let q = (x - v) * (fx - fw);
    let denominator = 2.0 * (r - q);
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    let numerator = (x - w) * r - (x - v) * q;
    let u = x - numerator / denominator;
    if u.is_finite() {
        Some(u)
    } else {
        None
    }
}
