use super::{Line, LineSearch};
use crate::ObjectiveFunctional;

/// Always the first training rate, no bracketing.
pub(super) fn step<P: ObjectiveFunctional + ?Sized>(ls: &LineSearch, line: &Line<P>) -> (f64, f64) {
    let rate = ls.first_training_rate;
    (rate, line.at(rate))
}
