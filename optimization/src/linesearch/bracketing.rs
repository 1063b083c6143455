use std::io::Write;

use super::{Line, LineSearch};
use crate::error::{Result, TrainingError};
use crate::ObjectiveFunctional;

/// Interval `[0, right]` along a direction known to contain a minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Lowest `(rate, evaluation)` found while bracketing. The evaluation is always below the
    /// one at rate zero.
    pub interior: (f64, f64),
    /// Right end of the interval. Equal to `interior` when growing further would pass the error
    /// training rate.
    pub right: (f64, f64),
}

// smallest rate tried below the initial one
const MIN_TRAINING_RATE: f64 = f64::EPSILON;

/// Finds a rate whose evaluation is below `evaluation`, first at or below `initial_rate`, then
/// growing by the bracketing factor up to the error training rate. From there keeps growing
/// while the evaluation still decreases.
pub(super) fn bracket<P: ObjectiveFunctional + ?Sized>(
    ls: &LineSearch,
    line: &Line<P>,
    evaluation: f64,
    initial_rate: f64,
    log: &mut dyn Write,
) -> Result<Bracket> {
    let mut warned = false;
    check_rate(ls, initial_rate, &mut warned, log)?;
    let (mut rate, mut value) = match descend(ls, line, evaluation, initial_rate) {
        Some(point) => point,
        None => grow(ls, line, evaluation, initial_rate, &mut warned, log)?,
    };

    loop {
        let next = rate * ls.bracketing_factor;
        if next > ls.error_training_rate {
            return Ok(Bracket {
                interior: (rate, value),
                right: (rate, value),
            });
        }
        check_rate(ls, next, &mut warned, log)?;
        let next_value = line.at(next);
        if next_value < value {
            rate = next;
            value = next_value;
        } else {
            return Ok(Bracket {
                interior: (rate, value),
                right: (next, next_value),
            });
        }
    }
}

// Shrinks before growing, so an initial rate that overshoots the minimum still brackets.
// Only when no smaller rate decreases the evaluation does the search grow the rate.
fn descend<P: ObjectiveFunctional + ?Sized>(
    ls: &LineSearch,
    line: &Line<P>,
    evaluation: f64,
    initial_rate: f64,
) -> Option<(f64, f64)> {
    let mut rate = initial_rate;
    while rate >= MIN_TRAINING_RATE {
        let value = line.at(rate);
        if value < evaluation {
            return Some((rate, value));
        }
        rate /= ls.bracketing_factor;
    }
    None
}

fn grow<P: ObjectiveFunctional + ?Sized>(
    ls: &LineSearch,
    line: &Line<P>,
    evaluation: f64,
    initial_rate: f64,
    warned: &mut bool,
    log: &mut dyn Write,
) -> Result<(f64, f64)> {
    let mut rate = initial_rate;
    loop {
        rate *= ls.bracketing_factor;
        check_rate(ls, rate, warned, log)?;
        let value = line.at(rate);
        if value < evaluation {
            return Ok((rate, value));
        }
    }
}

fn check_rate(ls: &LineSearch, rate: f64, warned: &mut bool, log: &mut dyn Write) -> Result<()> {
    if rate > ls.error_training_rate || !rate.is_finite() {
        return Err(TrainingError::BracketingFailed {
            training_rate: rate,
            limit: ls.error_training_rate,
        });
    }
    if rate > ls.warning_training_rate && !*warned {
        *warned = true;
        trainlog!(
            log,
            ls.display,
            "Warning: training rate {} is above {}.",
            rate,
            ls.warning_training_rate
        );
    }
    Ok(())
}
